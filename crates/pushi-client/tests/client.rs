//! End-to-end client behavior over the in-memory transport.

use pushi_client::{ClientError, ClientOptions, ClientPool, ConnectionState, PushiClient};
use pushi_transport::mock::{MockAuthTransport, MockConnector, MockSession};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const HANDSHAKE: &str =
    r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"abc\"}"}"#;

struct Harness {
    pool: ClientPool,
    connector: MockConnector,
    sessions: mpsc::UnboundedReceiver<MockSession>,
    auth: Arc<MockAuthTransport>,
}

fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let (connector, sessions) = MockConnector::new();
    let auth = Arc::new(MockAuthTransport::new("{}"));
    let pool = ClientPool::with_transports(Arc::new(connector.clone()), auth.clone());
    Harness {
        pool,
        connector,
        sessions,
        auth,
    }
}

/// Forward an event's invocations into a channel the test can await.
fn listen(client: &PushiClient, event: &str) -> mpsc::UnboundedReceiver<Vec<Value>> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.bind(event, move |args| {
        let _ = tx.send(args.to_vec());
    });
    rx
}

/// Let spawned tasks and injected frames settle.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

async fn open_connected(h: &mut Harness, options: ClientOptions) -> (PushiClient, MockSession) {
    let client = h.pool.open("app-key", options);
    let mut connected = listen(&client, "connect");
    let session = h.sessions.recv().await.expect("no session");
    session.inject(HANDSHAKE);
    connected.recv().await.expect("no connect event");
    (client, session)
}

#[tokio::test(start_paused = true)]
async fn handshake_connects_every_subscriber() {
    let mut h = harness();
    let primary = h.pool.open("app-key", ClientOptions::default());
    let clone = h.pool.open("app-key", ClientOptions::default());

    let mut primary_connected = listen(&primary, "connect");
    let mut clone_connected = listen(&clone, "connect");

    let session = h.sessions.recv().await.unwrap();
    session.inject(HANDSHAKE);

    assert_eq!(primary_connected.recv().await.unwrap(), vec![json!("abc")]);
    assert_eq!(clone_connected.recv().await.unwrap(), vec![json!("abc")]);

    for client in [&primary, &clone] {
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(client.socket_id().as_deref(), Some("abc"));
    }
    assert!(!primary.is_clone());
    assert!(clone.is_clone());
}

#[tokio::test(start_paused = true)]
async fn clone_of_connected_primary_observes_connect() {
    let mut h = harness();
    let (primary, _session) = open_connected(&mut h, ClientOptions::default()).await;

    // The primary is already connected; the clone must see it without a
    // second handshake
    let clone = h.pool.open("app-key", ClientOptions::default());
    let mut connected = listen(&clone, "connect");

    assert_eq!(connected.recv().await.unwrap(), vec![json!("abc")]);
    assert_eq!(clone.socket_id(), primary.socket_id());
    assert_eq!(clone.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn subscribe_is_idempotent_per_handle() {
    let mut h = harness();
    let (client, mut session) = open_connected(&mut h, ClientOptions::default()).await;

    let first = client.subscribe("room").unwrap();
    let second = client.subscribe("room").unwrap();
    assert!(first.same_channel(&second));

    settle().await;
    let frame: Value = serde_json::from_str(&session.try_outbound().unwrap()).unwrap();
    assert_eq!(
        frame,
        json!({"event": "pusher:subscribe", "data": {"channel": "room"}})
    );
    assert!(session.try_outbound().is_none());
}

#[tokio::test(start_paused = true)]
async fn private_subscribe_without_endpoint_fails_fast() {
    let mut h = harness();
    let (client, mut session) = open_connected(&mut h, ClientOptions::default()).await;

    let result = client.subscribe("private-room");
    assert!(matches!(result, Err(ClientError::MissingAuthEndpoint)));

    // Fail-fast means no network traffic of any kind
    settle().await;
    assert!(h.auth.requests().is_empty());
    assert!(session.try_outbound().is_none());
    assert!(client.channel("private-room").is_none());
}

#[tokio::test(start_paused = true)]
async fn authenticated_subscribe_sends_token_frame() {
    let mut h = harness();
    h.auth.set_body(r#"{"auth":"t1","channel_data":"{}"}"#);
    let options = ClientOptions::default().with_auth_endpoint("http://auth.local/cb");
    let (client, mut session) = open_connected(&mut h, options).await;

    client.subscribe("private-room").unwrap();

    let frame: Value = serde_json::from_str(&session.next_outbound().await.unwrap()).unwrap();
    assert_eq!(
        frame,
        json!({
            "event": "pusher:subscribe",
            "data": {"channel": "private-room", "auth": "t1", "channel_data": "{}"}
        })
    );
    assert_eq!(
        h.auth.requests(),
        vec!["http://auth.local/cb?socket_id=abc&channel=private-room"]
    );
}

#[tokio::test(start_paused = true)]
async fn auth_denial_never_sends_subscribe() {
    let mut h = harness();
    h.auth.set_body("{}");
    let options = ClientOptions::default().with_auth_endpoint("http://auth.local/cb");
    let (client, mut session) = open_connected(&mut h, options).await;

    client.subscribe("private-room").unwrap();
    settle().await;

    assert_eq!(h.auth.requests().len(), 1);
    assert!(session.try_outbound().is_none());
    // The channel is still cached optimistically; it just never confirms
    assert!(client.channel("private-room").is_some());
}

#[tokio::test(start_paused = true)]
async fn member_added_fires_typed_and_generic_listeners() {
    let mut h = harness();
    h.auth.set_body(r#"{"auth":"t1"}"#);
    let options = ClientOptions::default().with_auth_endpoint("http://auth.local/cb");
    let (client, mut session) = open_connected(&mut h, options).await;

    client.subscribe("presence-x").unwrap();
    session.next_outbound().await.unwrap();

    let mut member_added = listen(&client, "member_added");
    let mut generic = listen(&client, "pusher:member_added");

    session.inject(r#"{"event":"pusher:member_added","channel":"presence-x","member":"{\"id\":1}"}"#);

    assert_eq!(
        member_added.recv().await.unwrap(),
        vec![json!("presence-x"), json!({"id": 1})]
    );
    assert_eq!(
        generic.recv().await.unwrap(),
        vec![Value::Null, json!("presence-x")]
    );
}

#[tokio::test(start_paused = true)]
async fn subscription_succeeded_fires_subscribe_event() {
    let mut h = harness();
    let (client, mut session) = open_connected(&mut h, ClientOptions::default()).await;

    client.subscribe("room").unwrap();
    session.next_outbound().await.unwrap();

    let mut subscribed = listen(&client, "subscribe");
    session.inject(
        r#"{"event":"pusher_internal:subscription_succeeded","channel":"room","data":"{\"count\":2}"}"#,
    );

    assert_eq!(
        subscribed.recv().await.unwrap(),
        vec![json!("room"), json!({"count": 2})]
    );
}

#[tokio::test(start_paused = true)]
async fn unaddressed_channel_frames_are_dropped() {
    let mut h = harness();
    let (client, session) = open_connected(&mut h, ClientOptions::default()).await;

    let mut generic = listen(&client, "message:new");

    session.inject(r#"{"event":"message:new","data":{"n":1},"channel":"other"}"#);
    settle().await;
    assert!(generic.try_recv().is_err());

    // Peer channels bypass the per-handle filter
    session.inject(r#"{"event":"message:new","data":{"n":2},"channel":"peer-1"}"#);
    assert_eq!(
        generic.recv().await.unwrap(),
        vec![json!({"n": 2}), json!("peer-1")]
    );
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_are_skipped_not_fatal() {
    let mut h = harness();
    let (client, session) = open_connected(&mut h, ClientOptions::default()).await;

    let mut generic = listen(&client, "still:alive");

    session.inject("not json at all");
    session.inject(r#"{"event":"pusher:member_added","channel":"peer-1","member":"{broken"}"#);
    session.inject(r#"{"event":"still:alive","data":1}"#);

    assert_eq!(
        generic.recv().await.unwrap(),
        vec![json!(1), Value::Null]
    );
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn primary_schedules_one_reconnect_clone_none() {
    let mut h = harness();
    let options = ClientOptions::default().with_timeout(Duration::from_secs(1));
    let primary = h.pool.open("app-key", options);
    let clone = h.pool.open("app-key", ClientOptions::default());

    let mut primary_connected = listen(&primary, "connect");
    let mut session = h.sessions.recv().await.unwrap();
    session.inject(HANDSHAKE);
    primary_connected.recv().await.unwrap();
    assert_eq!(h.connector.connect_count(), 1);

    let mut primary_disconnected = listen(&primary, "disconnect");
    let mut clone_disconnected = listen(&clone, "disconnect");

    session.close();
    primary_disconnected.recv().await.unwrap();
    clone_disconnected.recv().await.unwrap();

    for client in [&primary, &clone] {
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.socket_id(), None);
    }

    // Exactly one attempt fires after the configured delay
    let replacement = h.sessions.recv().await.unwrap();
    assert_eq!(h.connector.connect_count(), 2);
    settle().await;
    assert!(h.sessions.try_recv().is_err());

    // Both handles come back on the replacement socket
    replacement.inject(HANDSHAKE);
    primary_connected.recv().await.unwrap();
    assert_eq!(clone.socket_id().as_deref(), Some("abc"));
}

#[tokio::test(start_paused = true)]
async fn clone_subscribe_short_circuits_known_channel() {
    let mut h = harness();
    let (primary, mut session) = open_connected(&mut h, ClientOptions::default()).await;
    let clone = h.pool.open("app-key", ClientOptions::default());
    settle().await;

    let room = primary.subscribe("room").unwrap();
    session.next_outbound().await.unwrap();

    let mut subscribed = listen(&clone, "subscribe");
    let aliased = clone.subscribe("room").unwrap();

    assert!(room.same_channel(&aliased));
    assert_eq!(
        subscribed.recv().await.unwrap(),
        vec![json!("room"), Value::Null]
    );
    assert!(session.try_outbound().is_none());
}

#[tokio::test(start_paused = true)]
async fn disconnect_clears_channel_map() {
    let mut h = harness();
    let (client, mut session) = open_connected(&mut h, ClientOptions::default()).await;

    client.subscribe("room").unwrap();
    session.next_outbound().await.unwrap();

    let mut disconnected = listen(&client, "disconnect");
    session.close();
    disconnected.recv().await.unwrap();
    assert!(client.channel("room").is_none());

    // After reconnecting, the same name subscribes over the wire again
    let mut replacement = h.sessions.recv().await.unwrap();
    replacement.inject(HANDSHAKE);
    let mut connected = listen(&client, "connect");
    connected.recv().await.unwrap();

    client.subscribe("room").unwrap();
    assert!(replacement.next_outbound().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn event_buses_are_per_handle() {
    let mut h = harness();
    let (primary, _session) = open_connected(&mut h, ClientOptions::default()).await;
    let clone = h.pool.open("app-key", ClientOptions::default());

    let mut on_primary = listen(&primary, "local:ping");
    let mut on_clone = listen(&clone, "local:ping");

    primary.trigger("local:ping", &[json!(1)]);
    assert_eq!(on_primary.recv().await.unwrap(), vec![json!(1)]);
    assert!(on_clone.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn send_and_channel_trigger_write_frames() {
    let mut h = harness();
    let (client, mut session) = open_connected(&mut h, ClientOptions::default()).await;

    client.send_event("hello", json!({"n": 1}));
    let frame: Value = serde_json::from_str(&session.next_outbound().await.unwrap()).unwrap();
    assert_eq!(frame, json!({"event": "hello", "data": {"n": 1}}));

    let room = client.subscribe("room").unwrap();
    session.next_outbound().await.unwrap();

    room.trigger("message:new", json!({"body": "hi"}));
    let frame: Value = serde_json::from_str(&session.next_outbound().await.unwrap()).unwrap();
    assert_eq!(
        frame,
        json!({"event": "message:new", "data": {"body": "hi"}, "channel": "room"})
    );
}

#[tokio::test(start_paused = true)]
async fn pool_close_and_reopen() {
    let mut h = harness();
    let (_client, _session) = open_connected(&mut h, ClientOptions::default()).await;
    assert!(h.pool.contains("app-key"));

    assert!(h.pool.close("app-key"));
    assert!(!h.pool.close("app-key"));
    assert!(h.pool.is_empty());

    // Reopening the key creates a fresh primary with its own connection
    let reopened = h.pool.open("app-key", ClientOptions::default());
    assert!(!reopened.is_clone());
    let session = h.sessions.recv().await.unwrap();
    assert_eq!(h.connector.connect_count(), 2);

    let mut connected = listen(&reopened, "connect");
    session.inject(HANDSHAKE);
    connected.recv().await.unwrap();

    h.pool.close_all();
    assert!(h.pool.is_empty());
}

#[tokio::test(start_paused = true)]
async fn close_disconnects_every_handle() {
    let mut h = harness();
    let (primary, _session) = open_connected(&mut h, ClientOptions::default()).await;
    let clone = h.pool.open("app-key", ClientOptions::default());
    settle().await;

    let mut primary_disconnected = listen(&primary, "disconnect");
    let mut clone_disconnected = listen(&clone, "disconnect");

    assert!(h.pool.close("app-key"));

    primary_disconnected.recv().await.unwrap();
    clone_disconnected.recv().await.unwrap();
    for client in [&primary, &clone] {
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.socket_id(), None);
    }

    // A deliberate close never schedules a reconnect
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.connector.connect_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_opens_share_one_primary() {
    let h = harness();
    let pool = Arc::new(h.pool);

    let opens: Vec<_> = (0..16)
        .map(|_| {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.open("app-key", ClientOptions::default()) })
        })
        .collect();

    let mut clients = Vec::new();
    for open in opens {
        clients.push(open.await.unwrap());
    }

    // Exactly one open wins the primary; the rest clone it
    assert_eq!(pool.len(), 1);
    assert_eq!(clients.iter().filter(|c| !c.is_clone()).count(), 1);
}
