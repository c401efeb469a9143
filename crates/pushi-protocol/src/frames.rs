//! Frame types for the Pushi protocol.
//!
//! Frames are the fundamental unit of communication with the service.
//! Each frame is a single JSON text message with an `event` discriminator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{decode_embedded, ProtocolError};

/// Well-known event names used by the service.
pub mod events {
    /// First inbound frame after a socket opens; carries the socket id.
    pub const CONNECTION_ESTABLISHED: &str = "pusher:connection_established";
    /// Confirmation that a subscription was accepted.
    pub const SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";
    /// A member joined a presence channel.
    pub const MEMBER_ADDED: &str = "pusher:member_added";
    /// A member left a presence channel.
    pub const MEMBER_REMOVED: &str = "pusher:member_removed";
    /// Outbound subscription request.
    pub const SUBSCRIBE: &str = "pusher:subscribe";
}

/// An inbound frame as it crosses the wire, before event classification.
///
/// The service leaves `channel` and `member` unset on frames where they do
/// not apply, and double-encodes some `data` fields as JSON strings; see
/// [`InboundEvent::classify`] for the strict per-event view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Event name discriminator.
    pub event: String,
    /// Event payload. May itself be a JSON-encoded string on some events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Channel the frame is addressed to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Presence member payload, JSON-encoded as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

/// Handshake payload carried (JSON-encoded) in the `data` field of a
/// `pusher:connection_established` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// Service-assigned identifier for the physical connection.
    pub socket_id: String,
}

/// Strictly decoded view of an inbound frame.
///
/// Unknown event names pass through as [`InboundEvent::Other`]; the raw
/// frame remains available for generic dispatch by event name.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Connection handshake completed; the connection is now usable.
    ConnectionEstablished {
        /// Service-assigned socket identifier.
        socket_id: String,
    },
    /// The service accepted a subscription.
    SubscriptionSucceeded {
        /// Channel the subscription belongs to.
        channel: String,
        /// Decoded confirmation payload.
        data: Value,
    },
    /// A member joined a presence channel.
    MemberAdded {
        /// Presence channel name.
        channel: String,
        /// Decoded member payload.
        member: Value,
    },
    /// A member left a presence channel.
    MemberRemoved {
        /// Presence channel name.
        channel: String,
        /// Decoded member payload.
        member: Value,
    },
    /// Any other event; dispatched generically by its raw name.
    Other,
}

impl InboundEvent {
    /// Classify a raw frame into its typed event, decoding any embedded
    /// JSON-string fields.
    ///
    /// # Errors
    ///
    /// Returns an error if a field required by the recognized event is
    /// missing or its embedded JSON is invalid. Unknown events never fail.
    pub fn classify(raw: &RawFrame) -> Result<Self, ProtocolError> {
        match raw.event.as_str() {
            events::CONNECTION_ESTABLISHED => {
                let data = raw
                    .data
                    .as_ref()
                    .ok_or(ProtocolError::MissingField("data"))?;
                let payload: HandshakePayload =
                    serde_json::from_value(decode_embedded(data, "data")?)
                        .map_err(|_| ProtocolError::InvalidEmbedded("data"))?;
                Ok(InboundEvent::ConnectionEstablished {
                    socket_id: payload.socket_id,
                })
            }
            events::SUBSCRIPTION_SUCCEEDED => {
                let channel = required_channel(raw)?;
                let data = raw
                    .data
                    .as_ref()
                    .ok_or(ProtocolError::MissingField("data"))?;
                Ok(InboundEvent::SubscriptionSucceeded {
                    channel,
                    data: decode_embedded(data, "data")?,
                })
            }
            events::MEMBER_ADDED => {
                let (channel, member) = member_fields(raw)?;
                Ok(InboundEvent::MemberAdded { channel, member })
            }
            events::MEMBER_REMOVED => {
                let (channel, member) = member_fields(raw)?;
                Ok(InboundEvent::MemberRemoved { channel, member })
            }
            _ => Ok(InboundEvent::Other),
        }
    }
}

fn required_channel(raw: &RawFrame) -> Result<String, ProtocolError> {
    raw.channel
        .clone()
        .ok_or(ProtocolError::MissingField("channel"))
}

fn member_fields(raw: &RawFrame) -> Result<(String, Value), ProtocolError> {
    let channel = required_channel(raw)?;
    let member = raw
        .member
        .as_ref()
        .ok_or(ProtocolError::MissingField("member"))?;
    let member = serde_json::from_str(member)
        .map_err(|_| ProtocolError::InvalidEmbedded("member"))?;
    Ok((channel, member))
}

/// Payload of an outbound `pusher:subscribe` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeData {
    /// Channel to subscribe to.
    pub channel: String,
    /// Auth token for private/presence channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    /// Opaque channel data returned by the auth endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<String>,
}

/// An outbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// Subscribe to a public channel.
    Subscribe {
        /// Channel name.
        channel: String,
    },
    /// Subscribe to a private or presence channel with an auth token.
    SubscribeAuthenticated {
        /// Channel name.
        channel: String,
        /// Auth token obtained from the auth endpoint.
        auth: String,
        /// Opaque channel data returned alongside the token.
        channel_data: Option<String>,
    },
    /// Publish an event without a channel.
    Event {
        /// Event name.
        event: String,
        /// Event payload.
        data: Value,
    },
    /// Publish an event on a channel.
    ChannelEvent {
        /// Event name.
        event: String,
        /// Event payload.
        data: Value,
        /// Target channel.
        channel: String,
    },
}

impl OutboundFrame {
    /// Create a public subscribe frame.
    #[must_use]
    pub fn subscribe(channel: impl Into<String>) -> Self {
        OutboundFrame::Subscribe {
            channel: channel.into(),
        }
    }

    /// Create an authenticated subscribe frame.
    #[must_use]
    pub fn subscribe_authenticated(
        channel: impl Into<String>,
        auth: impl Into<String>,
        channel_data: Option<String>,
    ) -> Self {
        OutboundFrame::SubscribeAuthenticated {
            channel: channel.into(),
            auth: auth.into(),
            channel_data,
        }
    }

    /// Create a channel-less event frame.
    #[must_use]
    pub fn event(event: impl Into<String>, data: Value) -> Self {
        OutboundFrame::Event {
            event: event.into(),
            data,
        }
    }

    /// Create a channel event frame.
    #[must_use]
    pub fn channel_event(
        event: impl Into<String>,
        data: Value,
        channel: impl Into<String>,
    ) -> Self {
        OutboundFrame::ChannelEvent {
            event: event.into(),
            data,
            channel: channel.into(),
        }
    }

    /// Lower this frame to the raw wire shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscribe payload fails to serialize.
    pub fn to_raw(&self) -> Result<RawFrame, ProtocolError> {
        let frame = match self {
            OutboundFrame::Subscribe { channel } => RawFrame {
                event: events::SUBSCRIBE.to_string(),
                data: Some(serde_json::to_value(SubscribeData {
                    channel: channel.clone(),
                    auth: None,
                    channel_data: None,
                })?),
                channel: None,
                member: None,
            },
            OutboundFrame::SubscribeAuthenticated {
                channel,
                auth,
                channel_data,
            } => RawFrame {
                event: events::SUBSCRIBE.to_string(),
                data: Some(serde_json::to_value(SubscribeData {
                    channel: channel.clone(),
                    auth: Some(auth.clone()),
                    channel_data: channel_data.clone(),
                })?),
                channel: None,
                member: None,
            },
            OutboundFrame::Event { event, data } => RawFrame {
                event: event.clone(),
                data: Some(data.clone()),
                channel: None,
                member: None,
            },
            OutboundFrame::ChannelEvent {
                event,
                data,
                channel,
            } => RawFrame {
                event: event.clone(),
                data: Some(data.clone()),
                channel: Some(channel.clone()),
                member: None,
            },
        };
        Ok(frame)
    }
}
