//! Shared outbound frame queue.
//!
//! Every handle multiplexed over one physical socket pushes frames into the
//! same queue; the connection task drains it into whichever socket is
//! current. The queue outlives individual sockets, so frames enqueued
//! around a reconnect are written to the replacement socket.

use pushi_protocol::OutboundFrame;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Fire-and-forget sender half of the outbound queue.
#[derive(Clone)]
pub struct OutboundQueue {
    sender: mpsc::UnboundedSender<OutboundFrame>,
}

impl std::fmt::Debug for OutboundQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OutboundQueue")
    }
}

impl OutboundQueue {
    /// Create a queue, returning the sender handle and the receiver drained
    /// by the connection task.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Enqueue a frame for the physical socket.
    ///
    /// Never blocks and never fails from the caller's perspective; a frame
    /// pushed after the connection task has shut down is dropped.
    pub fn push(&self, frame: OutboundFrame) {
        trace!(?frame, "Enqueueing outbound frame");
        if self.sender.send(frame).is_err() {
            debug!("Outbound queue closed; frame dropped");
        }
    }
}
