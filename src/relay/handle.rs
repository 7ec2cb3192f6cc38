use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type SessionId = String;

/// Item queued for a connection's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized session state, written verbatim as a text frame.
    State(Arc<str>),
    /// Keep-alive probe.
    Ping,
}

/// A live connection as seen by the relay: where to queue its messages and
/// how to stop it.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: Uuid,
    pub session_id: SessionId,
    outbound: UnboundedSender<Outbound>,
    pub cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle and the receiving end of its outbound queue.
    pub fn new(
        session_id: impl Into<SessionId>,
        cancel: CancellationToken,
    ) -> (Self, UnboundedReceiver<Outbound>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            outbound,
            cancel,
        };
        (handle, rx)
    }

    /// Queue a message without waiting. Returns false once the writer is gone.
    pub fn enqueue(&self, msg: Outbound) -> bool {
        self.outbound.send(msg).is_ok()
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}
