//! Fan-out of session state to connected members.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::SessionState;

use super::error::RelayError;
use super::handle::{ConnectionHandle, Outbound};
use super::session::Session;

/// Serialize a state payload once for every recipient.
pub fn encode_state(state: &SessionState) -> Result<Arc<str>, RelayError> {
    serde_json::to_string(state)
        .map(Arc::from)
        .map_err(RelayError::Serialize)
}

/// Queue the current state on every member. Returns the number of members it
/// was queued on. A serialization failure skips this event only.
pub fn broadcast(session: &Session) -> usize {
    let payload = match encode_state(session.state()) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(session = %session.id(), error = %e, "skipping broadcast");
            return 0;
        }
    };

    let mut recipients = 0;
    for member in session.members() {
        if member.enqueue(Outbound::State(Arc::clone(&payload))) {
            recipients += 1;
        } else {
            debug!(session = %session.id(), conn = %member.id, "writer gone, not queued");
        }
    }
    debug!(session = %session.id(), recipients, "broadcast state");
    recipients
}

/// Queue the current state on a single connection, used right after it joins.
pub fn send_current_state(session: &Session, handle: &ConnectionHandle) -> bool {
    match encode_state(session.state()) {
        Ok(payload) => handle.enqueue(Outbound::State(payload)),
        Err(e) => {
            warn!(session = %session.id(), conn = %handle.id, error = %e, "failed to send current state");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InboundMessage;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn broadcast_reaches_every_member_with_the_same_payload() {
        let mut session = Session::new("room1");
        let (a, mut rx_a) = ConnectionHandle::new("room1", CancellationToken::new());
        let (b, mut rx_b) = ConnectionHandle::new("room1", CancellationToken::new());
        session.add_member(a);
        session.add_member(b);
        session.apply(&InboundMessage {
            offset: Some(3),
            ..Default::default()
        });

        assert_eq!(broadcast(&session), 2);
        let expected = Outbound::State(r#"{"offset":3}"#.into());
        assert_eq!(rx_a.try_recv().unwrap(), expected);
        assert_eq!(rx_b.try_recv().unwrap(), expected);
    }

    #[test]
    fn broadcast_skips_members_whose_writer_is_gone() {
        let mut session = Session::new("room1");
        let (a, rx_a) = ConnectionHandle::new("room1", CancellationToken::new());
        let (b, mut rx_b) = ConnectionHandle::new("room1", CancellationToken::new());
        session.add_member(a);
        session.add_member(b);
        drop(rx_a);

        assert_eq!(broadcast(&session), 1);
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn send_current_state_targets_one_handle() {
        let mut session = Session::new("room1");
        let (a, mut rx_a) = ConnectionHandle::new("room1", CancellationToken::new());
        let (b, mut rx_b) = ConnectionHandle::new("room1", CancellationToken::new());
        session.add_member(a);
        session.add_member(b.clone());

        assert!(send_current_state(&session, &b));
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), Outbound::State(r#"{"offset":0}"#.into()));
    }
}
