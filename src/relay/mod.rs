//! Session registry and state relay.

pub mod broadcast;
pub mod error;
pub mod handle;
pub mod registry;
pub mod session;

pub use error::RelayError;
pub use handle::{ConnectionHandle, Outbound, SessionId};
pub use registry::{Registry, RegistryStats};
pub use session::{Session, UpdateOutcome};

use crate::models::InboundMessage;
use tracing::debug;

/// Handle one text message from `sender`: apply it to the sender's session
/// and fan out the result when warranted.
///
/// `UnknownSession` is returned when the session is gone or no longer lists
/// the sender, which only happens while the connection is being torn down.
pub async fn process_message(
    registry: &Registry,
    sender: &ConnectionHandle,
    raw: &str,
) -> Result<UpdateOutcome, RelayError> {
    let session = registry
        .lookup(&sender.session_id)
        .await
        .ok_or_else(|| RelayError::UnknownSession(sender.session_id.clone()))?;

    let msg: InboundMessage = serde_json::from_str(raw)?;

    let mut guard = session.lock().await;
    if !guard.has_member(sender) {
        return Err(RelayError::UnknownSession(sender.session_id.clone()));
    }

    let outcome = guard.apply(&msg);
    debug!(
        session = %sender.session_id,
        conn = %sender.id,
        claimed = outcome.claimed,
        authorized = outcome.authorized,
        "applied message"
    );
    if outcome.should_broadcast() {
        broadcast::broadcast(&guard);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_util::sync::CancellationToken;

    async fn join(registry: &Registry, session: &str) -> (ConnectionHandle, UnboundedReceiver<Outbound>) {
        let (handle, rx) = ConnectionHandle::new(session, CancellationToken::new());
        registry.attach(&handle).await;
        (handle, rx)
    }

    fn next_state(rx: &mut UnboundedReceiver<Outbound>) -> Option<String> {
        match rx.try_recv() {
            Ok(Outbound::State(payload)) => Some(payload.to_string()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn claim_and_broadcast_scenario() {
        let registry = Registry::new();

        let (a, mut rx_a) = join(&registry, "room1").await;
        assert_eq!(next_state(&mut rx_a).as_deref(), Some(r#"{"offset":0}"#));

        let outcome = process_message(&registry, &a, r#"{"clientKey":"k1","offset":5}"#)
            .await
            .unwrap();
        assert!(outcome.claimed);
        assert_eq!(next_state(&mut rx_a).as_deref(), Some(r#"{"offset":5}"#));

        let (b, mut rx_b) = join(&registry, "room1").await;
        assert_eq!(next_state(&mut rx_b).as_deref(), Some(r#"{"offset":5}"#));

        let rejected = process_message(&registry, &b, r#"{"clientKey":"bad","offset":9}"#)
            .await
            .unwrap();
        assert!(!rejected.authorized);
        assert_eq!(next_state(&mut rx_a), None);
        assert_eq!(next_state(&mut rx_b), None);

        process_message(&registry, &b, r#"{"section":"verse2"}"#)
            .await
            .unwrap();
        let expected = r#"{"offset":5,"section":"verse2"}"#;
        assert_eq!(next_state(&mut rx_a).as_deref(), Some(expected));
        assert_eq!(next_state(&mut rx_b).as_deref(), Some(expected));

        registry.detach(&a).await;
        let session = registry.lookup("room1").await.unwrap();
        assert_eq!(session.lock().await.member_count(), 1);
        assert_eq!(session.lock().await.state().offset, 5);

        registry.detach(&b).await;
        assert!(registry.lookup("room1").await.is_none());
    }

    #[tokio::test]
    async fn malformed_message_is_a_decode_error_and_leaves_state_alone() {
        let registry = Registry::new();
        let (a, mut rx_a) = join(&registry, "room1").await;
        next_state(&mut rx_a);

        let err = process_message(&registry, &a, "not json").await.unwrap_err();
        assert!(matches!(err, RelayError::Decode(_)));
        assert_eq!(next_state(&mut rx_a), None);

        process_message(&registry, &a, r#"{"offset":2}"#).await.unwrap();
        assert_eq!(next_state(&mut rx_a).as_deref(), Some(r#"{"offset":2}"#));
    }

    #[tokio::test]
    async fn detached_sender_gets_unknown_session() {
        let registry = Registry::new();
        let (a, _rx_a) = join(&registry, "room1").await;
        let (b, mut rx_b) = join(&registry, "room1").await;
        next_state(&mut rx_b);

        registry.detach(&a).await;
        let err = process_message(&registry, &a, r#"{"offset":1}"#).await.unwrap_err();
        assert!(matches!(err, RelayError::UnknownSession(id) if id == "room1"));
        assert_eq!(next_state(&mut rx_b), None);

        registry.detach(&b).await;
        let err = process_message(&registry, &b, r#"{"offset":1}"#).await.unwrap_err();
        assert!(matches!(err, RelayError::UnknownSession(_)));
    }

    #[tokio::test]
    async fn no_broadcast_reaches_a_detached_handle() {
        let registry = Registry::new();
        let (a, mut rx_a) = join(&registry, "room1").await;
        let (b, _rx_b) = join(&registry, "room1").await;
        next_state(&mut rx_a);

        registry.detach(&a).await;
        process_message(&registry, &b, r#"{"offset":4}"#).await.unwrap();
        assert!(rx_a.try_recv().is_err());
    }
}
