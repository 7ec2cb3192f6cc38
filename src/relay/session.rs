use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{InboundMessage, SessionState, SessionSummary};

use super::handle::{ConnectionHandle, SessionId};

/// What applying one inbound message did to a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// The message presented the first non-empty key and claimed the session.
    pub claimed: bool,
    /// The message key matched the session secret.
    pub authorized: bool,
    /// A non-empty marker was applied.
    pub marker_applied: bool,
}

impl UpdateOutcome {
    /// Members are notified of authorized writes and of any marker change,
    /// including one made by an unauthorized sender.
    pub fn should_broadcast(&self) -> bool {
        self.authorized || self.marker_applied
    }
}

/// One shared room. Only reachable through the registry's lock.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    secret: String,
    members: HashMap<Uuid, ConnectionHandle>,
    state: SessionState,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            secret: String::new(),
            members: HashMap::new(),
            state: SessionState::default(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_claimed(&self) -> bool {
        !self.secret.is_empty()
    }

    pub fn members(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.members.values()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn has_member(&self, handle: &ConnectionHandle) -> bool {
        self.members.contains_key(&handle.id)
    }

    pub(crate) fn add_member(&mut self, handle: ConnectionHandle) {
        self.members.insert(handle.id, handle);
    }

    /// Returns whether the handle was a member.
    pub(crate) fn remove_member(&mut self, handle: &ConnectionHandle) -> bool {
        self.members.remove(&handle.id).is_some()
    }

    /// Run the claim/authorize rules for one message and mutate the state
    /// accordingly. Broadcasting is left to the caller.
    pub fn apply(&mut self, msg: &InboundMessage) -> UpdateOutcome {
        let key = msg.client_key();
        let mut outcome = UpdateOutcome::default();

        if self.secret.is_empty() && !key.is_empty() {
            self.secret = key.to_string();
            outcome.claimed = true;
        }

        outcome.authorized = key == self.secret;

        if !msg.section().is_empty() {
            self.state.marker = msg.section().to_string();
            outcome.marker_applied = true;
        }

        if outcome.authorized {
            if !msg.position().is_empty() {
                self.state.position = msg.position().to_string();
            }
            self.state.offset = msg.offset();
        }

        outcome
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            members: self.members.len() as u32,
            claimed: self.is_claimed(),
            state: self.state.clone(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(json: &str) -> InboundMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn unclaimed_session_accepts_keyless_writes() {
        let mut session = Session::new("room1");
        let outcome = session.apply(&msg(r#"{"position":"p1","offset":3}"#));
        assert!(outcome.authorized);
        assert!(!outcome.claimed);
        assert!(!session.is_claimed());
        assert_eq!(session.state().position, "p1");
        assert_eq!(session.state().offset, 3);
    }

    #[test]
    fn first_non_empty_key_claims_permanently() {
        let mut session = Session::new("room1");
        let first = session.apply(&msg(r#"{"clientKey":"k1","offset":5}"#));
        assert!(first.claimed && first.authorized);

        let second = session.apply(&msg(r#"{"clientKey":"k2","offset":9}"#));
        assert!(!second.claimed);
        assert!(!second.authorized);
        assert_eq!(session.state().offset, 5);

        let owner = session.apply(&msg(r#"{"clientKey":"k1","offset":7}"#));
        assert!(owner.authorized);
        assert_eq!(session.state().offset, 7);
        assert_eq!(session.secret, "k1");
    }

    #[test]
    fn empty_key_is_rejected_once_claimed() {
        let mut session = Session::new("room1");
        session.apply(&msg(r#"{"clientKey":"k1"}"#));
        let outcome = session.apply(&msg(r#"{"position":"p2","offset":1}"#));
        assert!(!outcome.authorized);
        assert_eq!(session.state(), &SessionState::default());
    }

    #[test]
    fn marker_applies_without_authorization() {
        let mut session = Session::new("room1");
        session.apply(&msg(r#"{"clientKey":"k1","offset":5}"#));
        let outcome = session.apply(&msg(r#"{"section":"verse2"}"#));
        assert!(!outcome.authorized);
        assert!(outcome.marker_applied);
        assert!(outcome.should_broadcast());
        assert_eq!(session.state().marker, "verse2");
        assert_eq!(session.state().offset, 5);
    }

    #[test]
    fn empty_position_keeps_previous_but_offset_is_overwritten() {
        let mut session = Session::new("room1");
        session.apply(&msg(r#"{"position":"p1","offset":4}"#));
        session.apply(&msg(r#"{"section":"chorus"}"#));
        assert_eq!(session.state().position, "p1");
        assert_eq!(session.state().offset, 0);
        assert_eq!(session.state().marker, "chorus");
    }

    #[test]
    fn unauthorized_without_marker_does_not_broadcast() {
        let mut session = Session::new("room1");
        session.apply(&msg(r#"{"clientKey":"k1"}"#));
        let outcome = session.apply(&msg(r#"{"clientKey":"bad","offset":9}"#));
        assert!(!outcome.should_broadcast());
    }

    #[test]
    fn summary_hides_secret() {
        let mut session = Session::new("room1");
        session.apply(&msg(r#"{"clientKey":"k1","offset":2}"#));
        let summary = session.summary();
        assert!(summary.claimed);
        assert_eq!(summary.members, 0);
        assert!(!serde_json::to_string(&summary).unwrap().contains("k1"));
    }
}
