use thiserror::Error;

use super::handle::SessionId;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("session {0} no longer exists")]
    UnknownSession(SessionId),

    #[error("failed to serialize session state: {0}")]
    Serialize(#[source] serde_json::Error),
}
