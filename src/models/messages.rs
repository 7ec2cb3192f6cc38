use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Shared state of a session, as broadcast to every member.
///
/// Empty strings mean "unset" and are left off the wire. `offset` has no
/// unset value and is always serialized.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Opaque locator into the shared content.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub position: String,

    #[serde(default)]
    pub offset: i64,

    /// Coarse-grained label (current section). Travels as `section`.
    #[serde(rename = "section", default, skip_serializing_if = "String::is_empty")]
    pub marker: String,
}

/// Message received from a client. Every field is optional; `null` is read
/// the same as an absent field.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub client_key: Option<String>,
}

impl InboundMessage {
    pub fn position(&self) -> &str {
        self.position.as_deref().unwrap_or_default()
    }

    /// Absent offsets read as zero.
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or_default()
    }

    pub fn section(&self) -> &str {
        self.section.as_deref().unwrap_or_default()
    }

    pub fn client_key(&self) -> &str {
        self.client_key.as_deref().unwrap_or_default()
    }
}
