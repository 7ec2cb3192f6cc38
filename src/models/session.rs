use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::SessionState;

/// Read-only view of a live session. The claimed secret is never exposed.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub members: u32,
    pub claimed: bool,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}
