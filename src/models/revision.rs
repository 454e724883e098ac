use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Immutable snapshot of a prompt body, produced by a refinement action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Revision {
    pub id: String,
    pub prompt_id: String,
    /// Previous revision of the same prompt, if any. Recorded, never walked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_revision_id: Option<String>,
    pub body_md: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_text: Option<String>,
    pub llm_provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<i64>,
    pub created_at: DateTime<Utc>,
}
