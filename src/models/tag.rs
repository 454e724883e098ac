use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::new_id;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Tag {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Display color, e.g. `#ff8800`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Tag {
    pub fn new(user_id: String, name: String, color: Option<String>) -> Self {
        Self {
            id: new_id(),
            user_id,
            name,
            color,
        }
    }
}

/// Association between a prompt and a tag. Identity is the pair of ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, FromRow)]
pub struct PromptTag {
    pub prompt_id: String,
    pub tag_id: String,
}

impl PromptTag {
    pub fn new(prompt_id: impl Into<String>, tag_id: impl Into<String>) -> Self {
        Self {
            prompt_id: prompt_id.into(),
            tag_id: tag_id.into(),
        }
    }
}
