use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{new_id, now};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Folder {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Folder {
    pub fn new(user_id: String, name: String) -> Self {
        Self {
            id: new_id(),
            user_id,
            name,
            created_at: now(),
        }
    }
}
