use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use super::{new_id, now};

/// A user-authored prompt with folder and pin metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Prompt {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    pub title: String,
    /// Rich text body, serialized as markup by the editor.
    pub body_md: String,
    #[serde(default)]
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prompt {
    /// Builds a fresh, unpinned prompt with a new id and `created_at == updated_at`.
    pub fn new(user_id: String, title: String, body_md: String, folder_id: Option<String>) -> Self {
        let timestamp = now();
        Self {
            id: new_id(),
            user_id,
            folder_id,
            title,
            body_md,
            is_pinned: false,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}

/// Partial update for a [`Prompt`]. Absent fields are left untouched.
///
/// `folder_id` is tri-state: absent keeps the folder, `null` clears it and a
/// string moves the prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_md: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub folder_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
}

impl PromptPatch {
    pub fn pinned(is_pinned: bool) -> Self {
        Self {
            is_pinned: Some(is_pinned),
            ..Self::default()
        }
    }

    /// Copies every present field onto `prompt`. Does not touch `updated_at`.
    pub fn apply_to(&self, prompt: &mut Prompt) {
        if let Some(title) = &self.title {
            prompt.title = title.clone();
        }
        if let Some(body) = &self.body_md {
            prompt.body_md = body.clone();
        }
        if let Some(folder_id) = &self.folder_id {
            prompt.folder_id = folder_id.clone();
        }
        if let Some(is_pinned) = self.is_pinned {
            prompt.is_pinned = is_pinned;
        }
    }
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_prompt_has_matching_timestamps() {
        let prompt = Prompt::new("u1".into(), "Title".into(), "<p>Body</p>".into(), None);
        assert_eq!(prompt.created_at, prompt.updated_at);
        assert!(!prompt.is_pinned);
        assert_eq!(prompt.user_id, "u1");
    }

    #[test]
    fn patch_folder_is_tri_state() {
        let absent: PromptPatch = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(absent.folder_id, None);

        let cleared: PromptPatch = serde_json::from_str(r#"{"folder_id":null}"#).unwrap();
        assert_eq!(cleared.folder_id, Some(None));

        let moved: PromptPatch = serde_json::from_str(r#"{"folder_id":"f1"}"#).unwrap();
        assert_eq!(moved.folder_id, Some(Some("f1".to_string())));
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut prompt = Prompt::new("u1".into(), "Old".into(), "body".into(), Some("f1".into()));
        let before = prompt.clone();

        PromptPatch {
            title: Some("New".into()),
            folder_id: Some(None),
            ..PromptPatch::default()
        }
        .apply_to(&mut prompt);

        assert_eq!(prompt.title, "New");
        assert_eq!(prompt.folder_id, None);
        assert_eq!(prompt.body_md, before.body_md);
        assert_eq!(prompt.updated_at, before.updated_at);
    }

    #[test]
    fn serializes_with_column_names() {
        let prompt = Prompt::new("u1".into(), "T".into(), "B".into(), None);
        let value = serde_json::to_value(&prompt).unwrap();
        assert_eq!(value["body_md"], "B");
        assert_eq!(value["is_pinned"], false);
        assert!(value.get("folder_id").is_none());
    }
}
