use crate::models::{Folder, Prompt, PromptPatch, PromptTag, Revision, Tag};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod postgres;

pub use postgres::PostgresMirror;

/// Thin client for the hosted relational copy of the local records.
///
/// Any call may fail. Callers treat the mirror as best-effort: failures are
/// logged and dropped, never retried.
#[async_trait]
pub trait RemoteMirror: Send + Sync + 'static {
    /// Lists an owner's prompts, most recently updated first.
    async fn list_prompts_by_owner(&self, owner_id: &str) -> Result<Vec<Prompt>>;

    async fn insert_prompt(&self, prompt: &Prompt) -> Result<()>;

    /// Writes the fields present in `patch`, plus `updated_at`.
    async fn update_prompt(&self, id: &str, patch: &PromptPatch, updated_at: DateTime<Utc>) -> Result<()>;

    async fn delete_prompt(&self, id: &str) -> Result<()>;

    async fn insert_revision(&self, revision: &Revision) -> Result<()>;

    async fn insert_folder(&self, folder: &Folder) -> Result<()>;
    async fn delete_folder(&self, id: &str) -> Result<()>;

    async fn insert_tag(&self, tag: &Tag) -> Result<()>;
    async fn delete_tag(&self, id: &str) -> Result<()>;

    async fn insert_prompt_tag(&self, link: &PromptTag) -> Result<()>;
    async fn delete_prompt_tag(&self, link: &PromptTag) -> Result<()>;
    async fn delete_prompt_tags_for_prompt(&self, prompt_id: &str) -> Result<()>;
    async fn delete_prompt_tags_for_tag(&self, tag_id: &str) -> Result<()>;
}

/// Mirror used when no remote database is configured. Every call fails, so
/// the local store stays authoritative.
#[derive(Debug, Clone, Default)]
pub struct OfflineMirror;

#[async_trait]
impl RemoteMirror for OfflineMirror {
    async fn list_prompts_by_owner(&self, _owner_id: &str) -> Result<Vec<Prompt>> {
        bail!("remote mirror not configured")
    }

    async fn insert_prompt(&self, _prompt: &Prompt) -> Result<()> {
        bail!("remote mirror not configured")
    }

    async fn update_prompt(&self, _id: &str, _patch: &PromptPatch, _updated_at: DateTime<Utc>) -> Result<()> {
        bail!("remote mirror not configured")
    }

    async fn delete_prompt(&self, _id: &str) -> Result<()> {
        bail!("remote mirror not configured")
    }

    async fn insert_revision(&self, _revision: &Revision) -> Result<()> {
        bail!("remote mirror not configured")
    }

    async fn insert_folder(&self, _folder: &Folder) -> Result<()> {
        bail!("remote mirror not configured")
    }

    async fn delete_folder(&self, _id: &str) -> Result<()> {
        bail!("remote mirror not configured")
    }

    async fn insert_tag(&self, _tag: &Tag) -> Result<()> {
        bail!("remote mirror not configured")
    }

    async fn delete_tag(&self, _id: &str) -> Result<()> {
        bail!("remote mirror not configured")
    }

    async fn insert_prompt_tag(&self, _link: &PromptTag) -> Result<()> {
        bail!("remote mirror not configured")
    }

    async fn delete_prompt_tag(&self, _link: &PromptTag) -> Result<()> {
        bail!("remote mirror not configured")
    }

    async fn delete_prompt_tags_for_prompt(&self, _prompt_id: &str) -> Result<()> {
        bail!("remote mirror not configured")
    }

    async fn delete_prompt_tags_for_tag(&self, _tag_id: &str) -> Result<()> {
        bail!("remote mirror not configured")
    }
}
