use crate::models::{Folder, Prompt, PromptTag, Revision, Tag};
use anyhow::Result;
use async_trait::async_trait;

pub mod filesystem;
pub mod sqlite;

pub use filesystem::FileSystemStore;
pub use sqlite::SqliteStore;

/// Trait defining the durable local record store.
///
/// Every write is insert-or-replace by primary key. Deleting a record that
/// does not exist is not an error.
#[async_trait]
pub trait LocalStore: Send + Sync + 'static { // Send + Sync for Arc<dyn T>
    /// Prompts owned by `owner_id`.
    async fn prompts_by_owner(&self, owner_id: &str) -> Result<Vec<Prompt>>;

    /// Folders owned by `owner_id`. The folder collection has no owner index,
    /// so backends scan it and filter.
    async fn folders_by_owner(&self, owner_id: &str) -> Result<Vec<Folder>>;

    /// Tags owned by `owner_id`. Same unindexed scan as folders.
    async fn tags_by_owner(&self, owner_id: &str) -> Result<Vec<Tag>>;

    /// Revisions of a single prompt, in no particular order.
    async fn revisions_by_prompt(&self, prompt_id: &str) -> Result<Vec<Revision>>;

    /// Tag associations of a single prompt.
    async fn prompt_tags_by_prompt(&self, prompt_id: &str) -> Result<Vec<PromptTag>>;

    async fn put_prompt(&self, prompt: &Prompt) -> Result<()>;
    async fn put_revision(&self, revision: &Revision) -> Result<()>;
    async fn put_folder(&self, folder: &Folder) -> Result<()>;
    async fn put_tag(&self, tag: &Tag) -> Result<()>;
    async fn put_prompt_tag(&self, link: &PromptTag) -> Result<()>;

    async fn delete_prompt(&self, id: &str) -> Result<()>;
    async fn delete_folder(&self, id: &str) -> Result<()>;
    async fn delete_tag(&self, id: &str) -> Result<()>;
    async fn delete_prompt_tag(&self, link: &PromptTag) -> Result<()>;

    /// Removes every association pointing at `tag_id`.
    async fn delete_prompt_tags_for_tag(&self, tag_id: &str) -> Result<()>;
}
