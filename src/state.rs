//! In-memory view of one owner's prompts, folders and tags.
//!
//! Every mutation runs the same sequence: build the record, persist it to the
//! local store (errors abort), update the cache, then mirror it remotely
//! (errors are logged and dropped).

use crate::error::{Error, Result};
use crate::models::{next_timestamp, now, new_id, Folder, Prompt, PromptPatch, PromptTag, Revision, Tag};
use crate::reconcile::{self, Conflict, Merge};
use crate::remote::RemoteMirror;
use crate::storage::LocalStore;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_PROVIDER: &str = "openai";

#[derive(Debug, Default)]
struct Cache {
    /// Newest first.
    prompts: Vec<Prompt>,
    folders: Vec<Folder>,
    tags: Vec<Tag>,
    prompt_tags: Vec<PromptTag>,
}

/// Outcome of [`PromptState::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub prompts: usize,
    pub folders: usize,
    pub tags: usize,
    /// Whether the remote listing replaced the local prompt set.
    pub remote_synced: bool,
    pub conflicts: Vec<Conflict>,
}

pub struct PromptState {
    owner_id: String,
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteMirror>,
    cache: RwLock<Cache>,
}

/// Awaits a mirror call only to log its failure.
async fn mirror<F>(operation: &'static str, id: &str, call: F)
where
    F: Future<Output = anyhow::Result<()>>,
{
    match call.await {
        Ok(()) => debug!(operation, id, "Mirrored to remote"),
        Err(e) => warn!(operation, id, error = %e, "Remote mirror write failed, kept locally only"),
    }
}

impl PromptState {
    pub fn new(owner_id: impl Into<String>, local: Arc<dyn LocalStore>, remote: Arc<dyn RemoteMirror>) -> Self {
        Self {
            owner_id: owner_id.into(),
            local,
            remote,
            cache: RwLock::new(Cache::default()),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn read(&self) -> RwLockReadGuard<'_, Cache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Cache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    async fn links_for(&self, prompts: &[Prompt]) -> Result<Vec<PromptTag>> {
        let mut links = Vec::new();
        for prompt in prompts {
            links.extend(self.local.prompt_tags_by_prompt(&prompt.id).await?);
        }
        Ok(links)
    }

    /// Session start: fill the cache from the local store, then let a
    /// reachable remote replace the prompt set. Folders, tags and tag links
    /// are never refreshed from the remote.
    #[instrument(skip(self), fields(owner = %self.owner_id))]
    pub async fn load(&self) -> Result<LoadSummary> {
        let mut prompts = self.local.prompts_by_owner(&self.owner_id).await?;
        sort_newest_first(&mut prompts);
        let folders = self.local.folders_by_owner(&self.owner_id).await?;
        let tags = self.local.tags_by_owner(&self.owner_id).await?;
        let prompt_tags = self.links_for(&prompts).await?;

        let mut summary = LoadSummary {
            prompts: prompts.len(),
            folders: folders.len(),
            tags: tags.len(),
            remote_synced: false,
            conflicts: Vec::new(),
        };
        *self.write() = Cache {
            prompts: prompts.clone(),
            folders,
            tags,
            prompt_tags,
        };
        info!(prompts = summary.prompts, folders = summary.folders, tags = summary.tags, "Loaded local records");

        let remote = match self.remote.list_prompts_by_owner(&self.owner_id).await {
            Ok(remote) => remote,
            Err(e) => {
                info!(error = %e, "Remote unavailable, using local records only");
                return Ok(summary);
            }
        };

        let Merge { merged, conflicts } = reconcile::merge(&prompts, remote);
        for conflict in &conflicts {
            warn!(?conflict, "Local prompt overwritten by remote listing");
        }
        for prompt in &merged {
            self.local.put_prompt(prompt).await?;
        }
        let prompt_tags = self.links_for(&merged).await?;

        summary.prompts = merged.len();
        summary.remote_synced = true;
        summary.conflicts = conflicts;
        {
            let mut cache = self.write();
            cache.prompts = merged;
            cache.prompt_tags = prompt_tags;
        }
        info!(prompts = summary.prompts, conflicts = summary.conflicts.len(), "Replaced prompts with remote listing");
        Ok(summary)
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.read().prompts.clone()
    }

    pub fn folders(&self) -> Vec<Folder> {
        self.read().folders.clone()
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.read().tags.clone()
    }

    pub fn prompt(&self, id: &str) -> Option<Prompt> {
        self.read().prompts.iter().find(|p| p.id == id).cloned()
    }

    #[instrument(skip(self, body), fields(owner = %self.owner_id))]
    pub async fn create_prompt(&self, title: String, body: String, folder_id: Option<String>) -> Result<Prompt> {
        require_non_empty("title", &title)?;
        let prompt = Prompt::new(self.owner_id.clone(), title, body, folder_id);

        self.local.put_prompt(&prompt).await?;
        self.write().prompts.insert(0, prompt.clone());
        mirror("insert_prompt", &prompt.id, self.remote.insert_prompt(&prompt)).await;

        info!(id = %prompt.id, "Prompt created");
        Ok(prompt)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_prompt(&self, id: &str, patch: PromptPatch) -> Result<Prompt> {
        if let Some(title) = &patch.title {
            require_non_empty("title", title)?;
        }
        let mut updated = self.prompt(id).ok_or_else(|| Error::not_found("prompt", id))?;
        patch.apply_to(&mut updated);
        updated.updated_at = next_timestamp(updated.updated_at);

        self.local.put_prompt(&updated).await?;
        if let Some(slot) = self.write().prompts.iter_mut().find(|p| p.id == id) {
            *slot = updated.clone();
        }
        mirror("update_prompt", id, self.remote.update_prompt(id, &patch, updated.updated_at)).await;

        debug!(id, "Prompt updated");
        Ok(updated)
    }

    /// Deletes a prompt and its tag links. Its revisions are kept.
    #[instrument(skip(self))]
    pub async fn delete_prompt(&self, id: &str) -> Result<()> {
        if self.prompt(id).is_none() {
            return Err(Error::not_found("prompt", id));
        }

        for link in self.local.prompt_tags_by_prompt(id).await? {
            self.local.delete_prompt_tag(&link).await?;
        }
        self.local.delete_prompt(id).await?;
        {
            let mut cache = self.write();
            cache.prompts.retain(|p| p.id != id);
            cache.prompt_tags.retain(|l| l.prompt_id != id);
        }
        mirror("delete_prompt_tags", id, self.remote.delete_prompt_tags_for_prompt(id)).await;
        mirror("delete_prompt", id, self.remote.delete_prompt(id)).await;

        info!(id, "Prompt deleted");
        Ok(())
    }

    /// Flips `is_pinned` through [`PromptState::update_prompt`].
    pub async fn toggle_pin(&self, id: &str) -> Result<Prompt> {
        let current = self.prompt(id).ok_or_else(|| Error::not_found("prompt", id))?;
        self.update_prompt(id, PromptPatch::pinned(!current.is_pinned)).await
    }

    /// Appends a revision. Identical bodies are not deduplicated and history
    /// is unbounded. The parent is the prompt's latest revision, if any.
    #[instrument(skip(self, body))]
    pub async fn create_revision(
        &self,
        prompt_id: &str,
        body: String,
        command: Option<String>,
        provider: Option<String>,
        token_usage: Option<i64>,
    ) -> Result<Revision> {
        if self.prompt(prompt_id).is_none() {
            return Err(Error::not_found("prompt", prompt_id));
        }

        let parent = self
            .local
            .revisions_by_prompt(prompt_id)
            .await?
            .into_iter()
            .max_by(|a, b| a.created_at.cmp(&b.created_at));
        let revision = Revision {
            id: new_id(),
            prompt_id: prompt_id.to_string(),
            created_at: parent.as_ref().map_or_else(now, |p| next_timestamp(p.created_at)),
            parent_revision_id: parent.map(|p| p.id),
            body_md: body,
            command_text: command,
            llm_provider: provider.unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            token_usage,
        };

        self.local.put_revision(&revision).await?;
        mirror("insert_revision", &revision.id, self.remote.insert_revision(&revision)).await;

        info!(id = %revision.id, prompt_id, "Revision recorded");
        Ok(revision)
    }

    /// A prompt's revisions from the local store, newest first.
    pub async fn revisions(&self, prompt_id: &str) -> Result<Vec<Revision>> {
        let mut revisions = self.local.revisions_by_prompt(prompt_id).await?;
        revisions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(revisions)
    }

    #[instrument(skip(self))]
    pub async fn create_folder(&self, name: String) -> Result<Folder> {
        require_non_empty("name", &name)?;
        let folder = Folder::new(self.owner_id.clone(), name);

        self.local.put_folder(&folder).await?;
        self.write().folders.push(folder.clone());
        mirror("insert_folder", &folder.id, self.remote.insert_folder(&folder)).await;

        info!(id = %folder.id, "Folder created");
        Ok(folder)
    }

    /// Deletes a folder; its prompts move to no folder.
    #[instrument(skip(self))]
    pub async fn delete_folder(&self, id: &str) -> Result<()> {
        if !self.read().folders.iter().any(|f| f.id == id) {
            return Err(Error::not_found("folder", id));
        }

        let contained: Vec<String> = self
            .read()
            .prompts
            .iter()
            .filter(|p| p.folder_id.as_deref() == Some(id))
            .map(|p| p.id.clone())
            .collect();
        for prompt_id in &contained {
            let patch = PromptPatch {
                folder_id: Some(None),
                ..PromptPatch::default()
            };
            self.update_prompt(prompt_id, patch).await?;
        }

        self.local.delete_folder(id).await?;
        self.write().folders.retain(|f| f.id != id);
        mirror("delete_folder", id, self.remote.delete_folder(id)).await;

        info!(id, moved = contained.len(), "Folder deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create_tag(&self, name: String, color: Option<String>) -> Result<Tag> {
        require_non_empty("name", &name)?;
        let tag = Tag::new(self.owner_id.clone(), name, color);

        self.local.put_tag(&tag).await?;
        self.write().tags.push(tag.clone());
        mirror("insert_tag", &tag.id, self.remote.insert_tag(&tag)).await;

        info!(id = %tag.id, "Tag created");
        Ok(tag)
    }

    /// Deletes a tag and every link to it.
    #[instrument(skip(self))]
    pub async fn delete_tag(&self, id: &str) -> Result<()> {
        if !self.read().tags.iter().any(|t| t.id == id) {
            return Err(Error::not_found("tag", id));
        }

        self.local.delete_prompt_tags_for_tag(id).await?;
        self.local.delete_tag(id).await?;
        {
            let mut cache = self.write();
            cache.tags.retain(|t| t.id != id);
            cache.prompt_tags.retain(|l| l.tag_id != id);
        }
        mirror("delete_tag_links", id, self.remote.delete_prompt_tags_for_tag(id)).await;
        mirror("delete_tag", id, self.remote.delete_tag(id)).await;

        info!(id, "Tag deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn add_tag_to_prompt(&self, prompt_id: &str, tag_id: &str) -> Result<PromptTag> {
        self.require_prompt_and_tag(prompt_id, tag_id)?;
        let link = PromptTag::new(prompt_id, tag_id);

        self.local.put_prompt_tag(&link).await?;
        {
            let mut cache = self.write();
            if !cache.prompt_tags.contains(&link) {
                cache.prompt_tags.push(link.clone());
            }
        }
        mirror("insert_prompt_tag", prompt_id, self.remote.insert_prompt_tag(&link)).await;
        Ok(link)
    }

    #[instrument(skip(self))]
    pub async fn remove_tag_from_prompt(&self, prompt_id: &str, tag_id: &str) -> Result<()> {
        self.require_prompt_and_tag(prompt_id, tag_id)?;
        let link = PromptTag::new(prompt_id, tag_id);

        self.local.delete_prompt_tag(&link).await?;
        self.write().prompt_tags.retain(|l| l != &link);
        mirror("delete_prompt_tag", prompt_id, self.remote.delete_prompt_tag(&link)).await;
        Ok(())
    }

    fn require_prompt_and_tag(&self, prompt_id: &str, tag_id: &str) -> Result<()> {
        let cache = self.read();
        if !cache.prompts.iter().any(|p| p.id == prompt_id) {
            return Err(Error::not_found("prompt", prompt_id));
        }
        if !cache.tags.iter().any(|t| t.id == tag_id) {
            return Err(Error::not_found("tag", tag_id));
        }
        Ok(())
    }

    pub fn tags_for_prompt(&self, prompt_id: &str) -> Vec<Tag> {
        let cache = self.read();
        cache
            .tags
            .iter()
            .filter(|t| cache.prompt_tags.iter().any(|l| l.prompt_id == prompt_id && l.tag_id == t.id))
            .cloned()
            .collect()
    }

    /// Case-insensitive substring match over title and raw body, cache only.
    /// A blank query returns every prompt.
    pub fn search_prompts(&self, query: &str) -> Vec<Prompt> {
        if query.trim().is_empty() {
            return self.prompts();
        }
        let needle = query.to_lowercase();
        self.read()
            .prompts
            .iter()
            .filter(|p| p.title.to_lowercase().contains(&needle) || p.body_md.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Narrows prompts to a folder and/or a tag. `None` means no constraint.
    pub fn filter_prompts(&self, folder_id: Option<&str>, tag_id: Option<&str>) -> Vec<Prompt> {
        let cache = self.read();
        cache
            .prompts
            .iter()
            .filter(|p| folder_id.map_or(true, |f| p.folder_id.as_deref() == Some(f)))
            .filter(|p| {
                tag_id.map_or(true, |t| cache.prompt_tags.iter().any(|l| l.prompt_id == p.id && l.tag_id == t))
            })
            .cloned()
            .collect()
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn sort_newest_first(prompts: &mut [Prompt]) {
    prompts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}
