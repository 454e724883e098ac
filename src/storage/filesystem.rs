use crate::models::{Folder, Prompt, PromptTag, Revision, Tag};
use crate::storage::LocalStore;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, warn};

const PROMPTS: &str = "prompts";
const REVISIONS: &str = "revisions";
const FOLDERS: &str = "folders";
const TAGS: &str = "tags";
const PROMPT_TAGS: &str = "prompt_tags";

/// Local store keeping one JSON file per record, one directory per collection.
///
/// There are no secondary indexes: every by-owner or by-prompt read scans the
/// collection directory.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    /// Creates a new FileSystemStore rooted at `root`.
    /// Collection directories are created eagerly; failures surface again on first write.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        for collection in [PROMPTS, REVISIONS, FOLDERS, TAGS, PROMPT_TAGS] {
            let dir = root.join(collection);
            if let Err(e) = std::fs::create_dir_all(&dir) {
                error!(path = %dir.display(), error = %e, "Failed to create collection directory during initialization");
            }
        }
        Self { root }
    }

    fn record_path(&self, collection: &str, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            bail!("Invalid record key '{}' for collection '{}'", key, collection);
        }
        Ok(self.root.join(collection).join(format!("{}.json", key)))
    }

    fn link_key(link: &PromptTag) -> String {
        format!("{}__{}", link.prompt_id, link.tag_id)
    }

    async fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match fs::File::open(path).await {
            Ok(mut file) => {
                let mut contents = String::new();
                file.read_to_string(&mut contents)
                    .await
                    .with_context(|| format!("Failed to read record file: {}", path.display()))?;
                serde_json::from_str(&contents)
                    .map(Some)
                    .with_context(|| format!("Failed to deserialize record from file: {}", path.display()))
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to open record file: {}", path.display())),
        }
    }

    /// Reads every record of a collection that passes `keep`.
    async fn scan<T, F>(&self, collection: &str, keep: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let dir = self.root.join(collection);
        let mut records = Vec::new();
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read collection directory '{}'", dir.display()))
            }
        };

        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            match Self::read_record::<T>(&path).await {
                Ok(Some(record)) if keep(&record) => records.push(record),
                Ok(Some(_)) => {}
                Ok(None) => warn!(path = %path.display(), "Record file vanished during scan"),
                Err(e) => warn!(path = %path.display(), error = %e, "Error reading record file during scan"),
            }
        }
        debug!(collection, count = records.len(), "Scanned collection");
        Ok(records)
    }

    async fn write<T: Serialize>(&self, collection: &str, key: &str, record: &T) -> Result<()> {
        let path = self.record_path(collection, key)?;
        let contents = serde_json::to_string_pretty(record)
            .with_context(|| format!("Failed to serialize {} record {}", collection, key))?;

        let dir = self.root.join(collection);
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create collection directory '{}'", dir.display()))?;
        }

        let mut file = fs::File::create(&path)
            .await
            .with_context(|| format!("Failed to create/open record file for writing: {}", path.display()))?;
        file.write_all(contents.as_bytes())
            .await
            .with_context(|| format!("Failed to write to record file: {}", path.display()))?;
        file.sync_all()
            .await
            .with_context(|| format!("Failed to flush record file: {}", path.display()))
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<()> {
        let path = self.record_path(collection, key)?;
        match fs::remove_file(&path).await {
            Ok(_) => Ok(()),
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete record file: {}", path.display())),
        }
    }
}

#[async_trait]
impl LocalStore for FileSystemStore {
    async fn prompts_by_owner(&self, owner_id: &str) -> Result<Vec<Prompt>> {
        self.scan(PROMPTS, |p: &Prompt| p.user_id == owner_id).await
    }

    async fn folders_by_owner(&self, owner_id: &str) -> Result<Vec<Folder>> {
        self.scan(FOLDERS, |f: &Folder| f.user_id == owner_id).await
    }

    async fn tags_by_owner(&self, owner_id: &str) -> Result<Vec<Tag>> {
        self.scan(TAGS, |t: &Tag| t.user_id == owner_id).await
    }

    async fn revisions_by_prompt(&self, prompt_id: &str) -> Result<Vec<Revision>> {
        self.scan(REVISIONS, |r: &Revision| r.prompt_id == prompt_id).await
    }

    async fn prompt_tags_by_prompt(&self, prompt_id: &str) -> Result<Vec<PromptTag>> {
        self.scan(PROMPT_TAGS, |l: &PromptTag| l.prompt_id == prompt_id).await
    }

    async fn put_prompt(&self, prompt: &Prompt) -> Result<()> {
        self.write(PROMPTS, &prompt.id, prompt).await
    }

    async fn put_revision(&self, revision: &Revision) -> Result<()> {
        self.write(REVISIONS, &revision.id, revision).await
    }

    async fn put_folder(&self, folder: &Folder) -> Result<()> {
        self.write(FOLDERS, &folder.id, folder).await
    }

    async fn put_tag(&self, tag: &Tag) -> Result<()> {
        self.write(TAGS, &tag.id, tag).await
    }

    async fn put_prompt_tag(&self, link: &PromptTag) -> Result<()> {
        self.write(PROMPT_TAGS, &Self::link_key(link), link).await
    }

    async fn delete_prompt(&self, id: &str) -> Result<()> {
        self.remove(PROMPTS, id).await
    }

    async fn delete_folder(&self, id: &str) -> Result<()> {
        self.remove(FOLDERS, id).await
    }

    async fn delete_tag(&self, id: &str) -> Result<()> {
        self.remove(TAGS, id).await
    }

    async fn delete_prompt_tag(&self, link: &PromptTag) -> Result<()> {
        self.remove(PROMPT_TAGS, &Self::link_key(link)).await
    }

    async fn delete_prompt_tags_for_tag(&self, tag_id: &str) -> Result<()> {
        let links = self.scan(PROMPT_TAGS, |l: &PromptTag| l.tag_id == tag_id).await?;
        for link in &links {
            self.delete_prompt_tag(link).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn records_survive_reopen() -> Result<()> {
        let dir = tempdir()?;
        let prompt = Prompt::new("u1".into(), "Title".into(), "Body".into(), None);
        {
            let store = FileSystemStore::new(dir.path());
            store.put_prompt(&prompt).await?;
        }

        let reopened = FileSystemStore::new(dir.path());
        let prompts = reopened.prompts_by_owner("u1").await?;
        assert_eq!(prompts, vec![prompt]);
        Ok(())
    }

    #[tokio::test]
    async fn put_replaces_by_id() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSystemStore::new(dir.path());
        let mut prompt = Prompt::new("u1".into(), "Old".into(), "Body".into(), None);
        store.put_prompt(&prompt).await?;
        prompt.title = "New".into();
        store.put_prompt(&prompt).await?;

        let prompts = store.prompts_by_owner("u1").await?;
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].title, "New");
        Ok(())
    }

    #[tokio::test]
    async fn folders_and_tags_are_filtered_by_owner() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSystemStore::new(dir.path());
        store.put_folder(&Folder::new("u1".into(), "Mine".into())).await?;
        store.put_folder(&Folder::new("u2".into(), "Theirs".into())).await?;
        store.put_tag(&Tag::new("u2".into(), "other".into(), None)).await?;

        let folders = store.folders_by_owner("u1").await?;
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "Mine");
        assert!(store.tags_by_owner("u1").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_files_are_skipped() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSystemStore::new(dir.path());
        std::fs::write(dir.path().join(PROMPTS).join("broken.json"), "{not json")?;
        store
            .put_prompt(&Prompt::new("u1".into(), "Ok".into(), "".into(), None))
            .await?;

        assert_eq!(store.prompts_by_owner("u1").await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn deleting_tag_links_leaves_other_tags() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSystemStore::new(dir.path());
        store.put_prompt_tag(&PromptTag::new("p1", "t1")).await?;
        store.put_prompt_tag(&PromptTag::new("p1", "t2")).await?;
        store.put_prompt_tag(&PromptTag::new("p2", "t1")).await?;

        store.delete_prompt_tags_for_tag("t1").await?;

        assert_eq!(store.prompt_tags_by_prompt("p1").await?, vec![PromptTag::new("p1", "t2")]);
        assert!(store.prompt_tags_by_prompt("p2").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn deleting_missing_record_is_ok() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSystemStore::new(dir.path());
        store.delete_prompt("does-not-exist").await?;
        assert!(store.delete_prompt("../escape").await.is_err());
        Ok(())
    }
}
