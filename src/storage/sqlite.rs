use super::LocalStore;
use crate::models::{Folder, Prompt, PromptTag, Revision, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::debug;

/// Tables and indexes of the local database.
///
/// `folders` and `tags` deliberately carry no `user_id` index; owner reads
/// on them scan and filter.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS prompts (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        folder_id TEXT,
        title TEXT NOT NULL,
        body_md TEXT NOT NULL,
        is_pinned BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_prompts_user_id ON prompts(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_prompts_folder_id ON prompts(folder_id)",
    "CREATE INDEX IF NOT EXISTS idx_prompts_is_pinned ON prompts(is_pinned)",
    r#"
    CREATE TABLE IF NOT EXISTS revisions (
        id TEXT PRIMARY KEY,
        prompt_id TEXT NOT NULL,
        parent_revision_id TEXT,
        body_md TEXT NOT NULL,
        command_text TEXT,
        llm_provider TEXT NOT NULL,
        token_usage INTEGER,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_revisions_prompt_id ON revisions(prompt_id)",
    r#"
    CREATE TABLE IF NOT EXISTS folders (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tags (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        color TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS prompt_tags (
        prompt_id TEXT NOT NULL,
        tag_id TEXT NOT NULL,
        PRIMARY KEY (prompt_id, tag_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_prompt_tags_prompt_id ON prompt_tags(prompt_id)",
    "CREATE INDEX IF NOT EXISTS idx_prompt_tags_tag_id ON prompt_tags(tag_id)",
];

/// SQLite-backed local store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create database directory '{}'", parent.display()))?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database '{}'", path.display()))?;
        Ok(Self { pool })
    }

    /// Initializes the database schema if it doesn't exist.
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to initialize local database schema")?;
        }
        debug!("Local database schema ready");
        Ok(())
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn prompts_by_owner(&self, owner_id: &str) -> Result<Vec<Prompt>> {
        sqlx::query_as::<_, Prompt>(
            "SELECT id, user_id, folder_id, title, body_md, is_pinned, created_at, updated_at
             FROM prompts WHERE user_id = ?",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch prompts for owner '{}'", owner_id))
    }

    async fn folders_by_owner(&self, owner_id: &str) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>("SELECT id, user_id, name, created_at FROM folders")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch folders")?;
        Ok(folders.into_iter().filter(|f| f.user_id == owner_id).collect())
    }

    async fn tags_by_owner(&self, owner_id: &str) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, user_id, name, color FROM tags")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch tags")?;
        Ok(tags.into_iter().filter(|t| t.user_id == owner_id).collect())
    }

    async fn revisions_by_prompt(&self, prompt_id: &str) -> Result<Vec<Revision>> {
        sqlx::query_as::<_, Revision>(
            "SELECT id, prompt_id, parent_revision_id, body_md, command_text, llm_provider, token_usage, created_at
             FROM revisions WHERE prompt_id = ?",
        )
        .bind(prompt_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch revisions for prompt '{}'", prompt_id))
    }

    async fn prompt_tags_by_prompt(&self, prompt_id: &str) -> Result<Vec<PromptTag>> {
        sqlx::query_as::<_, PromptTag>("SELECT prompt_id, tag_id FROM prompt_tags WHERE prompt_id = ?")
            .bind(prompt_id)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch tag links for prompt '{}'", prompt_id))
    }

    async fn put_prompt(&self, prompt: &Prompt) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO prompts (id, user_id, folder_id, title, body_md, is_pinned, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&prompt.id)
        .bind(&prompt.user_id)
        .bind(&prompt.folder_id)
        .bind(&prompt.title)
        .bind(&prompt.body_md)
        .bind(prompt.is_pinned)
        .bind(prompt.created_at)
        .bind(prompt.updated_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save prompt '{}'", prompt.id))?;
        Ok(())
    }

    async fn put_revision(&self, revision: &Revision) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO revisions
             (id, prompt_id, parent_revision_id, body_md, command_text, llm_provider, token_usage, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&revision.id)
        .bind(&revision.prompt_id)
        .bind(&revision.parent_revision_id)
        .bind(&revision.body_md)
        .bind(&revision.command_text)
        .bind(&revision.llm_provider)
        .bind(revision.token_usage)
        .bind(revision.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save revision '{}'", revision.id))?;
        Ok(())
    }

    async fn put_folder(&self, folder: &Folder) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO folders (id, user_id, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(&folder.id)
            .bind(&folder.user_id)
            .bind(&folder.name)
            .bind(folder.created_at)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to save folder '{}'", folder.id))?;
        Ok(())
    }

    async fn put_tag(&self, tag: &Tag) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO tags (id, user_id, name, color) VALUES (?, ?, ?, ?)")
            .bind(&tag.id)
            .bind(&tag.user_id)
            .bind(&tag.name)
            .bind(&tag.color)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to save tag '{}'", tag.id))?;
        Ok(())
    }

    async fn put_prompt_tag(&self, link: &PromptTag) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO prompt_tags (prompt_id, tag_id) VALUES (?, ?)")
            .bind(&link.prompt_id)
            .bind(&link.tag_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to link prompt '{}' to tag '{}'", link.prompt_id, link.tag_id))?;
        Ok(())
    }

    async fn delete_prompt(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM prompts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete prompt '{}'", id))?;
        Ok(())
    }

    async fn delete_folder(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete folder '{}'", id))?;
        Ok(())
    }

    async fn delete_tag(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete tag '{}'", id))?;
        Ok(())
    }

    async fn delete_prompt_tag(&self, link: &PromptTag) -> Result<()> {
        sqlx::query("DELETE FROM prompt_tags WHERE prompt_id = ? AND tag_id = ?")
            .bind(&link.prompt_id)
            .bind(&link.tag_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to unlink prompt '{}' from tag '{}'", link.prompt_id, link.tag_id))?;
        Ok(())
    }

    async fn delete_prompt_tags_for_tag(&self, tag_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM prompt_tags WHERE tag_id = ?")
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete links for tag '{}'", tag_id))?;
        Ok(())
    }
}
