use super::RemoteMirror;
use crate::models::{Folder, Prompt, PromptPatch, PromptTag, Revision, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::sync::Arc;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS prompts (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        folder_id TEXT,
        title TEXT NOT NULL,
        body_md TEXT NOT NULL,
        is_pinned BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_prompts_user_id ON prompts(user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS revisions (
        id TEXT PRIMARY KEY,
        prompt_id TEXT NOT NULL,
        parent_revision_id TEXT,
        body_md TEXT NOT NULL,
        command_text TEXT,
        llm_provider TEXT NOT NULL,
        token_usage BIGINT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS folders (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
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
];

/// `UPDATE` touching only the fields present in `patch`, plus `updated_at`.
fn update_query(id: &str, patch: &PromptPatch, updated_at: DateTime<Utc>) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new("UPDATE prompts SET updated_at = ");
    query.push_bind(updated_at);
    if let Some(title) = &patch.title {
        query.push(", title = ").push_bind(title.clone());
    }
    if let Some(body) = &patch.body_md {
        query.push(", body_md = ").push_bind(body.clone());
    }
    if let Some(folder_id) = &patch.folder_id {
        query.push(", folder_id = ").push_bind(folder_id.clone());
    }
    if let Some(is_pinned) = patch.is_pinned {
        query.push(", is_pinned = ").push_bind(is_pinned);
    }
    query.push(" WHERE id = ").push_bind(id.to_string());
    query
}

/// PostgreSQL remote mirror.
#[derive(Clone)]
pub struct PostgresMirror {
    pool: Arc<PgPool>,
}

impl PostgresMirror {
    /// Builds a lazily connecting pool, so an unreachable remote does not
    /// block startup; the first failing call is logged by the caller instead.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5) // Configure pool size
            .connect_lazy(database_url)
            .context("Failed to create PostgreSQL connection pool")?;
        Ok(PostgresMirror {
            pool: Arc::new(pool),
        })
    }

    /// Initializes the remote schema if it doesn't exist.
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .context("Failed to initialize remote database schema")?;
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteMirror for PostgresMirror {
    async fn list_prompts_by_owner(&self, owner_id: &str) -> Result<Vec<Prompt>> {
        sqlx::query_as::<_, Prompt>(
            "SELECT id, user_id, folder_id, title, body_md, is_pinned, created_at, updated_at
             FROM prompts WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&*self.pool)
        .await
        .with_context(|| format!("Failed to fetch prompts for owner '{}' from database", owner_id))
    }

    async fn insert_prompt(&self, prompt: &Prompt) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO prompts (id, user_id, folder_id, title, body_md, is_pinned, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&prompt.id)
        .bind(&prompt.user_id)
        .bind(&prompt.folder_id)
        .bind(&prompt.title)
        .bind(&prompt.body_md)
        .bind(prompt.is_pinned)
        .bind(prompt.created_at)
        .bind(prompt.updated_at)
        .execute(&*self.pool)
        .await
        .with_context(|| format!("Failed to insert prompt with id '{}' into database", prompt.id))?;
        Ok(())
    }

    async fn update_prompt(&self, id: &str, patch: &PromptPatch, updated_at: DateTime<Utc>) -> Result<()> {
        update_query(id, patch, updated_at)
            .build()
            .execute(&*self.pool)
            .await
            .with_context(|| format!("Failed to update prompt with id '{}' in database", id))?;
        Ok(())
    }

    async fn delete_prompt(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM prompts WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .with_context(|| format!("Failed to delete prompt with id '{}' from database", id))?;
        Ok(())
    }

    async fn insert_revision(&self, revision: &Revision) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO revisions
                (id, prompt_id, parent_revision_id, body_md, command_text, llm_provider, token_usage, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&revision.id)
        .bind(&revision.prompt_id)
        .bind(&revision.parent_revision_id)
        .bind(&revision.body_md)
        .bind(&revision.command_text)
        .bind(&revision.llm_provider)
        .bind(revision.token_usage)
        .bind(revision.created_at)
        .execute(&*self.pool)
        .await
        .with_context(|| format!("Failed to insert revision with id '{}' into database", revision.id))?;
        Ok(())
    }

    async fn insert_folder(&self, folder: &Folder) -> Result<()> {
        sqlx::query("INSERT INTO folders (id, user_id, name, created_at) VALUES ($1, $2, $3, $4)")
            .bind(&folder.id)
            .bind(&folder.user_id)
            .bind(&folder.name)
            .bind(folder.created_at)
            .execute(&*self.pool)
            .await
            .with_context(|| format!("Failed to insert folder with id '{}' into database", folder.id))?;
        Ok(())
    }

    async fn delete_folder(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM folders WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .with_context(|| format!("Failed to delete folder with id '{}' from database", id))?;
        Ok(())
    }

    async fn insert_tag(&self, tag: &Tag) -> Result<()> {
        sqlx::query("INSERT INTO tags (id, user_id, name, color) VALUES ($1, $2, $3, $4)")
            .bind(&tag.id)
            .bind(&tag.user_id)
            .bind(&tag.name)
            .bind(&tag.color)
            .execute(&*self.pool)
            .await
            .with_context(|| format!("Failed to insert tag with id '{}' into database", tag.id))?;
        Ok(())
    }

    async fn delete_tag(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .with_context(|| format!("Failed to delete tag with id '{}' from database", id))?;
        Ok(())
    }

    async fn insert_prompt_tag(&self, link: &PromptTag) -> Result<()> {
        sqlx::query("INSERT INTO prompt_tags (prompt_id, tag_id) VALUES ($1, $2)")
            .bind(&link.prompt_id)
            .bind(&link.tag_id)
            .execute(&*self.pool)
            .await
            .with_context(|| {
                format!("Failed to link prompt '{}' to tag '{}' in database", link.prompt_id, link.tag_id)
            })?;
        Ok(())
    }

    async fn delete_prompt_tag(&self, link: &PromptTag) -> Result<()> {
        sqlx::query("DELETE FROM prompt_tags WHERE prompt_id = $1 AND tag_id = $2")
            .bind(&link.prompt_id)
            .bind(&link.tag_id)
            .execute(&*self.pool)
            .await
            .with_context(|| {
                format!("Failed to unlink prompt '{}' from tag '{}' in database", link.prompt_id, link.tag_id)
            })?;
        Ok(())
    }

    async fn delete_prompt_tags_for_prompt(&self, prompt_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM prompt_tags WHERE prompt_id = $1")
            .bind(prompt_id)
            .execute(&*self.pool)
            .await
            .with_context(|| format!("Failed to delete tag links of prompt '{}' from database", prompt_id))?;
        Ok(())
    }

    async fn delete_prompt_tags_for_tag(&self, tag_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM prompt_tags WHERE tag_id = $1")
            .bind(tag_id)
            .execute(&*self.pool)
            .await
            .with_context(|| format!("Failed to delete links of tag '{}' from database", tag_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::now;

    #[test]
    fn title_patch_sets_only_title() {
        let patch = PromptPatch {
            title: Some("New".into()),
            ..PromptPatch::default()
        };
        let query = update_query("p1", &patch, now());
        assert_eq!(query.sql(), "UPDATE prompts SET updated_at = $1, title = $2 WHERE id = $3");
    }

    #[test]
    fn cleared_folder_is_written() {
        let patch = PromptPatch {
            folder_id: Some(None),
            ..PromptPatch::default()
        };
        let query = update_query("p1", &patch, now());
        assert_eq!(query.sql(), "UPDATE prompts SET updated_at = $1, folder_id = $2 WHERE id = $3");
    }

    #[test]
    fn empty_patch_only_touches_updated_at() {
        let query = update_query("p1", &PromptPatch::default(), now());
        assert_eq!(query.sql(), "UPDATE prompts SET updated_at = $1 WHERE id = $2");
    }

    #[test]
    fn full_patch_keeps_column_order() {
        let patch = PromptPatch {
            title: Some("T".into()),
            body_md: Some("B".into()),
            folder_id: Some(Some("f1".into())),
            is_pinned: Some(true),
        };
        let query = update_query("p1", &patch, now());
        assert_eq!(
            query.sql(),
            "UPDATE prompts SET updated_at = $1, title = $2, body_md = $3, folder_id = $4, is_pinned = $5 WHERE id = $6"
        );
    }
}
