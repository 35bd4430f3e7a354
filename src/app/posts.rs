use anyhow::{anyhow, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashSet;
use time::OffsetDateTime;

use crate::app::pagination::{Page, PageWindow};
use crate::app::slug;
use crate::domain::post::{NewPost, Post, PostChanges, PostStatus};
use crate::infra::db::{is_unique_violation, sortable_timestamp, Db};

/// Insert attempts before giving up on a slug that keeps being taken concurrently.
const MAX_SLUG_ATTEMPTS: u32 = 5;

const POST_SELECT: &str = "SELECT p.id, p.title, p.content, p.slug, p.author_id, \
                                  u.username AS author_username, p.status, p.created_at \
                           FROM posts p \
                           JOIN users u ON p.author_id = u.id";

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Newest first. `None` when `page` is outside the listing.
    pub async fn list_all(&self, page: i64, per_page: i64) -> Result<Option<Page<Post>>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.db.pool())
            .await?;
        let Some(window) = PageWindow::resolve(page, per_page, total) else {
            return Ok(None);
        };

        let rows = sqlx::query(&format!(
            "{} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
            POST_SELECT
        ))
        .bind(window.per_page)
        .bind(window.offset())
        .fetch_all(self.db.pool())
        .await?;

        let posts = rows.iter().map(post_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Some(Page::new(posts, window)))
    }

    pub async fn list_by_author(
        &self,
        author_id: i64,
        page: i64,
        per_page: i64,
    ) -> Result<Option<Page<Post>>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(self.db.pool())
            .await?;
        let Some(window) = PageWindow::resolve(page, per_page, total) else {
            return Ok(None);
        };

        let rows = sqlx::query(&format!(
            "{} WHERE p.author_id = ? ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
            POST_SELECT
        ))
        .bind(author_id)
        .bind(window.per_page)
        .bind(window.offset())
        .fetch_all(self.db.pool())
        .await?;

        let posts = rows.iter().map(post_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Some(Page::new(posts, window)))
    }

    pub async fn get(&self, post_id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("{} WHERE p.id = ?", POST_SELECT))
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(post_from_row).transpose()
    }

    /// Both the id and the slug have to match.
    pub async fn get_by_id_and_slug(&self, post_id: i64, slug: &str) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("{} WHERE p.id = ? AND p.slug = ?", POST_SELECT))
            .bind(post_id)
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(post_from_row).transpose()
    }

    /// Inserts under a fresh slug. A slug claimed between lookup and insert is
    /// skipped on the next attempt.
    pub async fn create(&self, author_id: i64, new_post: NewPost) -> Result<Post> {
        let created_at = sortable_timestamp(OffsetDateTime::now_utc())?;
        let mut rejected: HashSet<String> = HashSet::new();

        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let taken = self.taken_slugs(&new_post.title).await?;
            let slug = slug::unique_slug(&new_post.title, |candidate| {
                taken.contains(candidate) || rejected.contains(candidate)
            });

            let inserted = sqlx::query(
                "INSERT INTO posts (title, content, slug, author_id, status, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?) \
                 RETURNING id",
            )
            .bind(&new_post.title)
            .bind(&new_post.content)
            .bind(&slug)
            .bind(author_id)
            .bind(new_post.status.as_db())
            .bind(&created_at)
            .fetch_one(self.db.pool())
            .await;

            match inserted {
                Ok(row) => {
                    let post_id: i64 = row.get("id");
                    tracing::info!(post_id, author_id, slug = %slug, "post created");
                    return self
                        .get(post_id)
                        .await?
                        .ok_or_else(|| anyhow!("post {} missing after insert", post_id));
                }
                Err(err) if is_unique_violation(&err) => {
                    tracing::warn!(attempt, slug = %slug, "slug taken concurrently, retrying");
                    rejected.insert(slug);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(anyhow!(
            "could not allocate a unique slug for {:?} after {} attempts",
            new_post.title,
            MAX_SLUG_ATTEMPTS
        ))
    }

    /// Rewrites title and content, and status when one is given. The slug is left as it is.
    pub async fn update(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let result = sqlx::query(
            "UPDATE posts SET title = ?, content = ?, status = COALESCE(?, status) WHERE id = ?",
        )
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(changes.status.map(|status| status.as_db()))
        .bind(post_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(post_id).await
    }

    /// Comments go with the post through the foreign key cascade.
    pub async fn delete(&self, post_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Existing slugs that `unique_slug` could produce for `title`.
    async fn taken_slugs(&self, title: &str) -> Result<HashSet<String>> {
        let base = slug::base_slug(title);
        // base only holds [a-z0-9-], so it carries no LIKE wildcards
        let slugs: Vec<String> =
            sqlx::query_scalar("SELECT slug FROM posts WHERE slug = ? OR slug LIKE ?")
                .bind(&base)
                .bind(format!("{}-%", base))
                .fetch_all(self.db.pool())
                .await?;

        Ok(slugs.into_iter().collect())
    }
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    let status: String = row.get("status");
    let status = PostStatus::from_db(&status)
        .ok_or_else(|| anyhow!("unknown post status: {}", status))?;

    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        slug: row.get("slug"),
        author_id: row.get("author_id"),
        author_username: Some(row.get("author_username")),
        status,
        created_at: row.get("created_at"),
    })
}
