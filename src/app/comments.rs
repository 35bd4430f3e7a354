use anyhow::{anyhow, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use time::OffsetDateTime;

use crate::domain::comment::Comment;
use crate::infra::db::{sortable_timestamp, Db};

#[derive(Clone)]
pub struct CommentService {
    db: Db,
}

impl CommentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Active comments only, newest first.
    pub async fn list_active_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, \
                    c.body, c.active, c.created_at \
             FROM comments c \
             JOIN users u ON c.author_id = u.id \
             WHERE c.post_id = ? AND c.active = 1 \
             ORDER BY c.created_at DESC, c.id DESC",
        )
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    pub async fn create(&self, post_id: i64, author_id: i64, body: String) -> Result<Comment> {
        let row = sqlx::query(
            "INSERT INTO comments (post_id, author_id, body, active, created_at) \
             VALUES (?, ?, ?, 1, ?) \
             RETURNING id",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(body)
        .bind(sortable_timestamp(OffsetDateTime::now_utc())?)
        .fetch_one(self.db.pool())
        .await?;
        let comment_id: i64 = row.get("id");

        let row = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, \
                    c.body, c.active, c.created_at \
             FROM comments c \
             JOIN users u ON c.author_id = u.id \
             WHERE c.id = ?",
        )
        .bind(comment_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| anyhow!("comment {} missing after insert", comment_id))?;

        Ok(comment_from_row(&row))
    }
}

fn comment_from_row(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        author_username: Some(row.get("author_username")),
        body: row.get("body"),
        active: row.get("active"),
        created_at: row.get("created_at"),
    }
}
