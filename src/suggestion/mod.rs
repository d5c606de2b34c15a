/// Examiner suggestions
///
/// Free-form improvement suggestions an examiner attaches to a paper,
/// with an optional lecturer reply. Separate from moderation comments,
/// which are created only by lifecycle transitions.
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Suggestion read state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Unread,
    Replied,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Unread => "unread",
            SuggestionStatus::Replied => "replied",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "unread" => Ok(SuggestionStatus::Unread),
            "replied" => Ok(SuggestionStatus::Replied),
            _ => Err(AppError::Internal(format!(
                "Invalid suggestion status: {}",
                s
            ))),
        }
    }
}

/// Suggestion record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub paper_id: String,
    pub examiner_id: String,
    pub text: String,
    pub reply: Option<String>,
    pub status: SuggestionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Suggestion manager
#[derive(Clone)]
pub struct SuggestionManager {
    db: SqlitePool,
}

impl SuggestionManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a suggestion against an existing paper
    pub async fn create(
        &self,
        paper_id: &str,
        examiner_id: &str,
        text: &str,
    ) -> AppResult<Suggestion> {
        if text.trim().is_empty() {
            return Err(AppError::Validation(
                "Suggestion text is required".to_string(),
            ));
        }

        let paper = sqlx::query("SELECT id FROM papers WHERE id = ?")
            .bind(paper_id)
            .fetch_optional(&self.db)
            .await?;
        if paper.is_none() {
            return Err(AppError::NotFound(format!("Paper {} not found", paper_id)));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO suggestions (id, paper_id, examiner_id, text, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, 'unread', ?, ?)",
        )
        .bind(&id)
        .bind(paper_id)
        .bind(examiner_id)
        .bind(text.trim())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(Suggestion {
            id,
            paper_id: paper_id.to_string(),
            examiner_id: examiner_id.to_string(),
            text: text.trim().to_string(),
            reply: None,
            status: SuggestionStatus::Unread,
            created_at: now,
            updated_at: now,
        })
    }

    /// List suggestions for a paper, newest first
    pub async fn list_for_paper(&self, paper_id: &str) -> AppResult<Vec<Suggestion>> {
        let rows = sqlx::query(
            "SELECT id, paper_id, examiner_id, text, reply, status, created_at, updated_at
             FROM suggestions WHERE paper_id = ?
             ORDER BY created_at DESC",
        )
        .bind(paper_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_suggestion).collect()
    }

    /// Record the lecturer's reply and flip the status to replied
    pub async fn reply(&self, id: &str, reply: &str) -> AppResult<Suggestion> {
        if reply.trim().is_empty() {
            return Err(AppError::Validation("Reply text is required".to_string()));
        }

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE suggestions SET reply = ?, status = 'replied', updated_at = ? WHERE id = ?",
        )
        .bind(reply.trim())
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Suggestion {} not found", id)));
        }

        self.get(id).await
    }

    /// Delete a suggestion
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM suggestions WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Suggestion {} not found", id)));
        }

        Ok(())
    }

    /// Count unread suggestions across all papers
    pub async fn unread_count(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM suggestions WHERE status = 'unread'")
            .fetch_one(&self.db)
            .await?;

        Ok(row.get("n"))
    }

    async fn get(&self, id: &str) -> AppResult<Suggestion> {
        let row = sqlx::query(
            "SELECT id, paper_id, examiner_id, text, reply, status, created_at, updated_at
             FROM suggestions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Suggestion {} not found", id)))?;

        parse_suggestion(row)
    }
}

fn parse_suggestion(row: sqlx::sqlite::SqliteRow) -> AppResult<Suggestion> {
    let status_str: String = row.get("status");

    let parse_ts = |s: String| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AppError::Internal(format!("Invalid timestamp: {}", e)))
    };

    Ok(Suggestion {
        id: row.get("id"),
        paper_id: row.get("paper_id"),
        examiner_id: row.get("examiner_id"),
        text: row.get("text"),
        reply: row.get("reply"),
        status: SuggestionStatus::parse(&status_str)?,
        created_at: parse_ts(row.get("created_at"))?,
        updated_at: parse_ts(row.get("updated_at"))?,
    })
}
