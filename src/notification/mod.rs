/// In-app notification records
///
/// Written as a side effect of lifecycle transitions so dashboards can
/// show "your paper was moderated" style entries. Delivery beyond the
/// database row (email, push) is out of scope.
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Notification record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification manager
#[derive(Clone)]
pub struct NotificationManager {
    db: SqlitePool,
}

impl NotificationManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a notification for a user
    pub async fn notify(&self, user_id: &str, title: &str, message: &str) -> AppResult<Notification> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO notifications (id, user_id, title, message, is_read, created_at)
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(Notification {
            id,
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            is_read: false,
            created_at: now,
        })
    }

    /// List a user's notifications, newest first
    pub async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, message, is_read, created_at
             FROM notifications
             WHERE user_id = ?
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_notification).collect()
    }

    /// Count unread notifications for a user
    pub async fn unread_count(&self, user_id: &str) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.get("n"))
    }

    /// Mark one notification as read. The user scope prevents marking
    /// someone else's notification.
    pub async fn mark_read(&self, id: &str, user_id: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Notification {} not found", id)));
        }

        Ok(())
    }

    /// Mark all of a user's notifications as read
    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

fn parse_notification(row: sqlx::sqlite::SqliteRow) -> AppResult<Notification> {
    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| AppError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        message: row.get("message"),
        is_read: row.get("is_read"),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_db() -> SqlitePool {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&db)
        .await
        .unwrap();

        db
    }

    #[tokio::test]
    async fn test_notify_and_list() {
        let manager = NotificationManager::new(test_db().await);

        manager
            .notify("u1", "Paper moderated", "Your paper CS101 was moderated")
            .await
            .unwrap();

        let list = manager.list_for_user("u1").await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list[0].is_read);
        assert_eq!(manager.unread_count("u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_scoped_to_user() {
        let manager = NotificationManager::new(test_db().await);

        let n = manager.notify("u1", "t", "m").await.unwrap();

        // Another user cannot mark it read
        assert!(manager.mark_read(&n.id, "u2").await.is_err());

        manager.mark_read(&n.id, "u1").await.unwrap();
        assert_eq!(manager.unread_count("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let manager = NotificationManager::new(test_db().await);

        manager.notify("u1", "a", "1").await.unwrap();
        manager.notify("u1", "b", "2").await.unwrap();

        let updated = manager.mark_all_read("u1").await.unwrap();
        assert_eq!(updated, 2);
        assert_eq!(manager.unread_count("u1").await.unwrap(), 0);
    }
}
