/// Paper Lifecycle Manager
///
/// Owns the paper's status field. Every transition is validated against
/// the transition table and the requesting actor, then persisted in a
/// single transaction together with its signature entry, so no partial
/// update is ever observable. Concurrent transitions on the same paper
/// are detected with a compare-and-swap on (status, version).
use crate::{
    blob_store::DocumentStore,
    error::{AppError, AppResult},
    paper::models::{
        new_paper_id, Actor, CreatePaper, DocumentUpload, ModerationComment, Paper, PaperAction,
        PaperFilter, PaperStatus, Role, Signature, TransitionPayload,
    },
    paper::transitions::{action_requires_owner, find_rule, role_may_perform},
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

/// Paper lifecycle manager
#[derive(Clone)]
pub struct PaperLifecycle {
    db: SqlitePool,
    documents: DocumentStore,
}

/// The fields read before validating a transition
struct PaperHead {
    lecturer_id: String,
    examiner_id: Option<String>,
    status: PaperStatus,
    version: i64,
    document_id: String,
    course_code: String,
}

impl PaperLifecycle {
    pub fn new(db: SqlitePool, documents: DocumentStore) -> Self {
        Self { db, documents }
    }

    /// Create a new paper in `draft` with its initial document.
    ///
    /// The blob is written before the row insert; if the insert fails
    /// the orphaned blob is acceptable garbage, never referenced.
    pub async fn create_paper(
        &self,
        actor: &Actor,
        req: CreatePaper,
        document: DocumentUpload,
    ) -> AppResult<Paper> {
        if actor.role != Role::Lecturer {
            return Err(AppError::Forbidden(
                "Only lecturers can create papers".to_string(),
            ));
        }

        let stored = self
            .documents
            .put(document.bytes, &document.content_type)
            .await?;

        let id = new_paper_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO papers
            (id, year, semester, course_code, course_name, paper_type, department,
             lecturer_id, status, document_id, document_mime, version, locked,
             created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'draft', ?, ?, 1, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(req.year.as_str())
        .bind(req.semester.as_str())
        .bind(&req.course_code)
        .bind(&req.course_name)
        .bind(req.paper_type.as_str())
        .bind(&req.department)
        .bind(&actor.user_id)
        .bind(&stored.id)
        .bind(&stored.content_type)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        info!(paper_id = %id, lecturer = %actor.user_id, "paper created");

        self.get_paper(&id).await
    }

    /// Apply a lifecycle transition.
    ///
    /// Precondition order: paper exists, actor role permitted for the
    /// action, current status permits the action, payload constraints
    /// hold. A failed transition mutates nothing.
    pub async fn apply_transition(
        &self,
        paper_id: &str,
        actor: &Actor,
        action: PaperAction,
        payload: TransitionPayload,
    ) -> AppResult<Paper> {
        let head = self.load_head(paper_id).await?;

        if !role_may_perform(actor.role, action) {
            return Err(AppError::Forbidden(format!(
                "Role {} may not {}",
                actor.role.as_str(),
                action.as_str()
            )));
        }

        // Ownership and examiner pinning precede the state check, so a
        // disallowed actor sees Forbidden whatever the paper's status
        if action_requires_owner(action)
            && actor.role == Role::Lecturer
            && actor.user_id != head.lecturer_id
        {
            return Err(AppError::Forbidden(
                "Only the owning lecturer may perform this action".to_string(),
            ));
        }

        // Once assigned, moderation stays with the same examiner for
        // the paper's lifetime
        if action.is_moderation() {
            if let Some(examiner) = &head.examiner_id {
                if examiner != &actor.user_id {
                    return Err(AppError::Forbidden(
                        "Paper is assigned to a different examiner".to_string(),
                    ));
                }
            }
        }

        let rule = find_rule(head.status, action).ok_or_else(|| AppError::InvalidTransition {
            action: action.as_str().to_string(),
            current: head.status.as_str().to_string(),
        })?;

        // Payload constraints
        let comment = payload.comment.as_deref().map(str::trim).filter(|c| !c.is_empty());
        if action == PaperAction::RequestRevision && comment.is_none() {
            return Err(AppError::Validation(
                "A comment is required when requesting a revision".to_string(),
            ));
        }

        if payload.document.is_some() {
            if !matches!(
                head.status,
                PaperStatus::Draft | PaperStatus::RevisionRequired
            ) {
                return Err(AppError::Validation(
                    "Document can only be replaced while in draft or revision".to_string(),
                ));
            }
            if actor.role != Role::Lecturer || actor.user_id != head.lecturer_id {
                return Err(AppError::Validation(
                    "Only the owning lecturer may replace the document".to_string(),
                ));
            }
        }

        // Resolve target status; moderate may forward straight to the HOD
        let target = if action == PaperAction::Moderate && payload.forward {
            PaperStatus::PendingApproval
        } else {
            rule.to
        };

        // Store the replacement blob before touching paper metadata; a
        // failed write below leaves only an unreferenced blob behind
        let (document_id, document_mime, new_version) = match payload.document {
            Some(doc) => {
                let stored = self.documents.put(doc.bytes, &doc.content_type).await?;
                (stored.id, Some(stored.content_type), head.version + 1)
            }
            None => (head.document_id.clone(), None, head.version),
        };

        let examiner_id = if action.is_moderation() && head.examiner_id.is_none() {
            Some(actor.user_id.clone())
        } else {
            head.examiner_id.clone()
        };

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        // Compare-and-swap on (status, version): if another transition
        // committed since we validated, this touches zero rows
        let result = sqlx::query(
            r#"
            UPDATE papers
            SET status = ?, version = ?, document_id = ?,
                document_mime = COALESCE(?, document_mime),
                examiner_id = ?, locked = ?, updated_at = ?
            WHERE id = ? AND status = ? AND version = ?
            "#,
        )
        .bind(target.as_str())
        .bind(new_version)
        .bind(&document_id)
        .bind(&document_mime)
        .bind(&examiner_id)
        .bind(target.is_terminal())
        .bind(now.to_rfc3339())
        .bind(paper_id)
        .bind(head.status.as_str())
        .bind(head.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            warn!(paper_id = %paper_id, action = action.as_str(), "concurrent transition detected");
            return Err(AppError::Conflict(
                "Paper was modified concurrently; refetch and retry".to_string(),
            ));
        }

        // Exactly one signature per successful transition
        sqlx::query(
            "INSERT INTO paper_signatures (paper_id, actor_id, actor_role, action, signed_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(paper_id)
        .bind(&actor.user_id)
        .bind(actor.role.as_str())
        .bind(action.description())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        if let Some(text) = comment {
            sqlx::query(
                "INSERT INTO moderation_comments (paper_id, author_id, text, created_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(paper_id)
            .bind(&actor.user_id)
            .bind(text)
            .bind(now.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        // Notification row for the counterparty, inside the same
        // transaction so a failed transition leaves no trace
        if let Some(recipient) = notification_recipient(actor, &head.lecturer_id, &examiner_id) {
            sqlx::query(
                "INSERT INTO notifications (id, user_id, title, message, is_read, created_at)
                 VALUES (?, ?, ?, ?, 0, ?)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&recipient)
            .bind(format!("Paper {}", head.course_code))
            .bind(action.description())
            .bind(now.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            paper_id = %paper_id,
            actor = %actor.user_id,
            action = action.as_str(),
            from = head.status.as_str(),
            to = target.as_str(),
            "transition applied"
        );

        self.get_paper(paper_id).await
    }

    /// Fetch one paper with its signatures and comments in append order
    pub async fn get_paper(&self, paper_id: &str) -> AppResult<Paper> {
        let row = sqlx::query(
            r#"
            SELECT id, year, semester, course_code, course_name, paper_type,
                   department, lecturer_id, examiner_id, status, document_id,
                   document_mime, version, locked, created_at, updated_at
            FROM papers WHERE id = ?
            "#,
        )
        .bind(paper_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Paper {} not found", paper_id)))?;

        let mut paper = parse_paper_row(row)?;

        let signature_rows = sqlx::query(
            "SELECT actor_id, actor_role, action, signed_at
             FROM paper_signatures WHERE paper_id = ? ORDER BY id ASC",
        )
        .bind(paper_id)
        .fetch_all(&self.db)
        .await?;

        for row in signature_rows {
            let role_str: String = row.get("actor_role");
            paper.signatures.push(Signature {
                actor_id: row.get("actor_id"),
                actor_role: Role::parse(&role_str)?,
                action: row.get("action"),
                signed_at: parse_timestamp(&row.get::<String, _>("signed_at"))?,
            });
        }

        let comment_rows = sqlx::query(
            "SELECT author_id, text, created_at
             FROM moderation_comments WHERE paper_id = ? ORDER BY id ASC",
        )
        .bind(paper_id)
        .fetch_all(&self.db)
        .await?;

        for row in comment_rows {
            paper.moderation_comments.push(ModerationComment {
                author_id: row.get("author_id"),
                text: row.get("text"),
                created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
            });
        }

        Ok(paper)
    }

    /// List papers matching the filter, newest first. Child records are
    /// not hydrated for list views.
    pub async fn list_papers(&self, filter: &PaperFilter) -> AppResult<Vec<Paper>> {
        let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "SELECT id, year, semester, course_code, course_name, paper_type,
                    department, lecturer_id, examiner_id, status, document_id,
                    document_mime, version, locked, created_at, updated_at
             FROM papers WHERE 1=1",
        );

        if let Some(lecturer_id) = &filter.lecturer_id {
            qb.push(" AND lecturer_id = ").push_bind(lecturer_id.clone());
        }
        if let Some(department) = &filter.department {
            qb.push(" AND department = ").push_bind(department.clone());
        }
        if let Some(status) = &filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(year) = &filter.year {
            qb.push(" AND year = ").push_bind(year.as_str());
        }
        if let Some(semester) = &filter.semester {
            qb.push(" AND semester = ").push_bind(semester.as_str());
        }
        if let Some(paper_type) = &filter.paper_type {
            qb.push(" AND paper_type = ").push_bind(paper_type.as_str());
        }

        qb.push(" ORDER BY created_at DESC");

        let rows = qb.build().fetch_all(&self.db).await?;
        rows.into_iter().map(parse_paper_row).collect()
    }

    /// Fetch the current document bytes and content type for a paper
    pub async fn get_document(&self, paper_id: &str) -> AppResult<(Vec<u8>, String)> {
        let head = self.load_head(paper_id).await?;
        let mime = sqlx::query("SELECT document_mime FROM papers WHERE id = ?")
            .bind(paper_id)
            .fetch_one(&self.db)
            .await?
            .get::<String, _>("document_mime");

        let bytes = self
            .documents
            .get(&head.document_id)
            .await?
            .ok_or_else(|| AppError::Storage(format!("Document {} missing", head.document_id)))?;

        Ok((bytes, mime))
    }

    /// Delete a paper. Permitted only to the owning lecturer while the
    /// status is draft or revision_required; cascades to child records
    /// and requests blob deletion.
    pub async fn delete_paper(&self, paper_id: &str, actor: &Actor) -> AppResult<()> {
        let head = self.load_head(paper_id).await?;

        if actor.role != Role::Lecturer || actor.user_id != head.lecturer_id {
            return Err(AppError::Forbidden(
                "Only the owning lecturer may delete a paper".to_string(),
            ));
        }

        if !head.status.is_deletable() {
            return Err(AppError::InvalidTransition {
                action: "delete".to_string(),
                current: head.status.as_str().to_string(),
            });
        }

        // The status predicate closes the race against a concurrent
        // transition that advances the paper past the deletable states
        let result = sqlx::query(
            "DELETE FROM papers WHERE id = ? AND status IN ('draft', 'revision_required')",
        )
        .bind(paper_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            warn!(paper_id = %paper_id, "concurrent transition preempted deletion");
            return Err(AppError::Conflict(
                "Paper was modified concurrently; refetch and retry".to_string(),
            ));
        }

        // Blob deletion is best-effort; a leftover blob is unreferenced
        // garbage
        if let Err(e) = self.documents.delete(&head.document_id).await {
            warn!(paper_id = %paper_id, error = %e, "failed to delete document blob");
        }

        info!(paper_id = %paper_id, lecturer = %actor.user_id, "paper deleted");

        Ok(())
    }

    async fn load_head(&self, paper_id: &str) -> AppResult<PaperHead> {
        let row = sqlx::query(
            "SELECT lecturer_id, examiner_id, status, version, document_id, course_code
             FROM papers WHERE id = ?",
        )
        .bind(paper_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Paper {} not found", paper_id)))?;

        let status_str: String = row.get("status");

        Ok(PaperHead {
            lecturer_id: row.get("lecturer_id"),
            examiner_id: row.get("examiner_id"),
            status: PaperStatus::parse(&status_str)?,
            version: row.get("version"),
            document_id: row.get("document_id"),
            course_code: row.get("course_code"),
        })
    }
}

/// Pick who gets the in-app notification for a transition: the owning
/// lecturer for examiner/HOD actions, the assigned examiner when the
/// lecturer acts.
fn notification_recipient(
    actor: &Actor,
    lecturer_id: &str,
    examiner_id: &Option<String>,
) -> Option<String> {
    if actor.user_id != lecturer_id {
        return Some(lecturer_id.to_string());
    }
    examiner_id
        .as_ref()
        .filter(|e| e.as_str() != actor.user_id)
        .cloned()
}

fn parse_timestamp(s: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Internal(format!("Invalid timestamp: {}", e)))
}

fn parse_paper_row(row: sqlx::sqlite::SqliteRow) -> AppResult<Paper> {
    use crate::paper::models::{AcademicYear, PaperType, Semester};

    let year_str: String = row.get("year");
    let semester_str: String = row.get("semester");
    let paper_type_str: String = row.get("paper_type");
    let status_str: String = row.get("status");

    Ok(Paper {
        id: row.get("id"),
        year: AcademicYear::parse(&year_str)?,
        semester: Semester::parse(&semester_str)?,
        course_code: row.get("course_code"),
        course_name: row.get("course_name"),
        paper_type: PaperType::parse(&paper_type_str)?,
        department: row.get("department"),
        lecturer_id: row.get("lecturer_id"),
        examiner_id: row.get("examiner_id"),
        status: PaperStatus::parse(&status_str)?,
        document_id: row.get("document_id"),
        document_mime: row.get("document_mime"),
        version: row.get("version"),
        locked: row.get("locked"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
        signatures: Vec::new(),
        moderation_comments: Vec::new(),
    })
}
