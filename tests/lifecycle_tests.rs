/// End-to-end lifecycle scenarios over a real database
///
/// Exercises the paper state machine the way the API would: seeded
/// users, an in-memory document backend, and a file-backed SQLite
/// database so concurrent transitions contend on the same rows.
use std::sync::Arc;

use examflow::blob_store::{DocumentStore, MemoryDocumentBackend};
use examflow::db;
use examflow::error::AppError;
use examflow::paper::models::{
    AcademicYear, Actor, CreatePaper, DocumentUpload, Paper, PaperAction, PaperFilter,
    PaperStatus, PaperType, Role, Semester, TransitionPayload,
};
use examflow::paper::PaperLifecycle;
use chrono::Utc;
use sqlx::SqlitePool;
use tempfile::TempDir;

struct Harness {
    lifecycle: PaperLifecycle,
    backend: MemoryDocumentBackend,
    db: SqlitePool,
    // Held so the database file outlives the pool
    _dir: TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let pool = db::create_pool(&dir.path().join("test.sqlite"), db::DatabaseOptions::default())
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();

    for (id, email, role) in [
        ("lec1", "lec1@example.edu", "lecturer"),
        ("lec2", "lec2@example.edu", "lecturer"),
        ("ex1", "ex1@example.edu", "examiner"),
        ("ex2", "ex2@example.edu", "examiner"),
        ("hod1", "hod1@example.edu", "hod"),
    ] {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, department, created_at)
             VALUES (?, ?, 'x', ?, ?, 'Computer Science', ?)",
        )
        .bind(id)
        .bind(email)
        .bind(id)
        .bind(role)
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();
    }

    let backend = MemoryDocumentBackend::new();
    let store = DocumentStore::new(Arc::new(backend.clone()), 10 * 1024 * 1024);
    let lifecycle = PaperLifecycle::new(pool.clone(), store);

    Harness {
        lifecycle,
        backend,
        db: pool,
        _dir: dir,
    }
}

fn lecturer() -> Actor {
    Actor::new("lec1", Role::Lecturer, "Computer Science")
}

fn other_lecturer() -> Actor {
    Actor::new("lec2", Role::Lecturer, "Computer Science")
}

fn examiner() -> Actor {
    Actor::new("ex1", Role::Examiner, "Computer Science")
}

fn other_examiner() -> Actor {
    Actor::new("ex2", Role::Examiner, "Computer Science")
}

fn hod() -> Actor {
    Actor::new("hod1", Role::Hod, "Computer Science")
}

fn pdf(bytes: &[u8]) -> DocumentUpload {
    DocumentUpload {
        bytes: bytes.to_vec(),
        content_type: "application/pdf".to_string(),
    }
}

fn comment(text: &str) -> TransitionPayload {
    TransitionPayload {
        comment: Some(text.to_string()),
        ..Default::default()
    }
}

async fn new_paper(h: &Harness) -> Paper {
    h.lifecycle
        .create_paper(
            &lecturer(),
            CreatePaper {
                year: AcademicYear::Second,
                semester: Semester::First,
                course_code: "CS201".to_string(),
                course_name: "Data Structures".to_string(),
                paper_type: PaperType::Exam,
                department: "Computer Science".to_string(),
            },
            pdf(b"%PDF-1.4 draft"),
        )
        .await
        .unwrap()
}

/// Walk a paper from draft up to pending_approval
async fn to_pending_approval(h: &Harness) -> Paper {
    let paper = new_paper(h).await;
    h.lifecycle
        .apply_transition(&paper.id, &lecturer(), PaperAction::Submit, Default::default())
        .await
        .unwrap();
    h.lifecycle
        .apply_transition(&paper.id, &examiner(), PaperAction::Moderate, Default::default())
        .await
        .unwrap();
    h.lifecycle
        .apply_transition(
            &paper.id,
            &examiner(),
            PaperAction::ForwardToHod,
            Default::default(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn scenario_a_submit_revise_resubmit() {
    let h = harness().await;

    let paper = new_paper(&h).await;
    assert_eq!(paper.status, PaperStatus::Draft);
    assert_eq!(paper.version, 1);
    assert!(paper.signatures.is_empty());

    let paper = h
        .lifecycle
        .apply_transition(&paper.id, &lecturer(), PaperAction::Submit, Default::default())
        .await
        .unwrap();
    assert_eq!(paper.status, PaperStatus::PendingModeration);
    assert_eq!(paper.signatures.len(), 1);

    let paper = h
        .lifecycle
        .apply_transition(
            &paper.id,
            &examiner(),
            PaperAction::RequestRevision,
            comment("fix typo"),
        )
        .await
        .unwrap();
    assert_eq!(paper.status, PaperStatus::RevisionRequired);
    assert_eq!(paper.moderation_comments.len(), 1);
    assert_eq!(paper.moderation_comments[0].text, "fix typo");
    assert_eq!(paper.signatures.len(), 2);
    assert_eq!(paper.examiner_id.as_deref(), Some("ex1"));

    // Resubmit with a replacement document: version increments
    let paper = h
        .lifecycle
        .apply_transition(
            &paper.id,
            &lecturer(),
            PaperAction::Submit,
            TransitionPayload {
                document: Some(pdf(b"%PDF-1.4 revised")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(paper.status, PaperStatus::PendingModeration);
    assert_eq!(paper.version, 2);
    assert_eq!(paper.signatures.len(), 3);
}

#[tokio::test]
async fn scenario_b_happy_path_to_printed() {
    let h = harness().await;

    let paper = new_paper(&h).await;
    let id = paper.id.clone();

    h.lifecycle
        .apply_transition(&id, &lecturer(), PaperAction::Submit, Default::default())
        .await
        .unwrap();

    let paper = h
        .lifecycle
        .apply_transition(&id, &examiner(), PaperAction::Moderate, Default::default())
        .await
        .unwrap();
    assert_eq!(paper.status, PaperStatus::Moderated);

    let paper = h
        .lifecycle
        .apply_transition(&id, &examiner(), PaperAction::ForwardToHod, Default::default())
        .await
        .unwrap();
    assert_eq!(paper.status, PaperStatus::PendingApproval);

    let paper = h
        .lifecycle
        .apply_transition(&id, &hod(), PaperAction::Approve, Default::default())
        .await
        .unwrap();
    assert_eq!(paper.status, PaperStatus::Approved);

    let paper = h
        .lifecycle
        .apply_transition(&id, &hod(), PaperAction::SendToPrint, Default::default())
        .await
        .unwrap();
    assert_eq!(paper.status, PaperStatus::Printed);
    assert!(paper.locked);
    assert_eq!(paper.signatures.len(), 5);

    // Terminal state absorbs everything
    let err = h
        .lifecycle
        .apply_transition(&id, &hod(), PaperAction::Approve, Default::default())
        .await
        .unwrap_err();
    match err {
        AppError::InvalidTransition { current, .. } => assert_eq!(current, "printed"),
        other => panic!("expected InvalidTransition, got {:?}", other),
    }
}

#[tokio::test]
async fn scenario_c_concurrent_approval_applies_once() {
    let h = harness().await;
    let paper = to_pending_approval(&h).await;
    let before = paper.signatures.len();

    // The actor must outlive both unawaited futures
    let approver = hod();
    let a = h.lifecycle.apply_transition(
        &paper.id,
        &approver,
        PaperAction::Approve,
        Default::default(),
    );
    let b = h.lifecycle.apply_transition(
        &paper.id,
        &approver,
        PaperAction::Approve,
        Default::default(),
    );

    let (ra, rb) = tokio::join!(a, b);
    let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one concurrent approval may win");

    // The loser saw either the CAS failure or the already-advanced state
    let loser = if ra.is_err() { ra } else { rb };
    assert!(matches!(
        loser.unwrap_err(),
        AppError::Conflict(_) | AppError::InvalidTransition { .. }
    ));

    // Approved exactly once, signed exactly once
    let paper = h.lifecycle.get_paper(&paper.id).await.unwrap();
    assert_eq!(paper.status, PaperStatus::Approved);
    assert_eq!(paper.signatures.len(), before + 1);
}

#[tokio::test]
async fn scenario_d_delete_rejected_after_moderation() {
    let h = harness().await;
    let paper = to_pending_approval(&h).await;

    let err = h
        .lifecycle
        .delete_paper(&paper.id, &lecturer())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    // Paper and document remain intact
    let paper = h.lifecycle.get_paper(&paper.id).await.unwrap();
    assert_eq!(paper.status, PaperStatus::PendingApproval);
    let (bytes, mime) = h.lifecycle.get_document(&paper.id).await.unwrap();
    assert_eq!(mime, "application/pdf");
    assert!(!bytes.is_empty());
}

#[tokio::test]
async fn invalid_action_never_mutates() {
    let h = harness().await;
    let paper = new_paper(&h).await;

    // draft -> approve is not in the table
    let err = h
        .lifecycle
        .apply_transition(&paper.id, &hod(), PaperAction::Approve, Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    let after = h.lifecycle.get_paper(&paper.id).await.unwrap();
    assert_eq!(after.status, PaperStatus::Draft);
    assert_eq!(after.version, 1);
    assert!(after.signatures.is_empty());
}

#[tokio::test]
async fn role_checked_before_state() {
    let h = harness().await;
    let paper = new_paper(&h).await;

    // An examiner may never submit, regardless of state
    let err = h
        .lifecycle
        .apply_transition(&paper.id, &examiner(), PaperAction::Submit, Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn submit_is_owner_only() {
    let h = harness().await;
    let paper = new_paper(&h).await;

    let err = h
        .lifecycle
        .apply_transition(
            &paper.id,
            &other_lecturer(),
            PaperAction::Submit,
            Default::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn examiner_is_pinned_after_first_moderation() {
    let h = harness().await;
    let paper = new_paper(&h).await;

    h.lifecycle
        .apply_transition(&paper.id, &lecturer(), PaperAction::Submit, Default::default())
        .await
        .unwrap();
    h.lifecycle
        .apply_transition(
            &paper.id,
            &examiner(),
            PaperAction::RequestRevision,
            comment("needs marking scheme"),
        )
        .await
        .unwrap();
    h.lifecycle
        .apply_transition(&paper.id, &lecturer(), PaperAction::Submit, Default::default())
        .await
        .unwrap();

    let err = h
        .lifecycle
        .apply_transition(
            &paper.id,
            &other_examiner(),
            PaperAction::Moderate,
            Default::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // The assigned examiner may proceed
    let paper = h
        .lifecycle
        .apply_transition(&paper.id, &examiner(), PaperAction::Moderate, Default::default())
        .await
        .unwrap();
    assert_eq!(paper.status, PaperStatus::Moderated);
    assert_eq!(paper.examiner_id.as_deref(), Some("ex1"));
}

#[tokio::test]
async fn revision_requires_comment() {
    let h = harness().await;
    let paper = new_paper(&h).await;

    h.lifecycle
        .apply_transition(&paper.id, &lecturer(), PaperAction::Submit, Default::default())
        .await
        .unwrap();

    let err = h
        .lifecycle
        .apply_transition(
            &paper.id,
            &examiner(),
            PaperAction::RequestRevision,
            comment("   "),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let after = h.lifecycle.get_paper(&paper.id).await.unwrap();
    assert_eq!(after.status, PaperStatus::PendingModeration);
    assert_eq!(after.signatures.len(), 1);
    assert!(after.moderation_comments.is_empty());
}

#[tokio::test]
async fn moderate_with_forward_skips_to_pending_approval() {
    let h = harness().await;
    let paper = new_paper(&h).await;

    h.lifecycle
        .apply_transition(&paper.id, &lecturer(), PaperAction::Submit, Default::default())
        .await
        .unwrap();

    let paper = h
        .lifecycle
        .apply_transition(
            &paper.id,
            &examiner(),
            PaperAction::Moderate,
            TransitionPayload {
                forward: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(paper.status, PaperStatus::PendingApproval);
    // Still exactly one signature for the combined step
    assert_eq!(paper.signatures.len(), 2);
}

#[tokio::test]
async fn document_replacement_rejected_outside_draft() {
    let h = harness().await;
    let paper = to_pending_approval(&h).await;

    // HOD approval cannot smuggle in a new document
    let err = h
        .lifecycle
        .apply_transition(
            &paper.id,
            &hod(),
            PaperAction::Approve,
            TransitionPayload {
                document: Some(pdf(b"%PDF-1.4 sneaky")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn delete_draft_removes_paper_and_blob() {
    let h = harness().await;
    let paper = new_paper(&h).await;
    assert_eq!(h.backend.len().await, 1);

    h.lifecycle.delete_paper(&paper.id, &lecturer()).await.unwrap();

    assert!(matches!(
        h.lifecycle.get_paper(&paper.id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert_eq!(h.backend.len().await, 0);

    // Child rows are gone as well
    let row = sqlx::query("SELECT COUNT(*) AS n FROM paper_signatures")
        .fetch_one(&h.db)
        .await
        .unwrap();
    let n: i64 = sqlx::Row::get(&row, "n");
    assert_eq!(n, 0);
}

#[tokio::test]
async fn delete_is_owner_only() {
    let h = harness().await;
    let paper = new_paper(&h).await;

    assert!(matches!(
        h.lifecycle
            .delete_paper(&paper.id, &other_lecturer())
            .await
            .unwrap_err(),
        AppError::Forbidden(_)
    ));
    assert!(matches!(
        h.lifecycle.delete_paper(&paper.id, &examiner()).await.unwrap_err(),
        AppError::Forbidden(_)
    ));
}

#[tokio::test]
async fn concurrent_delete_and_submit_cannot_both_win() {
    let h = harness().await;
    let paper = new_paper(&h).await;
    let owner = lecturer();

    let deletion = h.lifecycle.delete_paper(&paper.id, &owner);
    let submission = h.lifecycle.apply_transition(
        &paper.id,
        &owner,
        PaperAction::Submit,
        Default::default(),
    );
    let (deleted, submitted) = tokio::join!(deletion, submission);

    match (deleted.is_ok(), submitted.is_ok()) {
        (true, false) => {
            assert!(matches!(
                h.lifecycle.get_paper(&paper.id).await.unwrap_err(),
                AppError::NotFound(_)
            ));
        }
        (false, true) => {
            let after = h.lifecycle.get_paper(&paper.id).await.unwrap();
            assert_eq!(after.status, PaperStatus::PendingModeration);
            assert_eq!(after.signatures.len(), 1);
        }
        (true, true) => panic!("delete and submit may not both succeed"),
        (false, false) => panic!("one of delete and submit must succeed"),
    }
}

#[tokio::test]
async fn ownership_and_pinning_checked_before_state() {
    let h = harness().await;
    let paper = to_pending_approval(&h).await;

    // A non-owner lecturer is refused before the status is consulted
    let err = h
        .lifecycle
        .apply_transition(
            &paper.id,
            &other_lecturer(),
            PaperAction::Submit,
            Default::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Same for a moderation attempt by a different examiner
    let err = h
        .lifecycle
        .apply_transition(
            &paper.id,
            &other_examiner(),
            PaperAction::Moderate,
            Default::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn rejected_is_terminal() {
    let h = harness().await;
    let paper = to_pending_approval(&h).await;

    let paper = h
        .lifecycle
        .apply_transition(
            &paper.id,
            &hod(),
            PaperAction::Reject,
            comment("does not match syllabus"),
        )
        .await
        .unwrap();
    assert_eq!(paper.status, PaperStatus::Rejected);
    assert!(paper.locked);

    let err = h
        .lifecycle
        .apply_transition(&paper.id, &lecturer(), PaperAction::Submit, Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

#[tokio::test]
async fn missing_paper_is_not_found() {
    let h = harness().await;

    let err = h
        .lifecycle
        .apply_transition("no-such-id", &hod(), PaperAction::Approve, Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn list_papers_filters() {
    let h = harness().await;

    let p1 = new_paper(&h).await;
    let _p2 = new_paper(&h).await;
    h.lifecycle
        .apply_transition(&p1.id, &lecturer(), PaperAction::Submit, Default::default())
        .await
        .unwrap();

    let drafts = h
        .lifecycle
        .list_papers(&PaperFilter {
            status: Some(PaperStatus::Draft),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(drafts.len(), 1);

    let mine = h
        .lifecycle
        .list_papers(&PaperFilter {
            lecturer_id: Some("lec1".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);

    let none = h
        .lifecycle
        .list_papers(&PaperFilter {
            department: Some("Physics".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn transitions_write_notifications_for_counterparty() {
    let h = harness().await;
    let paper = new_paper(&h).await;

    h.lifecycle
        .apply_transition(&paper.id, &lecturer(), PaperAction::Submit, Default::default())
        .await
        .unwrap();
    h.lifecycle
        .apply_transition(
            &paper.id,
            &examiner(),
            PaperAction::RequestRevision,
            comment("fix question 2"),
        )
        .await
        .unwrap();

    // The examiner's action notified the owning lecturer
    let row = sqlx::query("SELECT COUNT(*) AS n FROM notifications WHERE user_id = 'lec1'")
        .fetch_one(&h.db)
        .await
        .unwrap();
    let n: i64 = sqlx::Row::get(&row, "n");
    assert_eq!(n, 1);
}
