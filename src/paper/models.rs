/// Paper entity and the closed enums that gate its lifecycle
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User roles in the approval workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Authors and submits papers
    Lecturer,
    /// Moderates submitted papers
    Examiner,
    /// Head of department: final approval and printing
    Hod,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Lecturer => "lecturer",
            Role::Examiner => "examiner",
            Role::Hod => "hod",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "lecturer" => Ok(Role::Lecturer),
            "examiner" => Ok(Role::Examiner),
            "hod" => Ok(Role::Hod),
            _ => Err(AppError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

/// Paper lifecycle status
///
/// Closed set: nothing outside these eight values is ever persisted.
/// `Printed` and `Rejected` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    Draft,
    PendingModeration,
    RevisionRequired,
    Moderated,
    PendingApproval,
    Approved,
    Rejected,
    Printed,
}

impl PaperStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperStatus::Draft => "draft",
            PaperStatus::PendingModeration => "pending_moderation",
            PaperStatus::RevisionRequired => "revision_required",
            PaperStatus::Moderated => "moderated",
            PaperStatus::PendingApproval => "pending_approval",
            PaperStatus::Approved => "approved",
            PaperStatus::Rejected => "rejected",
            PaperStatus::Printed => "printed",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "draft" => Ok(PaperStatus::Draft),
            "pending_moderation" => Ok(PaperStatus::PendingModeration),
            "revision_required" => Ok(PaperStatus::RevisionRequired),
            "moderated" => Ok(PaperStatus::Moderated),
            "pending_approval" => Ok(PaperStatus::PendingApproval),
            "approved" => Ok(PaperStatus::Approved),
            "rejected" => Ok(PaperStatus::Rejected),
            "printed" => Ok(PaperStatus::Printed),
            _ => Err(AppError::Internal(format!("Invalid paper status: {}", s))),
        }
    }

    /// No transition is defined out of a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaperStatus::Printed | PaperStatus::Rejected)
    }

    /// Deletion is only permitted before moderation has signed off
    pub fn is_deletable(&self) -> bool {
        matches!(self, PaperStatus::Draft | PaperStatus::RevisionRequired)
    }
}

/// Lifecycle transition verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperAction {
    Submit,
    RequestRevision,
    Moderate,
    ForwardToHod,
    Approve,
    Reject,
    SendToPrint,
}

impl PaperAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperAction::Submit => "submit",
            PaperAction::RequestRevision => "request_revision",
            PaperAction::Moderate => "moderate",
            PaperAction::ForwardToHod => "forward_to_hod",
            PaperAction::Approve => "approve",
            PaperAction::Reject => "reject",
            PaperAction::SendToPrint => "send_to_print",
        }
    }

    /// Human-readable description recorded in the signature trail
    pub fn description(&self) -> &'static str {
        match self {
            PaperAction::Submit => "Submitted for moderation",
            PaperAction::RequestRevision => "Revision requested by examiner",
            PaperAction::Moderate => "Moderated by examiner",
            PaperAction::ForwardToHod => "Forwarded to HOD for approval",
            PaperAction::Approve => "Approved by HOD",
            PaperAction::Reject => "Rejected by HOD",
            PaperAction::SendToPrint => "Sent to print",
        }
    }

    /// Actions that assign (or must match) the paper's examiner
    pub fn is_moderation(&self) -> bool {
        matches!(self, PaperAction::RequestRevision | PaperAction::Moderate)
    }
}

/// Academic year of study
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcademicYear {
    First,
    Second,
    Third,
}

impl AcademicYear {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicYear::First => "first",
            AcademicYear::Second => "second",
            AcademicYear::Third => "third",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "first" | "1" => Ok(AcademicYear::First),
            "second" | "2" => Ok(AcademicYear::Second),
            "third" | "3" => Ok(AcademicYear::Third),
            _ => Err(AppError::Validation(format!("Invalid year: {}", s))),
        }
    }
}

/// Semester within the academic year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::First => "first",
            Semester::Second => "second",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "first" | "1" => Ok(Semester::First),
            "second" | "2" => Ok(Semester::Second),
            _ => Err(AppError::Validation(format!("Invalid semester: {}", s))),
        }
    }
}

/// Kind of assessment document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperType {
    Exam,
    Assessment,
}

impl PaperType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperType::Exam => "exam",
            PaperType::Assessment => "assessment",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "exam" => Ok(PaperType::Exam),
            "assessment" => Ok(PaperType::Assessment),
            _ => Err(AppError::Validation(format!("Invalid paper type: {}", s))),
        }
    }
}

/// Append-only audit entry recording who performed a lifecycle action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub actor_id: String,
    pub actor_role: Role,
    pub action: String,
    pub signed_at: DateTime<Utc>,
}

/// Free-text review feedback attached during moderation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationComment {
    pub author_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// The central paper entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub id: String,
    pub year: AcademicYear,
    pub semester: Semester,
    pub course_code: String,
    pub course_name: String,
    pub paper_type: PaperType,
    pub department: String,
    pub lecturer_id: String,
    pub examiner_id: Option<String>,
    pub status: PaperStatus,
    pub document_id: String,
    pub document_mime: String,
    pub version: i64,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub signatures: Vec<Signature>,
    pub moderation_comments: Vec<ModerationComment>,
}

/// Request to create a new paper (document bytes travel separately)
#[derive(Debug, Clone)]
pub struct CreatePaper {
    pub year: AcademicYear,
    pub semester: Semester,
    pub course_code: String,
    pub course_name: String,
    pub paper_type: PaperType,
    pub department: String,
}

/// Optional data carried alongside a transition request
#[derive(Debug, Clone, Default)]
pub struct TransitionPayload {
    /// Comment text; required non-empty for `request_revision`
    pub comment: Option<String>,
    /// Replacement document, accepted only in draft/revision_required
    /// from the owning lecturer
    pub document: Option<DocumentUpload>,
    /// On `moderate`: skip the separate forward step and land the
    /// paper in pending_approval directly
    pub forward: bool,
}

/// Raw uploaded document prior to storage
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Filter for paper list queries; all fields optional, combined with AND
#[derive(Debug, Clone, Default)]
pub struct PaperFilter {
    pub lecturer_id: Option<String>,
    pub department: Option<String>,
    pub status: Option<PaperStatus>,
    pub year: Option<AcademicYear>,
    pub semester: Option<Semester>,
    pub paper_type: Option<PaperType>,
}

/// The resolved actor applying a transition
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    pub department: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role, department: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            department: department.into(),
        }
    }
}

/// Generate a fresh paper id
pub fn new_paper_id() -> String {
    Uuid::new_v4().to_string()
}
