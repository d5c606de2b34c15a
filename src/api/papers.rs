/// Paper endpoints: creation, lifecycle transitions, queries, deletion
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::{AppError, AppResult},
    paper::models::{
        AcademicYear, CreatePaper, DocumentUpload, PaperAction, PaperFilter, PaperStatus,
        PaperType, Semester, TransitionPayload,
    },
};
use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/papers", post(create_paper).get(list_papers))
        .route("/api/papers/:id", get(get_paper))
        .route("/api/papers/:id", delete(delete_paper))
        .route("/api/papers/:id/document", get(get_document))
        .route("/api/papers/:id/submit", post(submit))
        .route("/api/papers/:id/request-revision", post(request_revision))
        .route("/api/papers/:id/moderate", post(moderate))
        .route("/api/papers/:id/forward", post(forward))
        .route("/api/papers/:id/approve", post(approve))
        .route("/api/papers/:id/reject", post(reject))
        .route("/api/papers/:id/print", post(send_to_print))
}

/// Create a paper from a multipart form: metadata fields plus a `file`
/// part carrying the PDF or image
async fn create_paper(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut year = None;
    let mut semester = None;
    let mut course_code = None;
    let mut course_name = None;
    let mut paper_type = None;
    let mut document = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "year" => year = Some(AcademicYear::parse(&read_text(field).await?)?),
            "semester" => semester = Some(Semester::parse(&read_text(field).await?)?),
            "courseCode" => course_code = Some(read_text(field).await?),
            "courseName" => course_name = Some(read_text(field).await?),
            "paperType" => paper_type = Some(PaperType::parse(&read_text(field).await?)?),
            "file" => {
                let content_type = field
                    .content_type()
                    .map(|c| c.to_string())
                    .ok_or_else(|| {
                        AppError::Validation("File content type is required".to_string())
                    })?;
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read file: {}", e))
                })?;
                document = Some(DocumentUpload {
                    bytes: bytes.to_vec(),
                    content_type,
                });
            }
            _ => {}
        }
    }

    let req = CreatePaper {
        year: year.ok_or_else(|| AppError::Validation("year is required".to_string()))?,
        semester: semester
            .ok_or_else(|| AppError::Validation("semester is required".to_string()))?,
        course_code: course_code
            .ok_or_else(|| AppError::Validation("courseCode is required".to_string()))?,
        course_name: course_name
            .ok_or_else(|| AppError::Validation("courseName is required".to_string()))?,
        paper_type: paper_type
            .ok_or_else(|| AppError::Validation("paperType is required".to_string()))?,
        department: auth.identity.department.clone(),
    };
    let document =
        document.ok_or_else(|| AppError::Validation("File is required".to_string()))?;

    let paper = ctx
        .papers
        .create_paper(&auth.actor(), req, document)
        .await?;

    Ok((StatusCode::CREATED, Json(paper)))
}

/// Query parameters for listing papers
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    lecturer_id: Option<String>,
    department: Option<String>,
    status: Option<String>,
    year: Option<String>,
    semester: Option<String>,
    paper_type: Option<String>,
}

/// List papers, optionally filtered
async fn list_papers(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = PaperFilter {
        lecturer_id: query.lecturer_id,
        department: query.department,
        status: query
            .status
            .as_deref()
            .map(PaperStatus::parse)
            .transpose()
            .map_err(|_| AppError::Validation("Invalid status filter".to_string()))?,
        year: query.year.as_deref().map(AcademicYear::parse).transpose()?,
        semester: query.semester.as_deref().map(Semester::parse).transpose()?,
        paper_type: query
            .paper_type
            .as_deref()
            .map(PaperType::parse)
            .transpose()?,
    };

    let papers = ctx.papers.list_papers(&filter).await?;
    Ok(Json(papers))
}

/// Fetch one paper with its signatures and comments
async fn get_paper(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let paper = ctx.papers.get_paper(&id).await?;
    Ok(Json(paper))
}

/// Stream the paper's current document
async fn get_document(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let (bytes, mime) = ctx.papers.get_document(&id).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(header::CONTENT_LENGTH, bytes.len().to_string())
        .body(axum::body::Body::from(bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

/// Submit a draft (or revised) paper for moderation. A non-empty body
/// is treated as a replacement document, typed by the Content-Type
/// header.
async fn submit(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let document = if body.is_empty() {
        None
    } else {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| AppError::Validation("Content type is required".to_string()))?;
        Some(DocumentUpload {
            bytes: body.to_vec(),
            content_type,
        })
    };

    let payload = TransitionPayload {
        document,
        ..Default::default()
    };

    let paper = ctx
        .papers
        .apply_transition(&id, &auth.actor(), PaperAction::Submit, payload)
        .await?;
    Ok(Json(paper))
}

#[derive(Debug, Deserialize)]
struct RevisionRequest {
    comment: String,
}

/// Examiner sends the paper back for revision with a required comment
async fn request_revision(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<RevisionRequest>,
) -> AppResult<impl IntoResponse> {
    let payload = TransitionPayload {
        comment: Some(req.comment),
        ..Default::default()
    };

    let paper = ctx
        .papers
        .apply_transition(&id, &auth.actor(), PaperAction::RequestRevision, payload)
        .await?;
    Ok(Json(paper))
}

#[derive(Debug, Default, Deserialize)]
struct ModerateRequest {
    comment: Option<String>,
    #[serde(default)]
    forward: bool,
}

/// Examiner signs off on the paper; `forward: true` sends it straight
/// to the HOD queue
async fn moderate(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    req: Option<Json<ModerateRequest>>,
) -> AppResult<impl IntoResponse> {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    let payload = TransitionPayload {
        comment: req.comment,
        forward: req.forward,
        ..Default::default()
    };

    let paper = ctx
        .papers
        .apply_transition(&id, &auth.actor(), PaperAction::Moderate, payload)
        .await?;
    Ok(Json(paper))
}

/// Forward a moderated paper to the HOD
async fn forward(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let paper = ctx
        .papers
        .apply_transition(
            &id,
            &auth.actor(),
            PaperAction::ForwardToHod,
            TransitionPayload::default(),
        )
        .await?;
    Ok(Json(paper))
}

#[derive(Debug, Default, Deserialize)]
struct DecisionRequest {
    comment: Option<String>,
}

/// HOD approves the paper
async fn approve(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    req: Option<Json<DecisionRequest>>,
) -> AppResult<impl IntoResponse> {
    let payload = TransitionPayload {
        comment: req.map(|Json(r)| r.comment).unwrap_or_default(),
        ..Default::default()
    };

    let paper = ctx
        .papers
        .apply_transition(&id, &auth.actor(), PaperAction::Approve, payload)
        .await?;
    Ok(Json(paper))
}

/// HOD rejects the paper
async fn reject(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    req: Option<Json<DecisionRequest>>,
) -> AppResult<impl IntoResponse> {
    let payload = TransitionPayload {
        comment: req.map(|Json(r)| r.comment).unwrap_or_default(),
        ..Default::default()
    };

    let paper = ctx
        .papers
        .apply_transition(&id, &auth.actor(), PaperAction::Reject, payload)
        .await?;
    Ok(Json(paper))
}

/// HOD marks an approved paper as printed
async fn send_to_print(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let paper = ctx
        .papers
        .apply_transition(
            &id,
            &auth.actor(),
            PaperAction::SendToPrint,
            TransitionPayload::default(),
        )
        .await?;
    Ok(Json(paper))
}

/// Delete a paper that has not yet entered moderation sign-off
async fn delete_paper(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    ctx.papers.delete_paper(&id, &auth.actor()).await?;
    Ok(Json(json!({ "message": "Paper deleted" })))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid field value: {}", e)))
}
