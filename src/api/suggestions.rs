/// Suggestion endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
    paper::models::Role,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    // The per-paper listing lives under /paper/ so the :id segment
    // always names a suggestion
    Router::new()
        .route("/api/suggestions", post(create_suggestion))
        .route("/api/suggestions/unread/count", get(unread_count))
        .route("/api/suggestions/paper/:paper_id", get(list_for_paper))
        .route("/api/suggestions/:id/reply", put(reply))
        .route("/api/suggestions/:id", delete(delete_suggestion))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSuggestionRequest {
    paper_id: String,
    text: String,
}

/// Examiner attaches a suggestion to a paper
async fn create_suggestion(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<CreateSuggestionRequest>,
) -> AppResult<impl IntoResponse> {
    auth.require_role(Role::Examiner)?;

    let suggestion = ctx
        .suggestions
        .create(&req.paper_id, &auth.identity.user_id, &req.text)
        .await?;

    Ok((StatusCode::CREATED, Json(suggestion)))
}

/// List suggestions for a paper, newest first
async fn list_for_paper(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(paper_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let suggestions = ctx.suggestions.list_for_paper(&paper_id).await?;
    Ok(Json(suggestions))
}

#[derive(Debug, Deserialize)]
struct ReplyRequest {
    reply: String,
}

/// Lecturer replies to a suggestion
async fn reply(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<ReplyRequest>,
) -> AppResult<impl IntoResponse> {
    auth.require_role(Role::Lecturer)?;

    let suggestion = ctx.suggestions.reply(&id, &req.reply).await?;
    Ok(Json(suggestion))
}

/// Delete a suggestion
async fn delete_suggestion(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    auth.require_role(Role::Examiner)?;

    ctx.suggestions.delete(&id).await?;
    Ok(Json(json!({ "message": "Suggestion deleted" })))
}

/// Count unread suggestions
async fn unread_count(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
) -> AppResult<impl IntoResponse> {
    let count = ctx.suggestions.unread_count().await?;
    Ok(Json(json!({ "unreadCount": count })))
}
