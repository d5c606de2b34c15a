/// Notification endpoints
use crate::{auth::AuthContext, context::AppContext, error::AppResult};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread/count", get(unread_count))
        .route("/api/notifications/:id/read", post(mark_read))
        .route("/api/notifications/read-all", post(mark_all_read))
}

/// List the authenticated user's notifications
async fn list_notifications(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<impl IntoResponse> {
    let notifications = ctx
        .notifications
        .list_for_user(&auth.identity.user_id)
        .await?;
    Ok(Json(notifications))
}

/// Count unread notifications for the authenticated user
async fn unread_count(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<impl IntoResponse> {
    let count = ctx
        .notifications
        .unread_count(&auth.identity.user_id)
        .await?;
    Ok(Json(json!({ "unreadCount": count })))
}

/// Mark one notification as read
async fn mark_read(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    ctx.notifications
        .mark_read(&id, &auth.identity.user_id)
        .await?;
    Ok(Json(json!({ "message": "Notification marked read" })))
}

/// Mark all notifications as read
async fn mark_all_read(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<impl IntoResponse> {
    let updated = ctx
        .notifications
        .mark_all_read(&auth.identity.user_id)
        .await?;
    Ok(Json(json!({ "updated": updated })))
}
