/// Authentication endpoints: register, login, current user
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
    identity::{LoginRequest, RegisterRequest},
    paper::models::Role,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/users", get(list_users))
}

/// Register a new user and return a bearer token
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let response = ctx.users.register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in with email and password
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let response = ctx.users.login(req).await?;
    Ok(Json(response))
}

/// Return the authenticated user
async fn me(State(ctx): State<AppContext>, auth: AuthContext) -> AppResult<impl IntoResponse> {
    let user = ctx.users.get_user(&auth.identity.user_id).await?;
    Ok(Json(json!({ "user": user })))
}

/// List all users. HOD only.
async fn list_users(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<impl IntoResponse> {
    auth.require_role(Role::Hod)?;
    let users = ctx.users.list_users().await?;
    Ok(Json(json!({ "users": users })))
}
