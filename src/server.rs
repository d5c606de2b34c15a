/// Router assembly and listener
use crate::{
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    response::Json,
    Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Assemble the full application: API routes under shared state, then
/// tracing, compression, CORS, and the body-size cap, outermost first.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Headroom above the document cap for multipart framing
    let body_limit = ctx.config.service.upload_limit + 64 * 1024;

    Router::new()
        .merge(crate::api::routes())
        .with_state(ctx)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .fallback(unknown_route)
}

async fn unknown_route() -> (StatusCode, Json<serde_json::Value>) {
    let body = json!({
        "error": "NotFound",
        "message": "No such endpoint"
    });
    (StatusCode::NOT_FOUND, Json(body))
}

/// Bind the configured address and serve until shutdown
pub async fn serve(ctx: AppContext) -> AppResult<()> {
    let addr = format!(
        "{}:{}",
        ctx.config.service.hostname, ctx.config.service.port
    );
    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Examflow listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
