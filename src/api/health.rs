/// Health check endpoint
use crate::context::AppContext;
use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/health", get(health_check))
}

/// Reports process liveness and database reachability
async fn health_check(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    let db_ok = crate::db::test_connection(&ctx.db).await.is_ok();

    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "database": db_ok,
        "version": env!("CARGO_PKG_VERSION")
    }))
}
