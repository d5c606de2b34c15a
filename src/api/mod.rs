/// API routes and handlers
pub mod auth;
pub mod health;
pub mod middleware;
pub mod notifications;
pub mod papers;
pub mod suggestions;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(papers::routes())
        .merge(suggestions::routes())
        .merge(notifications::routes())
        .merge(health::routes())
}
