/// Examflow - Examination Paper Approval Workflow Server
///
/// Library surface so integration tests can exercise the lifecycle
/// manager directly.
pub mod api;
pub mod auth;
pub mod blob_store;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod identity;
pub mod notification;
pub mod paper;
pub mod server;
pub mod suggestion;
