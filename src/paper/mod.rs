/// Paper lifecycle management
///
/// The paper entity, the closed transition table, and the lifecycle
/// manager that validates and persists every status change.
pub mod lifecycle;
pub mod models;
pub mod transitions;

pub use lifecycle::PaperLifecycle;
pub use models::*;
