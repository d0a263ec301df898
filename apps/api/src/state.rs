use std::sync::Arc;

use crate::operations::{Catalog, Executor};
use crate::persistence::PersistenceGateway;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Immutable after startup.
    pub catalog: Arc<Catalog>,
    pub executor: Executor,
    pub gateway: PersistenceGateway,
}
