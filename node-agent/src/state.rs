//! Shared application state.

use std::sync::Arc;

use crate::runtime::LocalRuntime;

/// Shared state passed to all handlers.
pub struct AppState {
    pub runtime: Arc<LocalRuntime>,
}

impl AppState {
    pub fn new(runtime: Arc<LocalRuntime>) -> Self {
        Self { runtime }
    }
}
