//! Application state for the API server

use crate::{Config, Publisher};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The publishing service
    pub publisher: Arc<Publisher>,

    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(publisher: Arc<Publisher>, config: Arc<Config>) -> Self {
        Self { publisher, config }
    }
}
