//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use roster_core::ports::DatabaseService;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Nothing request-specific lives here; the caller's identity travels in the
/// request's `RequestContext` extension.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
}
