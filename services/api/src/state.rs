//! Shared Application State
//!
//! Holds the resources every WebSocket session borrows: the content client and
//! the loaded configuration. Session state itself is never shared.

use crate::config::Config;
use kids_learning_core::content::ContentClient;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub content_client: Arc<dyn ContentClient>,
    pub config: Arc<Config>,
}
