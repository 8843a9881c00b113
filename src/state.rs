//! Shared state injected into every handler.

use crate::app::App;
use crate::config::Config;
use std::sync::Arc;

/// Read-only for the life of the process; nothing here tracks tasks.
pub struct AppState {
    pub config: Arc<Config>,
    pub app: App,
}
