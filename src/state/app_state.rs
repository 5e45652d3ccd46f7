use std::sync::Arc;

use crate::capture::config::AppConfig;
use crate::capture::ControllerHandle;

/// Global application state managed by Tauri
pub struct AppState {
    pub controller: ControllerHandle,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(controller: ControllerHandle, config: AppConfig) -> Self {
        Self {
            controller,
            config: Arc::new(config),
        }
    }
}
