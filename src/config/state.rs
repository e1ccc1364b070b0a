// Application state module
// Shared by every connection: immutable config plus the dispatcher

use super::types::Config;
use crate::dispatcher::Dispatcher;
use crate::handler::HandlerRegistry;

/// Application state
pub struct AppState {
    pub config: Config,
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Build state with the configured connector and template renderer
    pub fn new(config: &Config, registry: HandlerRegistry) -> Self {
        Self {
            config: config.clone(),
            dispatcher: Dispatcher::new(config, registry),
        }
    }
}
