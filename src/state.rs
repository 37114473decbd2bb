use std::sync::Arc;

use crate::broadcaster::TriggerSender;
use crate::registry::ClientRegistry;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ClientRegistry>,
    pub triggers: TriggerSender,
}

impl AppState {
    pub fn new(registry: Arc<ClientRegistry>, triggers: TriggerSender) -> Self {
        Self { registry, triggers }
    }
}
