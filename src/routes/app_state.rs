use std::sync::Arc;

use ollama_rs::Ollama;

use crate::models::global_session_manager::GlobalSessionManager;
use crate::services::llm_service::TextGenerator;

#[derive(Clone)]
pub struct AppState {
    pub ollama: Ollama,
    pub session_manager: GlobalSessionManager,
    pub generator: Arc<dyn TextGenerator>,
}

impl AppState {
    pub fn new(ollama: Ollama, generator: Arc<dyn TextGenerator>) -> Self {
        AppState {
            ollama,
            session_manager: GlobalSessionManager::new(),
            generator,
        }
    }
}
