pub mod chat_handler;
pub mod file_handler;
pub mod model_handler;
pub mod session_handler;

use actix_session::Session;
use actix_web::HttpResponse;
use log::{error, warn};
use serde_json::json;

use crate::models::user_session::SessionError;
use crate::services::chat_service::ChatError;

/// Session id stored in the cookie by `/init_session`.
pub fn session_id(session: &Session) -> Option<String> {
    match session.get::<String>("session_id") {
        Ok(id) => id,
        Err(e) => {
            warn!("Unreadable session cookie: {:?}", e);
            None
        }
    }
}

pub fn not_initialized() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({"error": "Session not initialized"}))
}

pub fn error_response(err: ChatError) -> HttpResponse {
    let body = json!({"error": err.to_string()});
    match err {
        ChatError::SessionNotFound => {
            error!("Session not found!");
            not_initialized()
        }
        ChatError::Session(SessionError::EmptyMessage) | ChatError::Session(SessionError::EmptyModel) => {
            HttpResponse::BadRequest().json(body)
        }
        ChatError::Session(SessionError::ChatNotFound(_)) => HttpResponse::NotFound().json(body),
        ChatError::Session(SessionError::GenerationInProgress)
        | ChatError::Session(SessionError::AwaitingReply)
        | ChatError::Session(SessionError::NothingToGenerate) => HttpResponse::Conflict().json(body),
    }
}
