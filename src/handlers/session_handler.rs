use actix_session::Session;
use actix_web::web;
use log::{error, info};
use serde_json::json;
use uuid::Uuid;

use crate::config;
use crate::handlers::session_id;
use crate::models::user_session::ChatSession;
use crate::routes::app_state::AppState;

/// Reuses the cookie's session when the server still knows it, otherwise
/// registers a fresh one.
pub async fn initialize_session(
    data: web::Data<AppState>,
    session: Session,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    if let Some(existing) = session_id(&session) {
        if let Some(chat) = data.session_manager.get(&existing) {
            info!("Resuming session {}", existing);
            return Ok(json!({ "initialized": true, "session_id": existing, "state": chat.view() }));
        }
    }

    let session_id = Uuid::new_v4().to_string();
    if let Err(e) = session.insert("session_id", session_id.clone()) {
        error!("Failed to insert session_id into cookie: {:?}", e);
        return Err(Box::new(e));
    }
    info!("Stored session_id {} in cookie", session_id);

    let chat = ChatSession::with_model(config::model_name());
    let view = chat.view();
    data.session_manager.insert(session_id.clone(), chat);
    info!("Initialized user session: {}", session_id);

    Ok(json!({ "initialized": true, "session_id": session_id, "state": view }))
}
