use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::handlers::{error_response, not_initialized, session_id};
use crate::routes::app_state::AppState;
use crate::services::{chat_service, llm_service};

#[derive(Debug, Deserialize)]
pub struct SelectModelRequest {
    pub model: String,
}

pub async fn handle_list_models(data: web::Data<AppState>) -> HttpResponse {
    let models = llm_service::list_models(&data.ollama).await;
    HttpResponse::Ok().json(json!({ "models": models }))
}

pub async fn handle_select_model(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<SelectModelRequest>,
) -> HttpResponse {
    let Some(session_id) = session_id(&session) else {
        return not_initialized();
    };
    let result = chat_service::with_session(&data.session_manager, &session_id, |s| {
        s.select_model(&req_body.model)?;
        Ok(s.view())
    });
    match result {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => error_response(e),
    }
}
