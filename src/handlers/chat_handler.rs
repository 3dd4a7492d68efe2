use actix_session::Session;
use actix_web::{web, HttpResponse};
use async_stream::stream;
use bytes::Bytes;
use log::{error, info};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

use crate::handlers::{error_response, not_initialized, session_id};
use crate::models::user_session::{ChatSession, SessionError};
use crate::routes::app_state::AppState;
use crate::services::chat_service::{self, ChatError, GenerationEvent};

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectChatRequest {
    pub id: u64,
}

/// Applies one session action and answers with the re-derived view.
fn apply(
    data: &web::Data<AppState>,
    session: &Session,
    action: impl FnOnce(&mut ChatSession) -> Result<(), SessionError>,
) -> HttpResponse {
    let Some(session_id) = session_id(session) else {
        return not_initialized();
    };
    let result = chat_service::with_session(&data.session_manager, &session_id, |s| {
        action(s)?;
        Ok(s.view())
    });
    match result {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => {
            error!("Action failed for session {}: {}", session_id, e);
            error_response(e)
        }
    }
}

pub async fn handle_state(data: web::Data<AppState>, session: Session) -> HttpResponse {
    apply(&data, &session, |_| Ok(()))
}

pub async fn handle_new_chat(data: web::Data<AppState>, session: Session) -> HttpResponse {
    apply(&data, &session, |s| {
        s.new_chat();
        Ok(())
    })
}

pub async fn handle_clear_history(data: web::Data<AppState>, session: Session) -> HttpResponse {
    apply(&data, &session, |s| {
        s.clear_history();
        Ok(())
    })
}

pub async fn handle_select_chat(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<SelectChatRequest>,
) -> HttpResponse {
    apply(&data, &session, |s| s.select_chat(req_body.id))
}

pub async fn handle_message(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<MessageRequest>,
) -> HttpResponse {
    apply(&data, &session, |s| s.submit_message(&req_body.message))
}

pub async fn handle_stop(data: web::Data<AppState>, session: Session) -> HttpResponse {
    apply(&data, &session, |s| {
        s.request_stop();
        Ok(())
    })
}

fn event_line(event: &GenerationEvent) -> Bytes {
    let mut line = serde_json::to_string(event).unwrap_or_default();
    line.push('\n');
    Bytes::from(line)
}

/// Runs the pending turn and streams its progress as NDJSON. The reply is
/// recorded in the session even if the page goes away mid-stream.
pub async fn handle_generate(data: web::Data<AppState>, session: Session) -> HttpResponse {
    let Some(session_id) = session_id(&session) else {
        return not_initialized();
    };
    let turn = match chat_service::start_generation(&data.session_manager, &session_id) {
        Ok(turn) => turn,
        Err(ChatError::Session(SessionError::NothingToGenerate)) => {
            info!("Nothing to generate for session {}", session_id);
            return error_response(ChatError::Session(SessionError::NothingToGenerate));
        }
        Err(e) => return error_response(e),
    };

    let (tx, mut rx) = mpsc::channel::<String>(64);
    let (done_tx, done_rx) = oneshot::channel::<String>();
    let manager = data.session_manager.clone();
    let generator = data.generator.clone();
    actix_web::rt::spawn(async move {
        let reply =
            chat_service::finish_generation(&manager, &session_id, generator.as_ref(), turn, tx).await;
        let _ = done_tx.send(reply);
    });

    let body = stream! {
        while let Some(text) = rx.recv().await {
            yield Ok::<Bytes, actix_web::Error>(event_line(&GenerationEvent::Partial { text }));
        }
        let text = done_rx.await.unwrap_or_default();
        yield Ok(event_line(&GenerationEvent::Done { text }));
    };

    HttpResponse::Ok()
        .content_type("application/x-ndjson")
        .streaming(body)
}
