use actix_session::Session;
use actix_web::{get, post, web, Responder};

use crate::handlers::chat_handler::{self, MessageRequest, SelectChatRequest};
use crate::routes::app_state::AppState;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(state)
        .service(new_chat)
        .service(clear_history)
        .service(select_chat)
        .service(message)
        .service(generate)
        .service(stop);
}

#[get("/api/state")]
async fn state(data: web::Data<AppState>, session: Session) -> impl Responder {
    chat_handler::handle_state(data, session).await
}

#[post("/api/chat/new")]
async fn new_chat(data: web::Data<AppState>, session: Session) -> impl Responder {
    chat_handler::handle_new_chat(data, session).await
}

#[post("/api/chat/clear")]
async fn clear_history(data: web::Data<AppState>, session: Session) -> impl Responder {
    chat_handler::handle_clear_history(data, session).await
}

#[post("/api/chat/select")]
async fn select_chat(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<SelectChatRequest>,
) -> impl Responder {
    chat_handler::handle_select_chat(data, session, req_body).await
}

#[post("/api/chat/message")]
async fn message(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<MessageRequest>,
) -> impl Responder {
    chat_handler::handle_message(data, session, req_body).await
}

#[post("/api/chat/generate")]
async fn generate(data: web::Data<AppState>, session: Session) -> impl Responder {
    chat_handler::handle_generate(data, session).await
}

#[post("/api/chat/stop")]
async fn stop(data: web::Data<AppState>, session: Session) -> impl Responder {
    chat_handler::handle_stop(data, session).await
}
