use actix_session::Session;
use actix_web::{get, post, web, Responder};

use crate::handlers::model_handler::{self, SelectModelRequest};
use crate::routes::app_state::AppState;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_models).service(select_model);
}

#[get("/api/models")]
async fn list_models(data: web::Data<AppState>) -> impl Responder {
    model_handler::handle_list_models(data).await
}

#[post("/api/models/select")]
async fn select_model(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<SelectModelRequest>,
) -> impl Responder {
    model_handler::handle_select_model(data, session, req_body).await
}
