use actix_session::Session;
use actix_web::{post, web, Responder};

use crate::handlers::file_handler::{self, UploadRequest};
use crate::routes::app_state::AppState;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(upload);
}

#[post("/api/files")]
async fn upload(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<UploadRequest>,
) -> impl Responder {
    file_handler::handle_upload(data, session, req_body).await
}
