pub mod app_state;
pub mod chat_routes;
pub mod file_routes;
pub mod model_routes;
pub mod session_routes;

use actix_web::web;

/// Uploads arrive base64-encoded inside JSON.
pub const JSON_LIMIT: usize = 64 * 1024 * 1024;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(JSON_LIMIT))
        .configure(session_routes::init_routes)
        .configure(chat_routes::init_routes)
        .configure(file_routes::init_routes)
        .configure(model_routes::init_routes);
}
