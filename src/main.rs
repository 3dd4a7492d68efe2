use std::io;
use std::sync::Arc;

use actix_files::Files;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{info, warn};

use ai_hub_chat::config;
use ai_hub_chat::routes::{self, app_state::AppState};
use ai_hub_chat::services::llm_service::OllamaClient;

#[actix_web::main]
async fn main() -> io::Result<()> {
    config::load_env();
    config::init_logging();

    let generator = OllamaClient::from_config()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    info!("Using Ollama at {} with model {}", generator.endpoint(), config::model_name());
    let state = web::Data::new(AppState::new(config::create_ollama(), Arc::new(generator)));

    let key = match config::session_key() {
        Some(bytes) => Key::from(bytes.as_slice()),
        None => {
            warn!("SESSION_KEY not set (or shorter than 64 bytes); sessions will not survive a restart");
            Key::generate()
        }
    };

    let (host, port) = config::bind_address();
    info!("Starting server on http://{}:{}", host, port);
    HttpServer::new(move || {
        App::new()
            // Use the Logger middleware to log incoming requests.
            .wrap(Logger::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
                    .cookie_secure(false)
                    .build(),
            )
            .app_data(state.clone())
            .configure(routes::init_routes)
            // Serve the chat page from the "./static" directory.
            .service(Files::new("/", "./static").index_file("index.html"))
    })
    .bind((host, port))?
    .run()
    .await
}
