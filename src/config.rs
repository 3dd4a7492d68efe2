use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::warn;
use ollama_rs::Ollama;
use url::Url;

pub fn init_logging() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
}

/// Loads `.env` if present. Variables already set in the environment win.
pub fn load_env() {
    if let Ok(path) = dotenv::dotenv() {
        log::info!("Loaded environment from {}", path.display());
    }
}

pub const DEFAULT_MODEL_NAME: &str = "llava";
pub const OCR_PROMPT: &str = "You are an OCR assistant. Extract ONLY the text visible in this image.";

const OLLAMA_URL: &str = "http://localhost:11434";
const OLLAMA_TIMEOUT_SECS: u64 = 120;
const STREAM_REFRESH_MS: u64 = 100;
const BIND_ADDRESS: &str = "127.0.0.1";
const PORT: u16 = 8080;

/// Number of archived chats shown in the sidebar.
pub const HISTORY_DISPLAY_LIMIT: usize = 10;
/// Characters of the first message used as an archived chat title.
pub const CHAT_TITLE_CHARS: usize = 30;
/// Characters of extracted text shown in an upload preview.
pub const PREVIEW_CHARS: usize = 2000;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {}={:?}; using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Base URL of the Ollama server, without a trailing slash.
pub fn ollama_url() -> String {
    let raw = env::var("OLLAMA_URL").unwrap_or_else(|_| OLLAMA_URL.to_string());
    match Url::parse(&raw) {
        Ok(url) => url.as_str().trim_end_matches('/').to_string(),
        Err(e) => {
            warn!("Invalid OLLAMA_URL {:?} ({}); using {}", raw, e, OLLAMA_URL);
            OLLAMA_URL.to_string()
        }
    }
}

pub fn generate_endpoint() -> String {
    format!("{}/api/generate", ollama_url())
}

pub fn model_name() -> String {
    env::var("MODEL_NAME")
        .ok()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string())
}

pub fn ollama_timeout() -> Duration {
    Duration::from_secs(env_or("OLLAMA_TIMEOUT_SECS", OLLAMA_TIMEOUT_SECS))
}

pub fn stream_refresh_interval() -> Duration {
    Duration::from_millis(env_or("STREAM_REFRESH_MS", STREAM_REFRESH_MS))
}

pub fn bind_address() -> (String, u16) {
    let host = env::var("BIND_ADDRESS").unwrap_or_else(|_| BIND_ADDRESS.to_string());
    (host, env_or("PORT", PORT))
}

/// Cookie signing key material. Must be at least 64 bytes to be used.
pub fn session_key() -> Option<Vec<u8>> {
    env::var("SESSION_KEY")
        .ok()
        .map(String::into_bytes)
        .filter(|k| k.len() >= 64)
}

pub fn create_ollama() -> Ollama {
    let url = match Url::parse(&ollama_url()) {
        Ok(url) => url,
        Err(_) => return Ollama::default(),
    };
    let port = url.port_or_known_default().unwrap_or(11434);
    let host = format!("{}://{}", url.scheme(), url.host_str().unwrap_or("localhost"));
    Ollama::new(host, port)
}
