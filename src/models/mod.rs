pub mod conversation;
pub mod file_context;
pub mod global_session_manager;
pub mod message;
pub mod upload;
pub mod user_session;
