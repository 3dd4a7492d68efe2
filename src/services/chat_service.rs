use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::models::global_session_manager::GlobalSessionManager;
use crate::models::upload::{FilePreview, UploadedFile};
use crate::models::user_session::{ChatSession, GenerationSession, SessionError, SessionView};
use crate::services::extraction_service;
use crate::services::llm_service::{GenerateRequest, TextGenerator};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Session not initialized")]
    SessionNotFound,

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// One line of the NDJSON stream sent to the page while a reply is generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GenerationEvent {
    Partial { text: String },
    Done { text: String },
}

/// Runs `action` against the stored session.
pub fn with_session<T>(
    manager: &GlobalSessionManager,
    session_id: &str,
    action: impl FnOnce(&mut ChatSession) -> Result<T, SessionError>,
) -> Result<T, ChatError> {
    manager
        .update(session_id, action)
        .ok_or(ChatError::SessionNotFound)?
        .map_err(ChatError::from)
}

pub fn view(manager: &GlobalSessionManager, session_id: &str) -> Result<SessionView, ChatError> {
    with_session(manager, session_id, |s| Ok(s.view()))
}

/// Marks a turn as running. Fails when nothing is waiting for a reply or a
/// reply is already being generated.
pub fn start_generation(
    manager: &GlobalSessionManager,
    session_id: &str,
) -> Result<GenerationSession, ChatError> {
    let turn = with_session(manager, session_id, ChatSession::begin_generation)?;
    info!(
        "Generating reply with {} for session {} ({} bytes of file context)",
        turn.model,
        session_id,
        turn.context.len()
    );
    Ok(turn)
}

/// Streams the reply for `turn` and records it in the session.
pub async fn finish_generation(
    manager: &GlobalSessionManager,
    session_id: &str,
    generator: &dyn TextGenerator,
    turn: GenerationSession,
    updates: mpsc::Sender<String>,
) -> String {
    let request = GenerateRequest::chat(&turn.model, &turn.prompt, &turn.context, true);
    let reply = generator
        .generate_stream(request, turn.stop.clone(), updates)
        .await;

    match manager.update(session_id, |s| s.complete_generation(turn.turn, reply.clone())) {
        Some(true) => info!("Recorded reply for session {}", session_id),
        Some(false) => info!("Dropped reply for abandoned turn in session {}", session_id),
        None => warn!("Session {} disappeared during generation", session_id),
    }
    reply
}

/// Generation trigger in one call: start, stream and record.
pub async fn generate_reply(
    manager: &GlobalSessionManager,
    session_id: &str,
    generator: &dyn TextGenerator,
    updates: mpsc::Sender<String>,
) -> Result<String, ChatError> {
    let turn = start_generation(manager, session_id)?;
    Ok(finish_generation(manager, session_id, generator, turn, updates).await)
}

/// Replaces the session's file context with the extraction of `files`. An
/// empty batch leaves the current context in place.
pub async fn upload_files(
    manager: &GlobalSessionManager,
    session_id: &str,
    generator: &dyn TextGenerator,
    files: &[UploadedFile],
) -> Result<(SessionView, Vec<FilePreview>), ChatError> {
    if files.is_empty() {
        info!("Ignoring empty upload for session {}", session_id);
        return Ok((view(manager, session_id)?, Vec::new()));
    }
    let model = with_session(manager, session_id, |s| Ok(s.selected_model.clone()))?;
    let (context, previews) = extraction_service::extract_batch(files, generator, &model).await;
    let view = with_session(manager, session_id, |s| {
        s.replace_file_context(context);
        Ok(s.view())
    })?;
    Ok((view, previews))
}
