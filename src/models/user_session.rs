use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config;
use crate::models::conversation::{ChatSummary, Conversation, ConversationHistory};
use crate::models::file_context::FileContext;
use crate::models::message::Message;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("A response is still being generated")]
    GenerationInProgress,

    #[error("The previous message has not been answered yet")]
    AwaitingReply,

    #[error("Nothing to generate")]
    NothingToGenerate,

    #[error("Chat {0} not found")]
    ChatNotFound(u64),

    #[error("Model name is empty")]
    EmptyModel,
}

/// State of one assistant turn while it is being produced.
#[derive(Debug, Clone)]
pub struct GenerationSession {
    pub turn: Uuid,
    pub prompt: String,
    pub context: String,
    pub model: String,
    pub stop: CancellationToken,
}

/// Everything one browser session knows about its chats.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub messages: Vec<Message>,
    pub history: ConversationHistory,
    pub current_chat_id: u64,
    pub selected_model: String,
    pub pending_response: Option<String>,
    pub file_context: FileContext,
    stop: CancellationToken,
    active_turn: Option<Uuid>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::with_model(config::DEFAULT_MODEL_NAME)
    }
}

impl ChatSession {
    pub fn with_model(model: impl Into<String>) -> Self {
        ChatSession {
            messages: Vec::new(),
            history: ConversationHistory::default(),
            current_chat_id: 0,
            selected_model: model.into(),
            pending_response: None,
            file_context: FileContext::default(),
            stop: CancellationToken::new(),
            active_turn: None,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.active_turn.is_some()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Archives the current chat (if it has messages) and starts an empty one.
    pub fn new_chat(&mut self) {
        self.abandon_generation();
        if let Some(archived) = Conversation::archive(self.current_chat_id, &self.messages) {
            self.history.push(archived);
        }
        self.messages.clear();
        self.current_chat_id += 1;
        self.file_context = FileContext::default();
    }

    pub fn clear_history(&mut self) {
        self.abandon_generation();
        self.history.clear();
        self.messages.clear();
        self.pending_response = None;
        self.file_context = FileContext::default();
    }

    /// Replaces the current chat with a copy of an archived one. Uploaded
    /// files are not restored.
    pub fn select_chat(&mut self, id: u64) -> Result<(), SessionError> {
        let messages = self
            .history
            .get(id)
            .ok_or(SessionError::ChatNotFound(id))?
            .messages
            .clone();
        self.abandon_generation();
        self.messages = messages;
        self.pending_response = None;
        self.file_context = FileContext::default();
        Ok(())
    }

    pub fn submit_message(&mut self, text: &str) -> Result<(), SessionError> {
        if self.is_generating() {
            return Err(SessionError::GenerationInProgress);
        }
        if self.needs_generation() {
            return Err(SessionError::AwaitingReply);
        }
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.messages.push(Message::user(text));
        self.stop = CancellationToken::new();
        self.pending_response = None;
        Ok(())
    }

    /// Raises the stop flag seen by the running stream, if any.
    pub fn request_stop(&mut self) {
        self.stop.cancel();
    }

    pub fn replace_file_context(&mut self, context: FileContext) {
        self.file_context = context;
    }

    pub fn select_model(&mut self, model: &str) -> Result<(), SessionError> {
        let model = model.trim();
        if model.is_empty() {
            return Err(SessionError::EmptyModel);
        }
        self.selected_model = model.to_string();
        Ok(())
    }

    pub fn needs_generation(&self) -> bool {
        self.pending_response.is_none()
            && !self.is_generating()
            && self.messages.last().is_some_and(Message::is_user)
    }

    pub fn begin_generation(&mut self) -> Result<GenerationSession, SessionError> {
        if self.is_generating() {
            return Err(SessionError::GenerationInProgress);
        }
        if !self.needs_generation() {
            return Err(SessionError::NothingToGenerate);
        }
        let prompt = self
            .messages
            .last()
            .map(|m| m.content.clone())
            .ok_or(SessionError::NothingToGenerate)?;
        let turn = Uuid::new_v4();
        self.active_turn = Some(turn);
        Ok(GenerationSession {
            turn,
            prompt,
            context: self.file_context.text().to_string(),
            model: self.selected_model.clone(),
            stop: self.stop.clone(),
        })
    }

    /// Records the reply of `turn`. Returns `false` when the turn was
    /// abandoned by a chat switch in the meantime.
    pub fn complete_generation(&mut self, turn: Uuid, reply: String) -> bool {
        if self.active_turn != Some(turn) {
            return false;
        }
        self.active_turn = None;
        self.messages.push(Message::assistant(reply.clone()));
        self.pending_response = Some(reply);
        true
    }

    fn abandon_generation(&mut self) {
        if self.active_turn.take().is_some() {
            self.stop.cancel();
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            chat_id: self.current_chat_id,
            model: self.selected_model.clone(),
            messages: self.messages.clone(),
            recent_chats: self.history.recent(),
            uploaded_files: self.file_context.files().to_vec(),
            needs_generation: self.needs_generation(),
            generating: self.is_generating(),
            stop_requested: self.stop_requested(),
        }
    }
}

/// What the page renders after every action.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub chat_id: u64,
    pub model: String,
    pub messages: Vec<Message>,
    pub recent_chats: Vec<ChatSummary>,
    pub uploaded_files: Vec<String>,
    pub needs_generation: bool,
    pub generating: bool,
    pub stop_requested: bool,
}
