use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::config::{CHAT_TITLE_CHARS, HISTORY_DISPLAY_LIMIT};
use crate::models::message::Message;

/// A chat moved out of the main view by "New Chat".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: u64,
    pub title: String,
    pub messages: Vec<Message>,
    pub timestamp: String,
}

impl Conversation {
    /// Archives a copy of `messages`. Returns `None` for an empty chat.
    pub fn archive(id: u64, messages: &[Message]) -> Option<Self> {
        let first = messages.first()?;
        Some(Conversation {
            id,
            title: chat_title(&first.content),
            messages: messages.to_vec(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M").to_string(),
        })
    }
}

pub fn chat_title(text: &str) -> String {
    text.chars().take(CHAT_TITLE_CHARS).collect()
}

/// Sidebar entry for an archived chat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSummary {
    pub id: u64,
    pub title: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    chats: Vec<Conversation>,
}

impl ConversationHistory {
    pub fn push(&mut self, conversation: Conversation) {
        self.chats.push(conversation);
    }

    pub fn clear(&mut self) {
        self.chats.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    /// Archived chats in the order they were archived.
    pub fn chats(&self) -> &[Conversation] {
        &self.chats
    }

    pub fn get(&self, id: u64) -> Option<&Conversation> {
        self.chats.iter().find(|c| c.id == id)
    }

    /// The most recent chats, newest first.
    pub fn recent(&self) -> Vec<ChatSummary> {
        let skip = self.chats.len().saturating_sub(HISTORY_DISPLAY_LIMIT);
        self.chats[skip..]
            .iter()
            .rev()
            .map(|c| ChatSummary {
                id: c.id,
                title: c.title.clone(),
                timestamp: c.timestamp.clone(),
            })
            .collect()
    }
}
