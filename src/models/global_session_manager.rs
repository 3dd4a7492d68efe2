use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::user_session::ChatSession;

#[derive(Clone, Default)]
pub struct GlobalSessionManager {
    sessions: Arc<Mutex<HashMap<String, ChatSession>>>,
}

impl GlobalSessionManager {
    pub fn new() -> Self {
        GlobalSessionManager {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ChatSession>> {
        // A panic while holding the lock leaves the map itself intact.
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts or updates a session
    pub fn insert(&self, session_id: String, session: ChatSession) {
        self.lock().insert(session_id, session);
    }

    /// Retrieves a session if it exists
    pub fn get(&self, session_id: &str) -> Option<ChatSession> {
        self.lock().get(session_id).cloned()
    }

    /// Applies `action` to the stored session in place, under the lock.
    pub fn update<T>(&self, session_id: &str, action: impl FnOnce(&mut ChatSession) -> T) -> Option<T> {
        self.lock().get_mut(session_id).map(action)
    }
}
