//! Local identity: a stable user id and a remembered username.

use std::sync::Mutex;
use uuid::Uuid;

/// Provides the device-local identity a client plays under.
pub trait IdentityProvider: Send + Sync {
    /// Stable identifier for this user, created once and reused.
    fn user_id(&self) -> String;

    /// The username saved by a previous join, if any.
    fn saved_username(&self) -> Option<String>;

    /// Remembers the username for the next join.
    fn save_username(&self, username: &str);
}

/// In-memory [`IdentityProvider`]; real embeddings persist to local storage.
#[derive(Debug)]
pub struct MemoryIdentity {
    user_id: String,
    username: Mutex<Option<String>>,
}

impl MemoryIdentity {
    /// Creates a fresh identity with a random stable id.
    pub fn new() -> Self {
        Self {
            user_id: Uuid::new_v4().to_string(),
            username: Mutex::new(None),
        }
    }
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for MemoryIdentity {
    fn user_id(&self) -> String {
        self.user_id.clone()
    }

    fn saved_username(&self) -> Option<String> {
        self.username.lock().unwrap().clone()
    }

    fn save_username(&self, username: &str) {
        *self.username.lock().unwrap() = Some(username.to_string());
    }
}
