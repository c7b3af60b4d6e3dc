//! Client-side session record and its storage seam.
//!
//! The session is the signed-in user's profile plus the access token issued
//! by the Auth API. It is written once per successful sign-in (full
//! overwrite) and removed on sign-out.

mod file;
mod memory;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

/// Key under which the session lives in the persisted document.
pub const SESSION_KEY: &str = "user";

/// Authenticated user's profile and access token.
///
/// All fields are opaque strings from the Auth API; only presence is checked.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub role: String,
    pub access_token: String,
    pub state: String,
    pub community: String,
}

impl Session {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .field("role", &self.role)
            .field("access_token", &mask_token(&self.access_token))
            .field("state", &self.state)
            .field("community", &self.community)
            .finish()
    }
}

/// Persistent home of the session.
pub trait SessionStore: Send + Sync {
    /// Reads the stored session, if any.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read or parsed.
    fn get(&self) -> Result<Option<Session>>;

    /// Replaces the stored session.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, session: &Session) -> Result<()>;

    /// Removes the stored session. Returns whether one existed.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<bool>;
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn get(&self) -> Result<Option<Session>> {
        (**self).get()
    }

    fn set(&self, session: &Session) -> Result<()> {
        (**self).set(session)
    }

    fn clear(&self) -> Result<bool> {
        (**self).clear()
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 16 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(12).collect();
    format!("{prefix}...")
}

#[cfg(test)]
pub(crate) fn sample_session() -> Session {
    Session {
        first_name: "A".to_string(),
        last_name: "B".to_string(),
        email: "a@b.com".to_string(),
        phone_number: "123".to_string(),
        role: "agent".to_string(),
        access_token: "tok1".to_string(),
        state: "Lagos".to_string(),
        community: "north".to_string(),
    }
}
