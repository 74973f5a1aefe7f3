//! Holder identities and lock tokens.

use std::fmt;

use uuid::Uuid;

/// Identifies a logical lock holder.
///
/// Acquisitions by the same holder are reentrant. A holder is usually one
/// request or one unit of work; nested calls inside it pass the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HolderId(Uuid);

impl HolderId {
    /// Creates a fresh random holder id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HolderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The value stored under a lock key while it is held.
///
/// A new token is minted for every real acquisition, so a token identifies
/// one lease, not one holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockToken(String);

impl LockToken {
    /// Mints a new random token.
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the token as stored in the remote store.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
