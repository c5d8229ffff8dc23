//! Invite token - the capability string carried in invite links

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of characters in a generated token
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Unique, unguessable token used for link-based acceptance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteToken(String);

impl InviteToken {
    /// Generate a cryptographically secure random token of `len` characters
    pub fn generate(len: usize) -> Self {
        let mut rng = rand::thread_rng();
        let token = (0..len.max(1))
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect();
        Self(token)
    }

    /// Borrow the token as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the token, returning the inner string
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Default for InviteToken {
    fn default() -> Self {
        Self::generate(DEFAULT_TOKEN_LENGTH)
    }
}

impl fmt::Display for InviteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for InviteToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for InviteToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl AsRef<str> for InviteToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
