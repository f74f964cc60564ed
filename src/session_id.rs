//! Client-generated session identifier.
//!
//! The narration server keys story state on this token. It is not a secret
//! and collisions are only informally unlikely.

use rand::Rng;
use std::fmt;

use crate::error::{ClientError, ClientResult};

/// Length of a generated identifier.
pub const SESSION_ID_LEN: usize = 7;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque, immutable session token sent on every narration request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a random 7-character lowercase base-36 identifier.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..SESSION_ID_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        SessionId(id)
    }

    /// Accept a user-supplied id, e.g. one passed to resume a story.
    ///
    /// Only the generator's alphabet is allowed, so the id always maps to a
    /// single plain path segment.
    pub fn parse(id: &str) -> ClientResult<Self> {
        if id.is_empty() || !id.bytes().all(|b| ALPHABET.contains(&b)) {
            return Err(ClientError::InvalidSession(id.to_string()));
        }
        Ok(SessionId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// False for ids that would collapse or vanish as a path segment.
    pub fn is_path_segment(&self) -> bool {
        !matches!(self.0.as_str(), "" | "." | "..")
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        SessionId(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        SessionId(id.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
