//! Correlation tokens
//!
//! Every record carries a 36-byte opaque token the caller uses to relate the
//! record to something stored elsewhere. The store only generates and returns
//! tokens; what they point at is the caller's business.

use std::borrow::Cow;
use std::fmt;

use uuid::Uuid;

/// Fixed token width in bytes (a hyphenated UUID string)
pub const TOKEN_LEN: usize = 36;

/// Fixed-width correlation token, zero-padded
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token([u8; TOKEN_LEN]);

impl Token {
    pub fn from_bytes(bytes: [u8; TOKEN_LEN]) -> Self {
        Self(bytes)
    }

    /// Build from text, truncating past `TOKEN_LEN` bytes and zero-padding short input
    pub fn from_text(text: &str) -> Self {
        let mut bytes = [0u8; TOKEN_LEN];
        let len = text.len().min(TOKEN_LEN);
        bytes[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    /// Text view with zero padding stripped
    pub fn as_str(&self) -> Cow<'_, str> {
        let end = self
            .0
            .iter()
            .rposition(|&b| b != 0)
            .map(|pos| pos + 1)
            .unwrap_or(0);
        String::from_utf8_lossy(&self.0[..end])
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?})", self.as_str())
    }
}

/// Source of fresh tokens for appended records
///
/// Uniqueness is the source's concern; the store never checks for collisions.
pub trait TokenSource: Send + Sync {
    fn next_token(&self) -> Token;
}

/// Random UUID v4 tokens in hyphenated form
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidTokenSource;

impl TokenSource for UuidTokenSource {
    fn next_token(&self) -> Token {
        let mut buf = Uuid::encode_buffer();
        let text = Uuid::new_v4().hyphenated().encode_lower(&mut buf);
        Token::from_text(text)
    }
}
