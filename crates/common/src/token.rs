//! Opaque download tokens
//!
//! A token is the unpadded URL-safe base64 form of the build timestamp
//! (8 bytes, little-endian) followed by the artifact's ordinal (1 byte).
//! Tokens are keys only: the download registry holds what they point to.

use base64::prelude::{Engine as _, BASE64_URL_SAFE_NO_PAD};
use std::borrow::Borrow;
use std::fmt;

/// Number of artifacts a single build can expose through tokens
pub const MAX_ARTIFACTS_PER_BUILD: usize = u8::MAX as usize + 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(String);

impl Token {
    /// Derive the token for an artifact of the build started at `timestamp`
    pub fn encode(timestamp: i64, ordinal: u8) -> Self {
        let mut raw = [0u8; 9];
        raw[..8].copy_from_slice(&timestamp.to_le_bytes());
        raw[8] = ordinal;
        Self(BASE64_URL_SAFE_NO_PAD.encode(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Client-facing download path for this token
    pub fn download_path(&self) -> String {
        format!("/file/{}", self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}
