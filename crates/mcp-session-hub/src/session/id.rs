//! Opaque session identifiers.

use std::fmt;

use uuid::Uuid;

/// Length of the hex encoding carried in the `Mcp-Session-Id` header.
pub const SESSION_ID_HEX_LEN: usize = 32;

/// An opaque session identifier, minted only after a successful handshake.
///
/// Backed by a v4 UUID (122 random bits from the OS generator) and encoded as
/// 32 lowercase hex characters on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Encode the session ID as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.simple().to_string()
    }

    /// Decode a session ID from its hex form.
    ///
    /// Returns `None` unless the input is exactly 32 hex characters.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != SESSION_ID_HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Uuid::try_parse(s).ok().map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
