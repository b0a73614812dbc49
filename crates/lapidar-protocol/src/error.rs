//! Error types for the protocol layer.
//!
//! Two kinds of things go wrong here and they are kept apart:
//! [`ProtocolError`] is about bytes (a body that does not encode or
//! decode), [`ValidationError`] is about values (a configuration that
//! must never be sent to the backend).

/// Errors that can occur while encoding or decoding wire bodies.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: the backend answered with an HTML error page, a
    /// field changed type, or the body was truncated.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A configuration value the console refuses to submit.
///
/// These are detected locally, before any request leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The text is not a port number at all.
    #[error("'{0}' is not a port number")]
    NotANumber(String),

    /// Ports live in 1..=65535.
    #[error("port {0} is out of range 1-65535")]
    PortOutOfRange(u32),

    /// The alternate list already contains this port.
    #[error("port {0} is already an alternate port")]
    DuplicateAlternate(u16),

    /// An alternate may not repeat the primary port.
    #[error("port {0} is already the primary port")]
    AlternateIsPrimary(u16),
}
