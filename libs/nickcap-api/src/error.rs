use std::fmt;

/// Error kind for integration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Payload,
    Signing,
    Handler,
}

/// Integration error — returned by hook and handler trait methods.
#[derive(Debug)]
pub struct IntegrationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl IntegrationError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn payload(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Payload, message: msg.into() }
    }

    pub fn signing(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Signing, message: msg.into() }
    }

    pub fn handler(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Handler, message: msg.into() }
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for IntegrationError {}

// ---------------------------------------------------------------------------
// From impls: standard error types → IntegrationError with correct ErrorKind
// ---------------------------------------------------------------------------

impl From<serde_json::Error> for IntegrationError {
    fn from(e: serde_json::Error) -> Self {
        Self::payload(e.to_string())
    }
}
