use nickcap_api::error::IntegrationError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(String),

    #[error("integration error: {0}")]
    Integration(#[from] IntegrationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Add context to the error.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            CoreError::Integration(e) => CoreError::Integration(e.with_context(ctx)),
            CoreError::Config(msg) => CoreError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}
