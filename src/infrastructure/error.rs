use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Command rejected with http {status}: {}", message.as_deref().unwrap_or("no message"))]
    RejectedCommand { status: u16, message: Option<String> },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl InfraError {
    /// Text shown to the user for a failed command: the server's own message
    /// when it sent one, the validation text for local rejections, otherwise
    /// `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::RejectedCommand {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.trim().to_string(),
            Self::InvalidInput(message) => message.clone(),
            _ => fallback.to_string(),
        }
    }
}
