//! Error types for Artcast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArtcastError>;

#[derive(Error, Debug)]
pub enum ArtcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Website error: {0}")]
    Website(#[from] WebsiteError),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ArtcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ArtcastError::InvalidInput(_) => 3,
            ArtcastError::Website(WebsiteError::Login(_)) => 2,
            ArtcastError::Website(_) => 1,
            ArtcastError::Config(_) => 1,
            ArtcastError::Http(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Failures produced while driving a post attempt against one website.
///
/// The orchestrator branches on the variant, not on thrown control flow:
/// `Transport` and `Interpretation` are eligible for the single automatic
/// retry of the build/send/interpret sequence, `Login` and `Unsupported`
/// are terminal on first occurrence.
#[derive(Error, Debug, Clone)]
pub enum WebsiteError {
    #[error("Login check failed: {0}")]
    Login(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Could not interpret response: {0}")]
    Interpretation(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl WebsiteError {
    /// Whether the build/send/interpret sequence may be re-run once after
    /// this failure. Permanent failures (unimplemented post types, login
    /// problems) are excluded from the retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebsiteError::Transport(_) | WebsiteError::Interpretation(_)
        )
    }
}
