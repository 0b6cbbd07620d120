//! Subcommand implementations.

pub mod api;
pub mod migrate;

/// Errors shared by the subcommands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("API error: {0}")]
    Api(#[from] sapa_api::ApiError),
}

/// Read a required environment variable.
fn require_env(key: &'static str) -> Result<String, CommandError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(CommandError::MissingEnvVar(key))
}
