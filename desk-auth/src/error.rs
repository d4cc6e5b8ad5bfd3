use desk_core::DeskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login")]
    InvalidCredentials,

    #[error("Not authenticated")]
    MissingToken,

    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    #[error("Invalid authentication configuration: {0}")]
    Config(String),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)")]
    JwtDisabled,
}

impl AuthError {
    /// Client-facing error: credential problems are 401, the rest 500.
    pub fn into_desk(self) -> DeskError {
        match self {
            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InvalidToken(_) => {
                DeskError::not_authenticated(self.to_string())
            }
            other => DeskError::general_error(other.to_string()),
        }
    }

    pub fn into_anyhow(self) -> anyhow::Error {
        self.into_desk().into_anyhow()
    }
}
