// Local (username/password) strategy for the admin account.

use bcrypt::{hash, verify};
use serde::{Deserialize, Serialize};

use crate::options::LocalOptions;
use crate::AuthError;

/// Body of `POST /authentication`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// The authenticated principal.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub username: String,
}

#[derive(Clone)]
pub struct LocalStrategy {
    username: String,
    password_hash: String,
    error_message: String,
}

impl std::fmt::Debug for LocalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStrategy")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl LocalStrategy {
    /// Uses `password_hash` when configured, otherwise hashes `password` now.
    pub fn new(options: &LocalOptions) -> Result<Self, AuthError> {
        options.validate()?;

        let password_hash = match (&options.password_hash, &options.password) {
            (Some(h), _) => h.clone(),
            (None, Some(plain)) => hash_password(plain, options.hash_cost)?,
            (None, None) => {
                return Err(AuthError::Config("no admin password configured".into()))
            }
        };

        Ok(Self {
            username: options.username.clone(),
            password_hash,
            error_message: options.error_message.clone(),
        })
    }

    pub fn name(&self) -> &'static str {
        "local"
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Checks the credential pair. Any mismatch is `InvalidCredentials`.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<AuthUser, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        // verify even on a username mismatch so both paths cost the same
        let password_ok = verify(password, &self.password_hash).unwrap_or(false);
        if username != self.username || !password_ok {
            tracing::warn!(username, "rejected login");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(AuthUser {
            username: self.username.clone(),
        })
    }
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(hash(password, cost)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> LocalOptions {
        LocalOptions {
            password: Some("hunter2".into()),
            hash_cost: 4,
            ..LocalOptions::default()
        }
    }

    #[test]
    fn accepts_configured_admin() {
        let local = LocalStrategy::new(&options()).unwrap();
        let user = local.authenticate("admin", "hunter2").unwrap();
        assert_eq!(user.username, "admin");
    }

    #[test]
    fn rejects_wrong_password_or_user() {
        let local = LocalStrategy::new(&options()).unwrap();
        assert!(matches!(
            local.authenticate("admin", "nope"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            local.authenticate("root", "hunter2"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            local.authenticate("", ""),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn prefers_precomputed_hash() {
        let opts = LocalOptions {
            password_hash: Some(hash_password("from-hash", 4).unwrap()),
            password: Some("plain".into()),
            hash_cost: 4,
            ..LocalOptions::default()
        };
        let local = LocalStrategy::new(&opts).unwrap();
        assert!(local.authenticate("admin", "from-hash").is_ok());
        assert!(local.authenticate("admin", "plain").is_err());
    }
}
