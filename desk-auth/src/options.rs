// Authentication options and configuration.

use std::time::Duration;

use desk_core::DeskConfigSnapshot;
use serde::{Deserialize, Serialize};

use crate::AuthError;

/// JWT signing algorithms (HMAC only)
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl std::str::FromStr for JwtAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(JwtAlgorithm::HS256),
            "HS384" => Ok(JwtAlgorithm::HS384),
            "HS512" => Ok(JwtAlgorithm::HS512),
            other => Err(AuthError::Config(format!("unsupported JWT algorithm: {other}"))),
        }
    }
}

/// Main authentication configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthOptions {
    pub jwt: JwtOptions,
    pub local: LocalOptions,
}

impl AuthOptions {
    pub fn validate(&self) -> Result<(), AuthError> {
        self.jwt.validate()?;
        self.local.validate()
    }

    /// Read `auth.*` keys from the app config, keeping defaults for the rest.
    ///
    /// | key | meaning |
    /// |---|---|
    /// | `auth.jwt.secret` | HMAC secret |
    /// | `auth.jwt.algorithm` | HS256 / HS384 / HS512 |
    /// | `auth.jwt.expiresIn` | humantime duration, e.g. `1h` |
    /// | `auth.jwt.issuer`, `auth.jwt.audience` | registered claims |
    /// | `auth.admin.username` | admin login |
    /// | `auth.admin.passwordHash` | bcrypt hash, preferred over the plain password |
    /// | `auth.admin.password` | plaintext, hashed at startup |
    /// | `auth.admin.hashCost` | bcrypt cost for that startup hash |
    pub fn from_config(cfg: &DeskConfigSnapshot) -> Result<Self, AuthError> {
        let mut opts = AuthOptions::default();

        if let Some(secret) = cfg.get_string("auth.jwt.secret") {
            opts.jwt.secret = Some(secret);
        }
        if let Some(alg) = cfg.get("auth.jwt.algorithm") {
            opts.jwt.algorithm = alg.parse()?;
        }
        if let Some(raw) = cfg.get("auth.jwt.expiresIn") {
            opts.jwt.access_token_expires_in = humantime_serde::re::humantime::parse_duration(raw)
                .map_err(|e| AuthError::Config(format!("auth.jwt.expiresIn: {e}")))?;
        }
        if let Some(issuer) = cfg.get_string("auth.jwt.issuer") {
            opts.jwt.issuer = issuer;
        }
        if let Some(aud) = cfg.get("auth.jwt.audience") {
            opts.jwt.audience = aud
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(user) = cfg.get_string("auth.admin.username") {
            opts.local.username = user;
        }
        opts.local.password_hash = cfg
            .get_string("auth.admin.passwordHash")
            .filter(|s| !s.trim().is_empty());
        opts.local.password = cfg
            .get_string("auth.admin.password")
            .filter(|s| !s.is_empty());
        if let Some(cost) = cfg.get_u64("auth.admin.hashCost") {
            opts.local.hash_cost = cost as u32;
        }

        opts.validate()?;
        Ok(opts)
    }
}

/// JWT-specific configuration options
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOptions {
    pub algorithm: JwtAlgorithm,
    /// Token issuer (iss claim)
    pub issuer: String,
    /// Token audience (aud claim)
    pub audience: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub access_token_expires_in: Duration,
    pub secret: Option<String>,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            algorithm: JwtAlgorithm::default(),
            issuer: "mediadesk".to_string(),
            audience: vec!["mediadesk-api".to_string()],
            access_token_expires_in: Duration::from_secs(3600), // 1 hour
            secret: None,
        }
    }
}

impl JwtOptions {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.issuer.is_empty() {
            return Err(AuthError::Config("JWT issuer cannot be empty".into()));
        }
        if self.audience.is_empty() {
            return Err(AuthError::Config("JWT audience cannot be empty".into()));
        }
        match &self.secret {
            Some(s) if !s.is_empty() => {}
            _ => return Err(AuthError::Config("HMAC algorithms require a secret".into())),
        }
        if self.access_token_expires_in.as_secs() == 0 {
            return Err(AuthError::Config(
                "Access token expiration must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_expires_in(mut self, d: Duration) -> Self {
        self.access_token_expires_in = d;
        self
    }
}

/// The single admin account of the console.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalOptions {
    pub username: String,
    /// bcrypt hash; wins over `password` when both are set
    pub password_hash: Option<String>,
    /// Plaintext password, hashed once at startup
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub hash_cost: u32,
    pub error_message: String,
}

impl Default for LocalOptions {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password_hash: None,
            password: None,
            hash_cost: 10,
            error_message: "Invalid login".to_string(),
        }
    }
}

impl LocalOptions {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.username.trim().is_empty() {
            return Err(AuthError::Config("admin username cannot be empty".into()));
        }
        if self.password_hash.is_none() && self.password.is_none() {
            return Err(AuthError::Config(
                "either an admin password or a password hash is required".into(),
            ));
        }
        Ok(())
    }
}
