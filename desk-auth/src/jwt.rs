// Access token signing and verification.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::options::JwtOptions;
use crate::AuthError;

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
use crate::options::JwtAlgorithm;

/// Registered claims carried by mediadesk access tokens.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Signs and verifies access tokens with the configured HMAC secret.
#[derive(Clone, Debug)]
pub struct JwtIssuer {
    options: JwtOptions,
}

impl JwtIssuer {
    pub fn new(options: JwtOptions) -> Result<Self, AuthError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &JwtOptions {
        &self.options
    }

    pub fn expires_in_secs(&self) -> u64 {
        self.options.access_token_expires_in.as_secs()
    }

    pub fn claims_for(&self, subject: &str) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: subject.to_string(),
            iss: self.options.issuer.clone(),
            aud: self.options.audience.clone(),
            iat: now,
            exp: now + self.expires_in_secs() as i64,
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    fn secret(&self) -> &[u8] {
        self.options.secret.as_deref().unwrap_or_default().as_bytes()
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
fn algorithm(alg: JwtAlgorithm) -> jsonwebtoken::Algorithm {
    match alg {
        JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
        JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
        JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JwtIssuer {
    pub fn sign(&self, subject: &str) -> Result<String, AuthError> {
        self.sign_claims(&self.claims_for(subject))
    }

    pub fn sign_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let mut header = Header::new(algorithm(self.options.algorithm));
        header.typ = Some("access".to_string());

        encode(&header, claims, &EncodingKey::from_secret(self.secret()))
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let mut validation = Validation::new(algorithm(self.options.algorithm));
        validation.set_issuer(&[self.options.issuer.as_str()]);
        validation.set_audience(
            &self
                .options
                .audience
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>(),
        );

        let decoded = decode::<Claims>(token, &DecodingKey::from_secret(self.secret()), &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(decoded.claims)
    }
}

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
impl JwtIssuer {
    pub fn sign(&self, _subject: &str) -> Result<String, AuthError> {
        Err(AuthError::JwtDisabled)
    }

    pub fn sign_claims(&self, _claims: &Claims) -> Result<String, AuthError> {
        Err(AuthError::JwtDisabled)
    }

    pub fn verify(&self, _token: &str) -> Result<Claims, AuthError> {
        Err(AuthError::JwtDisabled)
    }
}
