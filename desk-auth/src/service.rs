// Authentication service.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use desk_core::{DeskConfigSnapshot, DeskService, ServiceCapabilities, ServiceMethodKind};
use serde_json::{json, Value};

use crate::jwt::{Claims, JwtIssuer};
use crate::local::{AuthUser, LocalStrategy, LoginRequest};
use crate::options::AuthOptions;
use crate::AuthError;

/// Exchanges admin credentials for an access token and verifies tokens
/// presented on later requests.
#[derive(Debug)]
pub struct AuthenticationService {
    jwt: JwtIssuer,
    local: LocalStrategy,
}

impl AuthenticationService {
    pub fn new(options: AuthOptions) -> Result<Self, AuthError> {
        options.validate()?;
        Ok(Self {
            jwt: JwtIssuer::new(options.jwt)?,
            local: LocalStrategy::new(&options.local)?,
        })
    }

    pub fn from_config(cfg: &DeskConfigSnapshot) -> Result<Arc<Self>, AuthError> {
        Ok(Arc::new(Self::new(AuthOptions::from_config(cfg)?)?))
    }

    pub fn jwt(&self) -> &JwtIssuer {
        &self.jwt
    }

    /// Local login. Produces the `{accessToken, authentication, user}` body.
    pub fn login(&self, request: &LoginRequest) -> Result<Value, AuthError> {
        if let Some(strategy) = request.strategy.as_deref() {
            if strategy != self.local.name() {
                return Err(AuthError::InvalidCredentials);
            }
        }

        let user = self.local.authenticate(&request.username, &request.password)?;
        let access_token = self.jwt.sign(&user.username)?;
        tracing::info!(username = %user.username, "admin logged in");

        Ok(json!({
            "accessToken": access_token,
            "authentication": { "strategy": self.local.name() },
            "user": user,
        }))
    }

    /// Verifies a bearer token and returns the user it was issued to.
    pub fn verify_access_token(&self, token: &str) -> Result<(AuthUser, Claims), AuthError> {
        let claims = self.jwt.verify(token)?;
        Ok((
            AuthUser {
                username: claims.sub.clone(),
            },
            claims,
        ))
    }
}

#[async_trait]
impl<P> DeskService<Value, P> for AuthenticationService
where
    P: Send + 'static,
{
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::from_methods(vec![ServiceMethodKind::Create])
    }

    async fn create(&self, data: Value, _params: P) -> Result<Value> {
        let request: LoginRequest = serde_json::from_value(data)
            .map_err(|_| AuthError::InvalidCredentials.into_anyhow())?;
        self.login(&request).map_err(AuthError::into_anyhow)
    }
}
