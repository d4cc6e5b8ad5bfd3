// Authenticate hook.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use desk_core::{DeskBeforeHook, DeskError, HookContext};
use serde_json::Value;

use crate::local::AuthUser;
use crate::service::AuthenticationService;

/// What the authenticate hook needs to read from (and write into) request params.
pub trait AuthenticateHookParams: Clone + Send + Sync {
    fn provider(&self) -> Option<&str>;
    fn headers(&self) -> &HashMap<String, String>;
    fn authenticated(&self) -> bool;

    fn set_user(&mut self, user: AuthUser);
}

/// Params wrapper carrying the transport's params plus auth state.
#[derive(Clone, Debug, Default)]
pub struct AuthParams<P> {
    pub inner: P,
    pub provider: Option<String>,
    pub headers: HashMap<String, String>,
    pub authenticated: bool,
    pub user: Option<AuthUser>,
}

impl<P> AuthParams<P> {
    /// Params for an in-process call; the hook lets these through.
    pub fn internal(inner: P) -> Self {
        Self {
            inner,
            provider: None,
            headers: HashMap::new(),
            authenticated: false,
            user: None,
        }
    }
}

impl<P> AuthenticateHookParams for AuthParams<P>
where
    P: Clone + Send + Sync,
{
    fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    fn authenticated(&self) -> bool {
        self.authenticated
    }

    fn set_user(&mut self, user: AuthUser) {
        self.user = Some(user);
        self.authenticated = true;
    }
}

/// `Authorization: Bearer <token>`; header names are matched case-insensitively.
pub fn extract_bearer_token(headers: &HashMap<String, String>) -> Option<String> {
    let v = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("authorization"))
        .map(|(_, v)| v.trim())?;
    let (scheme, token) = v.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Before hook requiring a valid access token on external calls.
pub struct AuthenticateHook {
    auth: Arc<AuthenticationService>,
}

impl AuthenticateHook {
    pub fn new(auth: Arc<AuthenticationService>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl<P> DeskBeforeHook<Value, P> for AuthenticateHook
where
    P: AuthenticateHookParams + 'static,
{
    async fn run(&self, ctx: &mut HookContext<Value, P>) -> Result<()> {
        if ctx.params.authenticated() {
            return Ok(());
        }

        let provider = ctx.params.provider().unwrap_or("");
        if provider.trim().is_empty() {
            // internal call
            return Ok(());
        }

        let token = extract_bearer_token(ctx.params.headers())
            .ok_or_else(|| DeskError::not_authenticated("Not authenticated").into_anyhow())?;

        let (user, _claims) = self
            .auth
            .verify_access_token(&token)
            .map_err(|e| {
                tracing::debug!(service = %ctx.service, error = %e, "access token rejected");
                e.into_anyhow()
            })?;

        ctx.params.set_user(user);
        Ok(())
    }
}
