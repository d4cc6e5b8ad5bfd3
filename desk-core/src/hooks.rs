//! # Hooks
//!
//! Hooks wrap every service call made through a [`ServiceHandle`]:
//!
//! ```text
//! around(outermost) → … → around(innermost)
//!     before… → service method → after…
//! error hooks run once if anything above failed
//! ```
//!
//! Global hooks (`app.hooks(..)`) run before service hooks
//! (`app.service("files")?.hooks(..)`).
//!
//! [`ServiceHandle`]: crate::ServiceHandle

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::{DeskConfigSnapshot, ServiceMethodKind};

/// What a service call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum HookResult<R> {
    One(R),
    Many(Vec<R>),
}

/// Mutable state shared by every hook of a single call.
///
/// R = record type
/// P = params type (provider, headers, query, ...)
#[derive(Debug)]
pub struct HookContext<R, P> {
    pub service: String,
    pub method: ServiceMethodKind,
    pub id: Option<String>,
    pub params: P,
    /// Input payload for create/patch. Before hooks may rewrite it.
    pub data: Option<R>,
    /// Output. Set by the service; after hooks may rewrite it.
    pub result: Option<HookResult<R>>,
    /// Set while error hooks run. Clearing it recovers the call.
    pub error: Option<anyhow::Error>,
    pub config: DeskConfigSnapshot,
}

impl<R, P> HookContext<R, P> {
    pub fn new(
        service: impl Into<String>,
        method: ServiceMethodKind,
        params: P,
        config: DeskConfigSnapshot,
    ) -> Self {
        Self {
            service: service.into(),
            method,
            id: None,
            params,
            data: None,
            result: None,
            error: None,
            config,
        }
    }
}

pub type HookFut<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

type NextFn<R, P> = Box<dyn for<'a> FnOnce(&'a mut HookContext<R, P>) -> HookFut<'a> + Send>;

/// The rest of the pipeline, handed to around hooks.
pub struct Next<R, P> {
    call: NextFn<R, P>,
}

impl<R, P> Next<R, P> {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> FnOnce(&'a mut HookContext<R, P>) -> HookFut<'a> + Send + 'static,
    {
        Self { call: Box::new(f) }
    }

    pub async fn run(self, ctx: &mut HookContext<R, P>) -> Result<()> {
        (self.call)(ctx).await
    }
}

#[async_trait]
pub trait DeskAroundHook<R, P>: Send + Sync
where
    R: Send + 'static,
    P: Send + 'static,
{
    async fn run(&self, ctx: &mut HookContext<R, P>, next: Next<R, P>) -> Result<()>;
}

#[async_trait]
pub trait DeskBeforeHook<R, P>: Send + Sync
where
    R: Send + 'static,
    P: Send + 'static,
{
    async fn run(&self, ctx: &mut HookContext<R, P>) -> Result<()>;
}

#[async_trait]
pub trait DeskAfterHook<R, P>: Send + Sync
where
    R: Send + 'static,
    P: Send + 'static,
{
    async fn run(&self, ctx: &mut HookContext<R, P>) -> Result<()>;
}

/// Runs with `ctx.error` set. Errors returned from here are ignored.
#[async_trait]
pub trait DeskErrorHook<R, P>: Send + Sync
where
    R: Send + 'static,
    P: Send + 'static,
{
    async fn run(&self, ctx: &mut HookContext<R, P>) -> Result<()>;
}

type HookMap<H> = HashMap<ServiceMethodKind, Vec<Arc<H>>>;

/// Hook registrations for the app or for a single service.
pub struct ServiceHooks<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    pub(crate) around_all: Vec<Arc<dyn DeskAroundHook<R, P>>>,
    pub(crate) around_by_method: HookMap<dyn DeskAroundHook<R, P>>,
    pub(crate) before_all: Vec<Arc<dyn DeskBeforeHook<R, P>>>,
    pub(crate) before_by_method: HookMap<dyn DeskBeforeHook<R, P>>,
    pub(crate) after_all: Vec<Arc<dyn DeskAfterHook<R, P>>>,
    pub(crate) after_by_method: HookMap<dyn DeskAfterHook<R, P>>,
    pub(crate) error_all: Vec<Arc<dyn DeskErrorHook<R, P>>>,
    pub(crate) error_by_method: HookMap<dyn DeskErrorHook<R, P>>,
}

impl<R, P> Default for ServiceHooks<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, P> ServiceHooks<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            around_all: Vec::new(),
            around_by_method: HashMap::new(),
            before_all: Vec::new(),
            before_by_method: HashMap::new(),
            after_all: Vec::new(),
            after_by_method: HashMap::new(),
            error_all: Vec::new(),
            error_by_method: HashMap::new(),
        }
    }

    pub fn around_all(&mut self, hook: Arc<dyn DeskAroundHook<R, P>>) -> &mut Self {
        self.around_all.push(hook);
        self
    }

    pub fn around(
        &mut self,
        method: ServiceMethodKind,
        hook: Arc<dyn DeskAroundHook<R, P>>,
    ) -> &mut Self {
        self.around_by_method.entry(method).or_default().push(hook);
        self
    }

    pub fn before_all(&mut self, hook: Arc<dyn DeskBeforeHook<R, P>>) -> &mut Self {
        self.before_all.push(hook);
        self
    }

    pub fn before(
        &mut self,
        method: ServiceMethodKind,
        hook: Arc<dyn DeskBeforeHook<R, P>>,
    ) -> &mut Self {
        self.before_by_method.entry(method).or_default().push(hook);
        self
    }

    pub fn after_all(&mut self, hook: Arc<dyn DeskAfterHook<R, P>>) -> &mut Self {
        self.after_all.push(hook);
        self
    }

    pub fn after(
        &mut self,
        method: ServiceMethodKind,
        hook: Arc<dyn DeskAfterHook<R, P>>,
    ) -> &mut Self {
        self.after_by_method.entry(method).or_default().push(hook);
        self
    }

    pub fn error_all(&mut self, hook: Arc<dyn DeskErrorHook<R, P>>) -> &mut Self {
        self.error_all.push(hook);
        self
    }

    pub fn error(
        &mut self,
        method: ServiceMethodKind,
        hook: Arc<dyn DeskErrorHook<R, P>>,
    ) -> &mut Self {
        self.error_by_method.entry(method).or_default().push(hook);
        self
    }
}

/// `*_all` hooks first, then the ones registered for `method`.
pub(crate) fn collect_method_hooks<H: ?Sized>(
    all: &[Arc<H>],
    by_method: &HookMap<H>,
    method: &ServiceMethodKind,
) -> Vec<Arc<H>> {
    let mut out: Vec<Arc<H>> = all.to_vec();
    if let Some(v) = by_method.get(method) {
        out.extend(v.iter().cloned());
    }
    out
}
