use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;

use crate::hooks::collect_method_hooks;
use crate::{
    DeskAfterHook, DeskAroundHook, DeskBeforeHook, DeskConfig, DeskConfigSnapshot, DeskError,
    DeskErrorHook, DeskService, DeskServiceRegistry, HookContext, HookResult, Next,
    ServiceCapabilities, ServiceHooks, ServiceMethodKind,
};

struct DeskAppInner<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    registry: RwLock<DeskServiceRegistry<R, P>>,
    global_hooks: RwLock<ServiceHooks<R, P>>,
    service_hooks: RwLock<HashMap<String, ServiceHooks<R, P>>>,
    config: RwLock<DeskConfig>,
}

/// Central application container.
///
/// Framework-agnostic. Holds:
/// - service registry
/// - app hooks
/// - per-service hooks
/// - config
pub struct DeskApp<R, P = ()>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    inner: Arc<DeskAppInner<R, P>>,
}

type HooksForMethod<R, P> = (
    Vec<Arc<dyn DeskAroundHook<R, P>>>,
    Vec<Arc<dyn DeskBeforeHook<R, P>>>,
    Vec<Arc<dyn DeskAfterHook<R, P>>>,
    Vec<Arc<dyn DeskErrorHook<R, P>>>,
);

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl<R, P> Default for DeskApp<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, P> Clone for DeskApp<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, P> DeskApp<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DeskAppInner {
                registry: RwLock::new(DeskServiceRegistry::new()),
                global_hooks: RwLock::new(ServiceHooks::new()),
                service_hooks: RwLock::new(HashMap::new()),
                config: RwLock::new(DeskConfig::new()),
            }),
        }
    }

    pub fn register_service<S>(&self, name: S, service: Arc<dyn DeskService<R, P>>)
    where
        S: Into<String>,
    {
        write(&self.inner.registry).register(name, service);
    }

    /// Feathers: `app.hooks({ ... })`
    pub fn hooks<F>(&self, f: F)
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        let mut g = write(&self.inner.global_hooks);
        f(&mut g);
    }

    /// Feathers: `app.service("x").hooks({ ... })`
    pub(crate) fn configure_service_hooks<F>(&self, service_name: &str, f: F)
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        let mut map = write(&self.inner.service_hooks);
        let hooks = map.entry(service_name.to_string()).or_default();
        f(hooks);
    }

    /// Feathers: `app.service("name")`
    pub fn service(&self, name: &str) -> Result<ServiceHandle<R, P>> {
        let svc = read(&self.inner.registry)
            .get(name)
            .cloned()
            .ok_or_else(|| {
                DeskError::not_found(format!("Service not found: {name}")).into_anyhow()
            })?;

        Ok(ServiceHandle {
            app: self.clone(),
            name: name.to_string(),
            service: svc,
        })
    }

    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.inner.registry)
            .names()
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    /// Feathers: `app.set(key, value)`
    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        write(&self.inner.config).set(key, value);
    }

    /// Feathers: `app.get(key)`
    pub fn get(&self, key: &str) -> Option<String> {
        read(&self.inner.config).get(key).map(|v| v.to_string())
    }

    /// Overlay `{prefix}A__B` environment variables as `a.b`.
    pub fn load_env(&self, prefix: &str) -> usize {
        write(&self.inner.config).load_env(prefix)
    }

    pub fn config_snapshot(&self) -> DeskConfigSnapshot {
        read(&self.inner.config).snapshot()
    }
}

pub struct ServiceHandle<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    app: DeskApp<R, P>,
    name: String,
    service: Arc<dyn DeskService<R, P>>,
}

impl<R, P> ServiceHandle<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn hooks<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        self.app.configure_service_hooks(&self.name, f);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> ServiceCapabilities {
        self.service.capabilities()
    }

    pub fn inner(&self) -> &Arc<dyn DeskService<R, P>> {
        &self.service
    }
}

// ──────────────────────────────────────────────────────────────
// Pipeline
// ──────────────────────────────────────────────────────────────

enum Call {
    Find,
    Get(String),
    Create,
    Patch(Option<String>),
    Remove(Option<String>),
}

impl Call {
    fn method(&self) -> ServiceMethodKind {
        match self {
            Call::Find => ServiceMethodKind::Find,
            Call::Get(_) => ServiceMethodKind::Get,
            Call::Create => ServiceMethodKind::Create,
            Call::Patch(_) => ServiceMethodKind::Patch,
            Call::Remove(_) => ServiceMethodKind::Remove,
        }
    }

    fn id(&self) -> Option<String> {
        match self {
            Call::Get(id) => Some(id.clone()),
            Call::Patch(id) | Call::Remove(id) => id.clone(),
            Call::Find | Call::Create => None,
        }
    }
}

/// Calls the service and stores its output in `ctx.result`.
async fn invoke<R, P>(
    svc: &Arc<dyn DeskService<R, P>>,
    call: &Call,
    ctx: &mut HookContext<R, P>,
) -> Result<()>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    let params = ctx.params.clone();
    let result = match call {
        Call::Find => HookResult::Many(svc.find(params).await?),
        Call::Get(id) => HookResult::One(svc.get(id, params).await?),
        Call::Create => {
            let data = ctx
                .data
                .take()
                .ok_or_else(|| anyhow::anyhow!("create() requires ctx.data"))?;
            HookResult::One(svc.create(data, params).await?)
        }
        Call::Patch(id) => {
            let data = ctx
                .data
                .take()
                .ok_or_else(|| anyhow::anyhow!("patch() requires ctx.data"))?;
            HookResult::One(svc.patch(id.as_deref(), data, params).await?)
        }
        Call::Remove(id) => HookResult::One(svc.remove(id.as_deref(), params).await?),
    };
    ctx.result = Some(result);
    Ok(())
}

impl<R, P> ServiceHandle<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    /// Collect hooks in Feathers order:
    /// global first, then service.
    fn collect_hooks_for_method(&self, method: &ServiceMethodKind) -> HooksForMethod<R, P> {
        let g = read(&self.app.inner.global_hooks);
        let map = read(&self.app.inner.service_hooks);

        let mut around = collect_method_hooks(&g.around_all, &g.around_by_method, method);
        let mut before = collect_method_hooks(&g.before_all, &g.before_by_method, method);
        let mut after = collect_method_hooks(&g.after_all, &g.after_by_method, method);
        let mut error = collect_method_hooks(&g.error_all, &g.error_by_method, method);

        if let Some(h) = map.get(&self.name) {
            around.extend(collect_method_hooks(&h.around_all, &h.around_by_method, method));
            before.extend(collect_method_hooks(&h.before_all, &h.before_by_method, method));
            after.extend(collect_method_hooks(&h.after_all, &h.after_by_method, method));
            error.extend(collect_method_hooks(&h.error_all, &h.error_by_method, method));
        }

        (around, before, after, error)
    }

    /// around → before → service → after, then error hooks on failure.
    async fn run_pipeline(&self, call: Call, params: P, data: Option<R>) -> Result<HookResult<R>> {
        let method = call.method();
        let (around, before, after, error) = self.collect_hooks_for_method(&method);

        let mut ctx = HookContext::new(
            self.name.clone(),
            method,
            params,
            self.app.config_snapshot(),
        );
        ctx.id = call.id();
        ctx.data = data;

        let svc = self.service.clone();

        let mut next: Next<R, P> = Next::new(move |ctx| {
            Box::pin(async move {
                for h in &before {
                    h.run(ctx).await?;
                }

                invoke(&svc, &call, ctx).await?;

                for h in after.iter().rev() {
                    h.run(ctx).await?;
                }
                Ok(())
            })
        });

        // first registered around hook is the outermost
        for hook in around.into_iter().rev() {
            let prev = next;
            next = Next::new(move |ctx| {
                Box::pin(async move { hook.run(ctx, prev).await })
            });
        }

        if let Err(e) = next.run(&mut ctx).await {
            ctx.error = Some(e);

            for h in &error {
                let _ = h.run(&mut ctx).await;
            }

            if let Some(err) = ctx.error.take() {
                return Err(err);
            }
        }

        ctx.result
            .ok_or_else(|| anyhow::anyhow!("{}() produced no result", ctx.method.as_str()))
    }

    pub async fn find(&self, params: P) -> Result<Vec<R>> {
        match self.run_pipeline(Call::Find, params, None).await? {
            HookResult::Many(v) => Ok(v),
            HookResult::One(v) => Ok(vec![v]),
        }
    }

    pub async fn get(&self, id: &str, params: P) -> Result<R> {
        one(self.run_pipeline(Call::Get(id.to_string()), params, None).await?, "get")
    }

    pub async fn create(&self, data: R, params: P) -> Result<R> {
        one(self.run_pipeline(Call::Create, params, Some(data)).await?, "create")
    }

    pub async fn patch(&self, id: Option<&str>, data: R, params: P) -> Result<R> {
        let call = Call::Patch(id.map(str::to_string));
        one(self.run_pipeline(call, params, Some(data)).await?, "patch")
    }

    pub async fn remove(&self, id: Option<&str>, params: P) -> Result<R> {
        let call = Call::Remove(id.map(str::to_string));
        one(self.run_pipeline(call, params, None).await?, "remove")
    }
}

fn one<R>(result: HookResult<R>, method: &str) -> Result<R> {
    match result {
        HookResult::One(v) => Ok(v),
        HookResult::Many(_) => Err(anyhow::anyhow!(
            "{method}() produced HookResult::Many unexpectedly"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Echo;

    #[async_trait]
    impl DeskService<String, ()> for Echo {
        fn capabilities(&self) -> ServiceCapabilities {
            ServiceCapabilities::from_methods(vec![
                ServiceMethodKind::Find,
                ServiceMethodKind::Get,
                ServiceMethodKind::Create,
            ])
        }

        async fn find(&self, _params: ()) -> Result<Vec<String>> {
            Ok(vec!["a".into(), "b".into()])
        }

        async fn get(&self, id: &str, _params: ()) -> Result<String> {
            if id == "missing" {
                return Err(DeskError::not_found("nope").into_anyhow());
            }
            Ok(format!("got:{id}"))
        }

        async fn create(&self, data: String, _params: ()) -> Result<String> {
            Ok(format!("created:{data}"))
        }
    }

    struct Around(&'static str, Log);

    #[async_trait]
    impl DeskAroundHook<String, ()> for Around {
        async fn run(&self, ctx: &mut HookContext<String, ()>, next: Next<String, ()>) -> Result<()> {
            self.1.lock().unwrap().push(format!("{}:in", self.0));
            let res = next.run(ctx).await;
            self.1.lock().unwrap().push(format!("{}:out", self.0));
            res
        }
    }

    struct Upper;

    #[async_trait]
    impl DeskBeforeHook<String, ()> for Upper {
        async fn run(&self, ctx: &mut HookContext<String, ()>) -> Result<()> {
            if let Some(d) = ctx.data.as_mut() {
                *d = d.to_uppercase();
            }
            Ok(())
        }
    }

    struct Tag(Log);

    #[async_trait]
    impl DeskAfterHook<String, ()> for Tag {
        async fn run(&self, ctx: &mut HookContext<String, ()>) -> Result<()> {
            self.0.lock().unwrap().push(format!("after:{}", ctx.method.as_str()));
            Ok(())
        }
    }

    struct Recover;

    #[async_trait]
    impl DeskErrorHook<String, ()> for Recover {
        async fn run(&self, ctx: &mut HookContext<String, ()>) -> Result<()> {
            ctx.error = None;
            ctx.result = Some(HookResult::One("fallback".into()));
            Ok(())
        }
    }

    fn app() -> DeskApp<String, ()> {
        let app = DeskApp::new();
        app.register_service("echo", Arc::new(Echo));
        app
    }

    #[tokio::test]
    async fn around_hooks_nest_in_registration_order() {
        let app = app();
        let log: Log = Arc::default();
        app.hooks(|h| {
            h.around_all(Arc::new(Around("outer", log.clone())));
        });
        let svc = app
            .service("echo")
            .unwrap()
            .hooks(|h| {
                h.around_all(Arc::new(Around("inner", log.clone())));
                h.after_all(Arc::new(Tag(log.clone())));
            });

        let out = svc.find(()).await.unwrap();
        assert_eq!(out, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer:in", "inner:in", "after:find", "inner:out", "outer:out"]
        );
    }

    #[tokio::test]
    async fn before_hook_rewrites_data() {
        let app = app();
        let svc = app.service("echo").unwrap().hooks(|h| {
            h.before(ServiceMethodKind::Create, Arc::new(Upper));
        });

        assert_eq!(svc.create("cat.png".into(), ()).await.unwrap(), "created:CAT.PNG");
        assert_eq!(svc.get("x", ()).await.unwrap(), "got:x");
    }

    #[tokio::test]
    async fn errors_surface_unless_recovered() {
        let app = app();
        let svc = app.service("echo").unwrap();

        let err = svc.get("missing", ()).await.unwrap_err();
        assert_eq!(DeskError::normalize(err).kind, ErrorKind::NotFound);

        let err = svc.remove(Some("x"), ()).await.unwrap_err();
        assert_eq!(DeskError::normalize(err).kind, ErrorKind::MethodNotAllowed);

        let svc = svc.hooks(|h| {
            h.error(ServiceMethodKind::Get, Arc::new(Recover));
        });
        assert_eq!(svc.get("missing", ()).await.unwrap(), "fallback");
    }

    #[tokio::test]
    async fn unknown_service_is_not_found() {
        let app = app();
        assert!(app.service("nope").is_err());
        assert_eq!(app.service_names(), vec!["echo".to_string()]);
        assert!(!app.service("echo").unwrap().capabilities().allows(&ServiceMethodKind::Remove));
    }
}
