use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use desk_core::{DeskApp, DeskAroundHook, DeskError, DeskErrorHook, HookContext, Next};
use serde_json::Value;

use crate::services::DeskParams;

/// Logs every service call with its duration.
pub struct TraceAround;

#[async_trait]
impl DeskAroundHook<Value, DeskParams> for TraceAround {
    async fn run(
        &self,
        ctx: &mut HookContext<Value, DeskParams>,
        next: Next<Value, DeskParams>,
    ) -> Result<()> {
        let started = Instant::now();
        let res = next.run(ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &res {
            Ok(()) => tracing::info!(
                service = %ctx.service,
                method = ctx.method.as_str(),
                id = ctx.id.as_deref().unwrap_or(""),
                elapsed_ms,
                "service call"
            ),
            Err(_) => tracing::debug!(
                service = %ctx.service,
                method = ctx.method.as_str(),
                elapsed_ms,
                "service call failed"
            ),
        }
        res
    }
}

/// Client errors at warn, server errors at error.
pub struct LogErrors;

#[async_trait]
impl DeskErrorHook<Value, DeskParams> for LogErrors {
    async fn run(&self, ctx: &mut HookContext<Value, DeskParams>) -> Result<()> {
        let Some(err) = &ctx.error else {
            return Ok(());
        };
        let code = err
            .chain()
            .find_map(|e| e.downcast_ref::<DeskError>())
            .map(DeskError::code)
            .unwrap_or(500);

        if code >= 500 {
            tracing::error!(service = %ctx.service, method = ctx.method.as_str(), code, error = %err, "service error");
        } else {
            tracing::warn!(service = %ctx.service, method = ctx.method.as_str(), code, error = %err, "service error");
        }
        Ok(())
    }
}

pub fn global_hooks(app: &DeskApp<Value, DeskParams>) {
    app.hooks(|h| {
        h.around_all(Arc::new(TraceAround));
        h.error_all(Arc::new(LogErrors));
    });
}
