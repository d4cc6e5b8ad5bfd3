use std::sync::Arc;

use desk_core::DeskApp;

/// Router state for one mounted service.
pub struct DeskAxumState<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    pub app: DeskApp<R, P>,
    pub service: Arc<str>,
}

impl<R, P> Clone for DeskAxumState<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
            service: Arc::clone(&self.service),
        }
    }
}

impl<R, P> DeskAxumState<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    pub fn new(app: DeskApp<R, P>, service: impl Into<Arc<str>>) -> Self {
        Self {
            app,
            service: service.into(),
        }
    }
}
