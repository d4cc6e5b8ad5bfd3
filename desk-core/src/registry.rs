use std::collections::HashMap;
use std::sync::Arc;

use crate::DeskService;

/// Maps service names to service instances.
pub struct DeskServiceRegistry<R, P = ()>
where
    R: Send + 'static,
    P: Send + 'static,
{
    services: HashMap<String, Arc<dyn DeskService<R, P>>>,
}

impl<R, P> DeskServiceRegistry<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Register a service under a given name, replacing any previous one.
    pub fn register<S>(&mut self, name: S, service: Arc<dyn DeskService<R, P>>)
    where
        S: Into<String>,
    {
        self.services.insert(name.into(), service);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn DeskService<R, P>>> {
        self.services.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(|k| k.as_str())
    }
}

impl<R, P> Default for DeskServiceRegistry<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
