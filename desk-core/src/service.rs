use anyhow::Result;
use async_trait::async_trait;

use crate::errors::DeskError;

/// Standard service methods, similar to Feathers:
/// find, get, create, patch, remove.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceMethodKind {
    Find,
    Get,
    Create,
    Patch,
    Remove,
    Custom(&'static str),
}

impl ServiceMethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMethodKind::Find => "find",
            ServiceMethodKind::Get => "get",
            ServiceMethodKind::Create => "create",
            ServiceMethodKind::Patch => "patch",
            ServiceMethodKind::Remove => "remove",
            ServiceMethodKind::Custom(name) => name,
        }
    }
}

/// Capabilities describe which methods a service exposes to transports.
///
/// Adapters (like desk-axum) use this to mount only allowed routes.
#[derive(Debug, Clone)]
pub struct ServiceCapabilities {
    pub allowed_methods: Vec<ServiceMethodKind>,
}

impl ServiceCapabilities {
    /// find, get, create, patch, remove
    pub fn standard_crud() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find, Get, Create, Patch, Remove],
        }
    }

    pub fn from_methods(methods: Vec<ServiceMethodKind>) -> Self {
        Self {
            allowed_methods: methods,
        }
    }

    pub fn allows(&self, method: &ServiceMethodKind) -> bool {
        self.allowed_methods.contains(method)
    }
}

fn not_implemented(method: &str) -> anyhow::Error {
    DeskError::method_not_allowed(format!("Method not implemented: {method}")).into_anyhow()
}

/// Core service trait, inspired by FeathersJS:
///
/// - `find`   → list/query many
/// - `get`    → fetch one by id
/// - `create` → create one
/// - `patch`  → partial update
/// - `remove` → delete one
///
/// Every method defaults to a `MethodNotAllowed` error, so a service only
/// overrides what it supports.
#[async_trait]
pub trait DeskService<R, P = ()>: Send + Sync
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::standard_crud()
    }

    async fn find(&self, _params: P) -> Result<Vec<R>> {
        Err(not_implemented("find"))
    }

    async fn get(&self, _id: &str, _params: P) -> Result<R> {
        Err(not_implemented("get"))
    }

    async fn create(&self, _data: R, _params: P) -> Result<R> {
        Err(not_implemented("create"))
    }

    async fn patch(&self, _id: Option<&str>, _data: R, _params: P) -> Result<R> {
        Err(not_implemented("patch"))
    }

    async fn remove(&self, _id: Option<&str>, _params: P) -> Result<R> {
        Err(not_implemented("remove"))
    }
}
