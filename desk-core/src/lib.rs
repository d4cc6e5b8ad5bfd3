//! desk-core: transport-agnostic core for mediadesk.
//!
//! Services are registered on a [`DeskApp`] by name and called through a
//! hook pipeline (around → before → service → after, then error hooks).
//! Transports such as `desk-axum` only ever talk to the app.

pub mod app;
pub mod config;
pub mod errors;
pub mod hooks;
pub mod registry;
pub mod service;

pub use app::{DeskApp, ServiceHandle};
pub use config::{DeskConfig, DeskConfigSnapshot};
pub use errors::{DeskError, ErrorKind};
pub use hooks::{
    DeskAfterHook, DeskAroundHook, DeskBeforeHook, DeskErrorHook, HookContext, HookResult, Next,
    ServiceHooks,
};
pub use registry::DeskServiceRegistry;
pub use service::{DeskService, ServiceCapabilities, ServiceMethodKind};
