//! desk-axum: Axum adapter for mediadesk.
//!
//! Mounts [`desk_core::DeskService`]s as REST routes, turns `DeskError`s
//! into JSON error bodies, and ships the multipart-to-JSON upload layer.

pub mod app;
pub mod middlewares;
pub mod params;
pub mod rest;
pub mod state;
mod error;
pub use error::DeskAxumError;
pub use state::DeskAxumState;

pub use app::{axum, AxumApp};
