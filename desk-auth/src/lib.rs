//! Authentication for the mediadesk console.
//!
//! One admin account (local strategy, bcrypt) exchanges credentials for a
//! signed JWT. [`AuthenticateHook`] guards services by checking the bearer
//! token on every external call.

mod error;

pub mod hooks;
pub mod jwt;
pub mod local;
pub mod options;
pub mod service;

pub use error::AuthError;
pub use hooks::{extract_bearer_token, AuthParams, AuthenticateHook, AuthenticateHookParams};
pub use jwt::{Claims, JwtIssuer};
pub use local::{hash_password, AuthUser, LocalStrategy, LoginRequest};
pub use options::{AuthOptions, JwtAlgorithm, JwtOptions, LocalOptions};
pub use service::AuthenticationService;
