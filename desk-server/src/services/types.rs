use desk_auth::AuthParams;
use desk_axum::params::RestParams;

/// REST params plus authentication state.
pub type DeskParams = AuthParams<RestParams>;
