mod auth;

pub use auth::{require_access_token, require_refresh_token};
