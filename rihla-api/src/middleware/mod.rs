pub mod auth;

pub use auth::{bearer_user_middleware, optional_user_middleware, session_auth_middleware, SessionClaims, Viewer};
