//! Middleware modules for the ICMS API
//!
//! - `auth`: Authentication middleware and the typed `AuthExtractor`
//! - `rate_limit`: Per-IP and per-user rate limiting
//! - `request_id`: Request id propagation into response envelopes
//!
//! # Middleware Order
//!
//! When applying middleware, order matters. Protected routes put the rate
//! limiter inside auth so quotas are keyed by user id:
//!
//! ```ignore
//! Router::new()
//!     .route("/admin/dashboard/overview", get(handler))
//!     // Innermost: sees the AuthContext inserted by auth
//!     .layer(middleware::from_fn_with_state(rate_limit_state, rate_limit_middleware))
//!     .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
//!     // Outermost: error envelopes from auth carry the request id too
//!     .layer(middleware::from_fn(request_id_middleware))
//! ```
//!
//! Public routes get the rate limiter alone and are keyed by client IP.

mod auth;
mod rate_limit;
mod request_id;

pub use auth::{
    auth_middleware, extract_auth_context, AuthExtractor, AuthMiddlewareError,
    AuthMiddlewareState,
};
pub use rate_limit::{
    extract_client_ip, rate_limit_middleware, RateLimitError, RateLimitKey, RateLimitState,
};
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};
