//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (recorded on the span and the Sentry scope)
//!
//! Embedded admin routes also take a [`SessionShop`] extractor, which
//! verifies the App Bridge session token.

pub mod request_id;
pub mod session_token;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session_token::{SessionClaims, SessionShop, verify_session_token};
