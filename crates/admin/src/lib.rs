//! Smartcartify Admin library.
//!
//! Backend of the embedded Shopify admin app: rule persistence, Shopify
//! discount synchronization, the OAuth install flow and the storefront app
//! proxy. Exposed as a library so the CLI and tests can drive it.
//!
//! # Security
//!
//! Holds every installed shop's offline Admin API token. Tokens are only read
//! from the `sessions` table when a request for that shop needs them.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
pub mod sync;
