//! HTTP surface of the proxy
//!
//! Route handlers, the error envelope, and the middleware every response
//! passes through.

pub mod endpoints;
pub mod error;
pub mod middleware;
