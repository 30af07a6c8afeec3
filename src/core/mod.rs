//! Core application modules
//!
//! This module contains configuration, constants, logging, the upstream
//! client, and the proxy server lifecycle.

pub mod client;
pub mod config;
pub mod constants;
pub mod logging;
pub mod server;
pub mod upstream;
