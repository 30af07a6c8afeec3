//! Ollama-to-OpenAI API bridge
//!
//! Serves the Ollama wire contract on a local socket and forwards all
//! inference work to a remote OpenAI-compatible upstream.

pub mod api;
pub mod conversion;
pub mod core;
pub mod models;

pub use crate::core::config::{Config, ServerConfig};
pub use crate::core::server::{ProxyServer, ServerError};
