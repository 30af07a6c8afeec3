//! API data models
//!
//! This module contains the typed shapes of the local dialect. Upstream
//! payloads stay as `serde_json::Value` or raw bytes.

pub mod ollama;
