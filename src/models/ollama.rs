//! Ollama API data models
//!
//! Response shapes the local dialect synthesizes. Only the fields Ollama
//! clients probe for are modelled.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of `/api/tags`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTag {
    pub name: String,
    pub model: String,
}

impl ModelTag {
    /// Entry whose display name equals its identifier
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            model: id,
        }
    }
}

/// `/api/tags` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagsResponse {
    pub models: Vec<ModelTag>,
}

/// `/api/show` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowResponse {
    pub model_info: BTreeMap<String, String>,
    pub capabilities: Vec<String>,
}

/// `/api/version` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Error envelope used for every synchronous failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
