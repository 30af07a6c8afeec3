//! Constants for routes, wire values, and timeouts
//!
//! This module defines the fixed strings both dialects agree on: inbound route
//! paths, upstream endpoint suffixes, CORS header values, and the synthetic
//! values the local dialect reports about itself.

/// Inbound route paths
pub mod route {
    /// Ollama-style model listing
    pub const API_TAGS: &str = "/api/tags";

    /// Ollama-style model descriptor
    pub const API_SHOW: &str = "/api/show";

    /// Ollama-style version probe
    pub const API_VERSION: &str = "/api/version";

    /// OpenAI-style model listing
    pub const V1_MODELS: &str = "/v1/models";

    /// OpenAI-style chat completions
    pub const V1_CHAT_COMPLETIONS: &str = "/v1/chat/completions";
}

/// Upstream endpoint suffixes, joined onto the configured base URL
pub mod upstream {
    /// Model listing endpoint
    pub const MODELS: &str = "models";

    /// Chat completions endpoint
    pub const CHAT_COMPLETIONS: &str = "chat/completions";
}

/// CORS header values attached to every response
pub mod cors {
    pub const ALLOW_ORIGIN: &str = "*";
    pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
    pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";
}

/// Values the local dialect synthesizes
pub mod local {
    /// Version reported by `/api/version`
    pub const VERSION: &str = "0.11.4";

    /// Architecture reported by `/api/show`
    pub const ARCHITECTURE: &str = "CausalLM";

    /// Key under `model_info` carrying the architecture
    pub const ARCHITECTURE_KEY: &str = "general.architecture";

    /// Capability every model reports, always listed first
    pub const COMPLETION_CAPABILITY: &str = "completion";
}

/// Streaming response header values
pub mod stream {
    pub const CONTENT_TYPE: &str = "text/event-stream";
    pub const CACHE_CONTROL: &str = "no-cache";
    pub const CONNECTION: &str = "keep-alive";

    /// Chunks buffered between the upstream reader and the response body
    pub const CHANNEL_CAPACITY: usize = 32;
}

/// Error message used for unmatched routes
pub const NOT_FOUND_MESSAGE: &str = "Not found";

/// Seconds `stop` waits for in-flight requests before abandoning them
pub const SHUTDOWN_GRACE_SECS: u64 = 5;
