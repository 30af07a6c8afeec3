//! Ollama-to-OpenAI API bridge
//!
//! Command-line host for the proxy server: loads configuration, starts one
//! server instance, and stops it on Ctrl-C.

use ollama_oai_bridge::core::config::{API_KEY_ENV, BASE_URL_ENV, Config};
use ollama_oai_bridge::core::constants::route;
use ollama_oai_bridge::core::logging::init_logging;
use ollama_oai_bridge::{ProxyServer, ServerConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Check for --help flag
    if std::env::args().any(|arg| arg == "--help") {
        print_help();
        return;
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config.log_level);

    let mut server = ProxyServer::new(config.server);

    // Print startup banner
    print_startup_banner(server.config());

    let addr = match server.start().await {
        Ok(addr) => addr,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    print_endpoints(&format!("http://{}", addr));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down");
    server.stop().await;
}

fn list_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}

/// Print startup banner with configuration
fn print_startup_banner(server: &ServerConfig) {
    println!("🚀 Ollama-to-OpenAI Bridge v{}", env!("CARGO_PKG_VERSION"));
    println!("✅ Configuration loaded successfully");
    println!("   Host: {}", server.host);
    println!("   Port: {}", server.port);
    println!("   Base URL: {}", server.base_url);
    println!(
        "   API Key: {}",
        if server.api_key.is_empty() {
            "(not configured)"
        } else {
            "***configured***"
        }
    );
    println!("   Capabilities: {}", list_or_none(&server.capabilities));
    println!("   Extra Models: {}", list_or_none(&server.extra_models));
    println!("   Request Timeout: {}s", server.request_timeout.as_secs());
    match server.stream_idle_timeout {
        Some(idle) => println!("   Stream Idle Timeout: {}s", idle.as_secs()),
        None => println!("   Stream Idle Timeout: disabled"),
    }
    println!();
}

fn print_endpoints(base: &str) {
    println!("Available endpoints:");
    println!("  - GET  {}{}          - List models (Ollama format)", base, route::API_TAGS);
    println!("  - POST {}{}          - Show model capabilities", base, route::API_SHOW);
    println!("  - GET  {}{}       - Get version info", base, route::API_VERSION);
    println!("  - GET  {}{}         - List models (OpenAI format)", base, route::V1_MODELS);
    println!("  - POST {}{} - Chat completions", base, route::V1_CHAT_COMPLETIONS);
    println!();
}

/// Print help message
fn print_help() {
    println!("Ollama-to-OpenAI Bridge v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: ollama-oai-bridge [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --help    Display this help message");
    println!();
    println!("Configuration is read from the TOML file named by CONFIG_PATH");
    println!("(default: config.toml).");
    println!();
    println!("[upstream]");
    println!("  api_key - Upstream API key (falls back to {})", API_KEY_ENV);
    println!("  base_url - Upstream base URL (falls back to {})", BASE_URL_ENV);
    println!("  request_timeout - Buffered call timeout in seconds (default: 60)");
    println!("  stream_idle_timeout - Max seconds between streamed chunks, 0 disables (default: 300)");
    println!();
    println!("[server]");
    println!("  host - Bind host (default: localhost)");
    println!("  port - Bind port (default: 11434)");
    println!("  log_level - Logging level (default: info, RUST_LOG overrides)");
    println!();
    println!("[models]");
    println!("  capabilities - Capabilities reported by /api/show after \"completion\"");
    println!("  extra - Model names always listed by /api/tags");
}
