//! ollama-relay: streaming HTTP relay for a local Ollama runtime
//!
//! Usage:
//!   ollama-relay              Serve on 0.0.0.0:$PORT (default 8000)
//!   ollama-relay version      Show version information
//!   ollama-relay help         Show this help message

use anyhow::{Context, Result};
use ollama_relay::{server, RelayConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None | Some("serve") => {}
        Some("version" | "--version" | "-V") => {
            println!("ollama-relay {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some("help" | "--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = RelayConfig::load();
    let (host, port) = config.runtime_address();
    info!(
        runtime_host = %host,
        runtime_port = port,
        default_model = %config.defaults.model,
        "Configuration loaded"
    );

    let (app, warmup) = server::build_app(&config).context("Failed to build relay")?;
    warmup.schedule();

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!(addr = %addr, "Listening for requests");

    server::serve(listener, app).await.context("Server error")?;
    Ok(())
}

fn print_usage() {
    println!(
        r#"ollama-relay: streaming HTTP relay for a local Ollama runtime

USAGE:
    ollama-relay [COMMAND]

COMMANDS:
    serve       Run the relay (default)
    version     Show version information
    help        Show this help message

ENVIRONMENT:
    PORT                          Listen port (default 8000)
    OLLAMA_HOST                   Runtime host (default http://127.0.0.1)
    OLLAMA_PORT                   Runtime port (default 11434; config.json ollama_port wins)
    OLLAMA_DEFAULT_MODEL          Model used when a request names none (default llama3)
    OLLAMA_DEFAULT_NUM_PREDICT    Default num_predict (default 512)
    OLLAMA_KEEP_ALIVE             Default keep_alive (default 5m)
    OLLAMA_WARM_MODELS            Comma-separated models to warm at startup
    OLLAMA_RELAY_CONFIG           Config file path (default config.json)
    OLLAMA_RELAY_AGENTS           Agent registry path (default agents.json)
    OLLAMA_RELAY_STATIC_DIR       Front-end asset directory (default static)
    RUST_LOG                      Log filter (default info)"#
    );
}
