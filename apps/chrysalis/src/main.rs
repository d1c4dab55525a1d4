//! # Chrysalis - Trait-Evolution Server
//!
//! The main binary for the Chrysalis trait-evolution engine.
//!
//! This application provides:
//! - HTTP REST control plane (axum-based)
//! - CLI interface for record operations
//! - Stake-report plumbing for the external oracle boundary
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 apps/chrysalis (THE BINARY)                  │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌────────────────┐   │
//! │  │   CLI       │    │  HTTP API   │    │  Stake Reports │   │
//! │  │  (clap)     │    │  (axum)     │    │  (oracle feed) │   │
//! │  └──────┬──────┘    └──────┬──────┘    └───────┬────────┘   │
//! │         │                  │                   │            │
//! │         └──────────────────┼───────────────────┘            │
//! │                            ▼                                │
//! │                   ┌─────────────────┐                       │
//! │                   │ chrysalis-core  │                       │
//! │                   │  (THE LOGIC)    │                       │
//! │                   └─────────────────┘                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! chrysalis serve --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! chrysalis status
//! chrysalis stake --id 1 --amount 250
//! chrysalis init --id 1 --gender 1 --skin 3 --dna 81985529216486895
//! chrysalis evolve --id 1
//! chrysalis pin --id 1 --index 1
//! chrysalis uri --id 1
//! ```

use chrysalis::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — CHRYSALIS_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("CHRYSALIS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chrysalis=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Chrysalis startup banner.
fn print_banner() {
    println!(
        r#"
   ██████╗██╗  ██╗██████╗ ██╗   ██╗███████╗ █████╗ ██╗     ██╗███████╗
  ██╔════╝██║  ██║██╔══██╗╚██╗ ██╔╝██╔════╝██╔══██╗██║     ██║██╔════╝
  ██║     ███████║██████╔╝ ╚████╔╝ ███████╗███████║██║     ██║███████╗
  ██║     ██╔══██║██╔══██╗  ╚██╔╝  ╚════██║██╔══██║██║     ██║╚════██║
  ╚██████╗██║  ██║██║  ██║   ██║   ███████║██║  ██║███████╗██║███████║
   ╚═════╝╚═╝  ╚═╝╚═╝  ╚═╝   ╚═╝   ╚══════╝╚═╝  ╚═╝╚══════╝╚═╝╚══════╝

  Trait-Evolution Server v{}

  Stake-Gated • Append-Only • Auditable
"#,
        env!("CARGO_PKG_VERSION")
    );
}
