//! # Chrysalis CLI Module
//!
//! This module implements the CLI interface for Chrysalis.
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `status` - Show engine status
//! - `init` - Initialize an identity's trait record
//! - `evolve` - Append a new history entry for an eligible identity
//! - `pin` - Pin the displayed history index
//! - `show` - Show an identity's record (latest or at an index)
//! - `uri` - Resolve an identity's token URI
//! - `stake` - Record a stake-oracle balance report

mod commands;

use chrysalis_core::ChrysalisError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Chrysalis - Trait-Evolution Server
///
/// A stake-gated, append-only trait record store. Records evolve only
/// when the externally reported stake balance has grown past the
/// configured threshold; display can be pinned to any historical version.
#[derive(Parser, Debug)]
#[command(name = "chrysalis")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the trait ledger database
    #[arg(short = 'D', long, global = true, default_value = "chrysalis.redb")]
    pub database: PathBuf,

    /// Path to the TOML configuration file
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Show engine status
    Status,

    /// Initialize an identity's trait record
    Init {
        /// Identity id
        #[arg(short, long)]
        id: u64,

        /// Gender code
        #[arg(short, long, default_value = "0")]
        gender: u8,

        /// Skin code
        #[arg(short, long, default_value = "0")]
        skin: u8,

        /// Genetic payload (base-10 unsigned integer)
        #[arg(short, long, default_value = "0")]
        dna: String,

        /// Caller principal (defaults to the configured controller)
        #[arg(long)]
        caller: Option<String>,
    },

    /// Append a new history entry for an eligible identity
    Evolve {
        /// Identity id
        #[arg(short, long)]
        id: u64,

        /// Caller principal (defaults to the configured controller)
        #[arg(long)]
        caller: Option<String>,
    },

    /// Pin the displayed history index
    Pin {
        /// Identity id
        #[arg(short, long)]
        id: u64,

        /// History index to pin (1-based)
        #[arg(short = 'n', long)]
        index: u32,

        /// Caller principal (defaults to the configured controller)
        #[arg(long)]
        caller: Option<String>,
    },

    /// Show an identity's record
    Show {
        /// Identity id
        #[arg(short, long)]
        id: u64,

        /// Specific history index (defaults to the latest entry)
        #[arg(short = 'n', long)]
        index: Option<u32>,
    },

    /// Resolve an identity's token URI
    Uri {
        /// Identity id
        #[arg(short, long)]
        id: u64,
    },

    /// Record a stake-oracle balance report
    Stake {
        /// Identity id
        #[arg(short, long)]
        id: u64,

        /// Reported balance (base-10 unsigned integer)
        #[arg(short, long)]
        amount: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ChrysalisError> {
    let database = cli.database;
    let config = cli.config.as_deref();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            cmd_serve(&database, config, &host, port).await
        }
        Some(Commands::Status) => cmd_status(&database, config, json_mode),
        Some(Commands::Init {
            id,
            gender,
            skin,
            dna,
            caller,
        }) => cmd_init(&database, config, json_mode, id, gender, skin, &dna, caller),
        Some(Commands::Evolve { id, caller }) => {
            cmd_evolve(&database, config, json_mode, id, caller)
        }
        Some(Commands::Pin { id, index, caller }) => {
            cmd_pin(&database, config, json_mode, id, index, caller)
        }
        Some(Commands::Show { id, index }) => cmd_show(&database, config, json_mode, id, index),
        Some(Commands::Uri { id }) => cmd_uri(&database, config, json_mode, id),
        Some(Commands::Stake { id, amount }) => cmd_stake(&database, json_mode, id, &amount),
        None => {
            // No subcommand - show status by default
            cmd_status(&database, config, json_mode)
        }
    }
}
