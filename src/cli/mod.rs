//! CLI module for Warden
//!
//! Command-line interface definitions and handlers for the Warden
//! control server.
//!
//! # Commands
//!
//! - `serve` - Start the Warden server
//! - `endpoints` - Inspect and probe configured cluster endpoints
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start server with default config
//! warden serve
//!
//! # List configured endpoints
//! warden endpoints list --json
//!
//! # Probe one endpoint's credentials and reachability
//! warden endpoints test pve-main
//!
//! # Generate shell completions
//! warden completions bash > ~/.bash_completion.d/warden
//! ```

pub mod completions;
pub mod config;
pub mod endpoints;
pub mod output;
pub mod serve;

pub use completions::handle_completions;
pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Warden - Multi-cluster virtualization control core
#[derive(Parser, Debug)]
#[command(
    name = "warden",
    version,
    about = "Multi-cluster virtualization control core"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Warden server
    Serve(ServeArgs),
    /// Inspect and probe configured endpoints
    #[command(subcommand)]
    Endpoints(EndpointsCommands),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "warden.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "WARDEN_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "WARDEN_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "WARDEN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Disable state polling
    #[arg(long)]
    pub no_poller: bool,

    /// Disable alert evaluation
    #[arg(long)]
    pub no_alerts: bool,
}

#[derive(Subcommand, Debug)]
pub enum EndpointsCommands {
    /// List configured endpoints
    List(EndpointsListArgs),
    /// Authenticate against one endpoint and probe its version endpoint
    Test(EndpointsTestArgs),
}

#[derive(Args, Debug)]
pub struct EndpointsListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "warden.toml")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct EndpointsTestArgs {
    /// Endpoint id to probe
    pub id: String,

    /// Path to configuration file
    #[arg(short, long, default_value = "warden.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "warden.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
