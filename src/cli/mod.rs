//! CLI module for the Organizze Gateway
//!
//! - `serve`: run the HTTP gateway
//! - `config`: print the effective configuration with secrets hidden

pub mod serve;

use clap::{Parser, Subcommand};

/// Organizze Gateway - cached, authenticated access to the Organizze API
#[derive(Parser)]
#[command(name = "organizze-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP gateway
    Serve(serve::ServeArgs),

    /// Print the effective configuration
    Config,
}
