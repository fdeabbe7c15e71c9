//! CLI Module
//!
//! Command-line interface for the relay and the ask service using Clap v4.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Tavily Agent - A2A web search relay
#[derive(Parser, Debug)]
#[command(name = "tavily-agent")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the A2A relay (default)
    Serve {
        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Start the question-answering service
    Ask {
        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Print the agent card as JSON
    Card,

    /// Show the effective configuration (secrets redacted)
    Config,
}

/// Main CLI entry point
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        None => commands::cmd_serve(config, None, None, cli.debug).await,
        Some(Commands::Serve { port, bind }) => {
            commands::cmd_serve(config, port, bind, cli.debug).await
        }
        Some(Commands::Ask { port, bind }) => commands::cmd_ask(config, port, bind, cli.debug).await,
        Some(Commands::Card) => commands::cmd_card(&config),
        Some(Commands::Config) => commands::cmd_config(&config),
    }
}
