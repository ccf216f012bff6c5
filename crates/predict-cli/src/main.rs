//! Project Insights prediction CLI
//!
//! A command-line client for the cost estimation and time delay
//! prediction service.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::predict;
use std::path::PathBuf;

/// Project Insights prediction CLI
#[derive(Parser)]
#[command(name = "predict")]
#[command(author, version, about = "CLI for the Project Insights prediction service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via PREDICT_API_URL env var)
    #[arg(long, env = "PREDICT_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the service is up and show per-model health
    Health,

    /// Predict the actual cost of construction projects
    Cost {
        /// JSON file with one array per field ("-" reads stdin)
        #[arg(long)]
        file: PathBuf,
    },

    /// Predict logistics time delay in hours
    Delay {
        /// JSON file with one array per field ("-" reads stdin)
        #[arg(long)]
        file: PathBuf,
    },

    /// Print an example request payload
    Example {
        /// Which model's payload to print
        #[arg(value_enum)]
        model: predict::ModelArg,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Example { model } => {
            predict::show_example(model.into())?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&cli.api_url)?;
            predict::show_health(&client, cli.format).await?;
        }
        Commands::Cost { file } => {
            let client = client::ApiClient::new(&cli.api_url)?;
            predict::run_prediction(&client, predict::ModelArg::Cost.into(), &file, cli.format)
                .await?;
        }
        Commands::Delay { file } => {
            let client = client::ApiClient::new(&cli.api_url)?;
            predict::run_prediction(&client, predict::ModelArg::Delay.into(), &file, cli.format)
                .await?;
        }
    }

    Ok(())
}
