mod aws;
mod commands;
mod config;
mod context;
mod model;
mod output;
mod terraform;
mod traits;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{ExportCommand, ListCommand};
use context::Context;

#[derive(Parser)]
#[command(name = "bucketform")]
#[command(about = "Reconstructs existing S3 buckets as Terraform configuration", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect every bucket in the account and write Terraform code for it
    Export {
        /// Path of the generated Terraform file (defaults to s3_buckets.tf)
        #[arg(short, long)]
        output: Option<String>,

        /// AWS region for the client (defaults to the SDK credential chain)
        #[arg(long, env = "BUCKETFORM_REGION")]
        region: Option<String>,

        /// Maximum number of buckets inspected in parallel
        #[arg(long)]
        concurrency: Option<usize>,

        /// Path to a configuration file (defaults to .bucketform.yaml if present)
        #[arg(short, long)]
        config: Option<String>,
    },

    /// List detected buckets and their resolved regions
    List {
        /// AWS region for the client (defaults to the SDK credential chain)
        #[arg(long, env = "BUCKETFORM_REGION")]
        region: Option<String>,

        /// Path to a configuration file (defaults to .bucketform.yaml if present)
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = Context::new();

    match cli.command {
        Commands::Export {
            output,
            region,
            concurrency,
            config,
        } => {
            ExportCommand::execute(
                &ctx,
                output.as_deref(),
                region.as_deref(),
                concurrency,
                config.as_deref(),
            )?;
        }
        Commands::List { region, config } => {
            ListCommand::execute(&ctx, region.as_deref(), config.as_deref())?;
        }
    }

    Ok(())
}
