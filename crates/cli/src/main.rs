//! Styx CLI
//!
//! A command-line tool for resolving workloads to the Crossplane managed
//! resources they use, inspecting the network index and labelling matches.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{index, label, resolve, types};
use tracing_subscriber::EnvFilter;

/// Styx CLI
#[derive(Parser)]
#[command(name = "styx")]
#[command(author, version, about = "CLI for the Styx resource labeller", long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file (uses default if not specified)
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<String>,

    /// Output format (defaults to the config file setting, then table)
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the watched managed-resource types
    Types,

    /// Resolve a workload name to managed resources
    Resolve {
        /// Namespace or workload name to resolve
        target: String,

        /// Workload pod IP to match against resource addresses (repeatable)
        #[arg(long = "ip")]
        ips: Vec<String>,
    },

    /// Build and show the address to resource index
    Index {
        /// Only show these addresses (repeatable)
        #[arg(long = "ip")]
        ips: Vec<String>,
    },

    /// Merge labels into every resource matched for a target
    Label {
        /// Namespace or workload name to resolve
        target: String,

        /// Label to set, as key=value (repeatable)
        #[arg(long = "set", value_parser = label::parse_label, required = true)]
        labels: Vec<(String, String)>,

        /// Workload pod IP to match against resource addresses (repeatable)
        #[arg(long = "ip")]
        ips: Vec<String>,

        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let format = match cli.format {
        Some(format) => format,
        None => config::Config::load()?.output_format().unwrap_or_default(),
    };

    let command = match cli.command {
        Commands::Types => return types::list_types(format),
        command => command,
    };

    let client = config::kube_client(cli.kubeconfig.as_deref()).await?;
    let resolver = commands::resolver(client);

    match command {
        Commands::Types => {}
        Commands::Resolve { target, ips } => {
            resolve::resolve(&resolver, &target, &ips, format).await?;
        }
        Commands::Index { ips } => {
            index::show_index(&resolver, &ips, format).await?;
        }
        Commands::Label {
            target,
            labels,
            ips,
            dry_run,
        } => {
            label::label(&resolver, &target, labels, &ips, dry_run, format).await?;
        }
    }

    Ok(())
}
