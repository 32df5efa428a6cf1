use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;

use outpost_core::applescript::{OutlookAutomation, OutlookRunner};
use outpost_core::tools::{outlook_tools, ToolExecutor, ToolRegistry};

#[derive(Parser)]
#[command(name = "outpost")]
#[command(version)]
#[command(about = "Outpost — drive Microsoft Outlook mail, calendar, and contacts from the command line")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available tools and their input schemas
    Tools,

    /// Run one tool with a JSON input payload
    Run {
        /// Tool name, e.g. read_emails
        tool: String,

        /// JSON object with the tool's parameters
        #[arg(short, long, default_value = "{}")]
        input: String,
    },

    /// Check that Outlook is installed and reachable
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Tools => cmd_tools(),
        Commands::Run { tool, input } => cmd_run(&tool, &input).await,
        Commands::Check => cmd_check().await,
    }
}

fn registry() -> Result<ToolRegistry> {
    let policy = config::attachment_policy_from_env()?;
    let runner: Arc<dyn OutlookAutomation> = Arc::new(OutlookRunner);
    Ok(outlook_tools(runner, policy))
}

fn cmd_tools() -> Result<()> {
    let registry = registry()?;
    println!("{}", serde_json::to_string_pretty(&registry.list_tools())?);
    Ok(())
}

async fn cmd_run(tool: &str, input: &str) -> Result<()> {
    let registry = registry()?;
    let input: serde_json::Value = serde_json::from_str(input)
        .map_err(|e| anyhow::anyhow!("--input is not valid JSON: {e}"))?;

    // Failures come back as error-flagged text, never a crash: the caller
    // on the other side of stdout is a dispatch layer, not a human.
    match registry.execute(tool, input).await {
        Ok(payload) => println!("{payload}"),
        Err(e) => println!("Error: {e:#}"),
    }
    Ok(())
}

async fn cmd_check() -> Result<()> {
    let runner = OutlookRunner;
    runner.ensure_ready().await?;
    println!("Microsoft Outlook is reachable");
    Ok(())
}
