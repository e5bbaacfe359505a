//! Binary entry point: serve the built-in tools over stdio.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use swarms_tools::config::Settings;
use swarms_tools::mcp::McpServer;
use swarms_tools::tools::builtin;

#[derive(Parser, Debug)]
#[command(name = "swarms-tools", version, about = "Market data tools served over the Model Context Protocol")]
struct Args {
    /// Default log filter; RUST_LOG takes precedence.
    #[arg(long, default_value = "swarms_tools=info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout belongs to the JSON-RPC transport.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env()?;
    let registry = builtin::default_registry(&settings)?;
    tracing::info!(tools = registry.len(), "serving tools over stdio");

    McpServer::new(Arc::new(registry)).serve_stdio().await?;
    Ok(())
}
