use anyhow::{anyhow, Result};
use clap::Parser;
use component_forge::client::ForgeClient;
use component_forge::codec::OutputFormat;
use component_forge::scrape::HttpPageFetcher;
use component_forge::{Analyzer, Config, Dispatcher, ProviderRegistry};
use serde_json::json;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "component-forge-cli")]
#[command(about = "Analyze a website and generate UI components")]
struct Cli {
    /// Website URL to analyze
    url: String,

    /// Server address (e.g. "http://localhost:5000"); runs locally when omitted
    #[arg(short, long)]
    server: Option<String>,

    /// Also run the component generation pass
    #[arg(short, long)]
    components: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Request timeout in seconds (server mode)
    #[arg(short, long, default_value = "300")]
    timeout: u64,

    /// JSON config file (local mode); environment variables otherwise
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let output = match &cli.server {
        Some(server) => run_remote(&cli, server).await?,
        None => run_local(&cli).await?,
    };

    let bytes = cli.format.encode(&output)?;

    io::stdout()
        .write_all(&bytes)
        .map_err(|e| anyhow!("Failed to write output: {e}"))?;

    Ok(())
}

async fn run_remote(cli: &Cli, server: &str) -> Result<serde_json::Value> {
    let client = ForgeClient::new(server, Duration::from_secs(cli.timeout))?;

    log::info!("Analyzing {} via {server}", cli.url);
    let outcome = client.analyze(&cli.url).await?;

    if !cli.components {
        return Ok(serde_json::to_value(outcome)?);
    }
    let components = client.generate_components(&outcome.analysis).await?;
    Ok(json!({ "analysis": outcome.analysis, "components": components }))
}

async fn run_local(cli: &Cli) -> Result<serde_json::Value> {
    let config = match &cli.config {
        Some(path) => {
            Config::from_file(path).map_err(|e| anyhow!("Failed to load config {path}: {e}"))?
        }
        None => Config::from_env(),
    };

    let dispatcher = Dispatcher::new(ProviderRegistry::from_config(&config), config.retry_policy());
    let analyzer = Analyzer::new(Arc::new(HttpPageFetcher::new(config.fetch_timeout())), dispatcher);

    let outcome = analyzer
        .analyze(&cli.url)
        .await
        .map_err(|e| anyhow!("Analysis of {} failed: {e}", cli.url))?;

    if !cli.components {
        return Ok(serde_json::to_value(outcome)?);
    }
    let components = analyzer.generate_components(&outcome.analysis).await;
    Ok(json!({ "analysis": outcome.analysis, "components": components }))
}
