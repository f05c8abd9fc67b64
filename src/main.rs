use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use component_forge::scrape::HttpPageFetcher;
use component_forge::server::{router, AppState};
use component_forge::{Analyzer, Config, Dispatcher, ProviderRegistry};

#[derive(Parser, Debug)]
#[command(name = "component-forge")]
#[command(about = "Website analysis and component generation server")]
struct Args {
    /// JSON config file; environment variables otherwise
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address, overriding the configured one
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .map_err(|e| anyhow!("Failed to load config file {path}: {e}"))?,
        None => Config::from_env(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let registry = ProviderRegistry::from_config(&config);
    let dispatcher = Dispatcher::new(registry, config.retry_policy());
    let fetcher = Arc::new(HttpPageFetcher::new(config.fetch_timeout()));
    let analyzer = Analyzer::new(fetcher, dispatcher);

    let state = AppState::new(analyzer, config.rate_limit_per_minute);
    let app = router(state, &config);

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|e| anyhow!("Invalid bind address {}: {e}", config.bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    log::info!("component-forge listening on http://{addr}");
    log::info!("CORS origins: {:?}", config.frontend_origins);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
