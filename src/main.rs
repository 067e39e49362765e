use clap::Parser;
use tracing_subscriber::EnvFilter;

use tabview::config::{Cli, ViewerConfig};
use tabview::viewer::{Viewer, ViewerError};

fn main() -> Result<(), ViewerError> {
    // Missing .env is fine; flags and the process env still apply.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = ViewerConfig::from_cli(Cli::parse())?;
    tracing::info!(base_url = %config.base_url, username = %config.username, "tabview starting");

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(config));
    // A pending stdin read holds a blocking thread until the next line.
    runtime.shutdown_background();
    result
}

async fn run(config: ViewerConfig) -> Result<(), ViewerError> {
    let viewer = Viewer::mount(config);
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    viewer.run(input, &mut out, shutdown).await
}
