use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use e621_feed::app::{App, Command, Flow, HELP};
use e621_feed::auth::{AuthStore, FileStore};
use e621_feed::config::Config;
use e621_feed::favorites::FavoritesClient;
use e621_feed::feed::{FeedController, RetryPolicy};
use e621_feed::render::TerminalRenderer;
use e621_feed::source::RelayPostSource;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting e621-feed");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        site_url = %config.site_url,
        relay = config.relay_enabled.then_some(config.relay_url.as_str()).unwrap_or("disabled"),
        "Configuration loaded"
    );

    let mut auth = AuthStore::new(FileStore::new(&config.auth_store_path));
    if !auth.restore() {
        info!("No saved credentials, favorites disabled until login");
    }
    let auth = auth.into_shared();

    let source = RelayPostSource::new(&config).context("Failed to build HTTP client")?;
    let favorites =
        FavoritesClient::new(&config, auth.clone()).context("Failed to build HTTP client")?;
    let feed = FeedController::new(
        source,
        RetryPolicy::from_config(&config),
        config.default_tags.clone(),
    );
    let renderer = TerminalRenderer::new(std::io::stdout());
    let mut app = App::new(feed, favorites, auth, renderer, config.site_url.clone());

    println!("{HELP}");
    app.start().await.context("Failed to render feed")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        prompt()?;
        let line = tokio::select! {
            () = &mut shutdown => break,
            line = lines.next_line() => line.context("Failed to read input")?,
        };
        // stdin closed
        let Some(line) = line else { break };

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                warn!("{e}");
                println!("{e}");
                continue;
            }
        };

        if app.handle(command).await.context("Failed to render")? == Flow::Quit {
            break;
        }
    }

    info!("Shutdown complete");
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush().context("Failed to write prompt")
}

fn init_tracing() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,e621_feed=info"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    // Logs go to stderr so they do not interleave with the timeline on stdout.
    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
