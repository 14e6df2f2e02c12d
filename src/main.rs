mod config;
mod daemon;
mod engine;
mod router;
mod state;
mod websocket;

use anyhow::Context;
use clap::Parser;
use daemon::timer::Timer;
use engine::{DockerEngine, EngineClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

#[derive(Parser)]
#[command(name = "dockview")]
#[command(about = "Live browser view of the containers and images on this host", long_about = None)]
struct Cli {
    /// Port to serve on
    #[arg(long = "port")]
    port: Option<u16>,

    /// Directory of web files
    #[arg(long = "directory")]
    directory: Option<String>,

    /// Docker endpoint, e.g. unix:///var/run/docker.sock
    #[arg(long = "endpoint")]
    endpoint: Option<String>,

    #[arg(long = "config", default_value = "config.json")]
    config: String,

    /// Verbose logging
    #[arg(long = "dev")]
    dev: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let timer = Timer::start();
    let cli = Cli::parse();

    let level = if cli.dev { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = config::Config::load(&cli.config)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", cli.config, e))?
        .with_overrides(cli.port, cli.directory, cli.endpoint);

    daemon::start::print_banner(&config);

    let engine: Arc<dyn EngineClient> = Arc::new(
        DockerEngine::connect(&config.docker.endpoint, config.docker.timeout_secs)
            .map_err(|e| anyhow::anyhow!("Failed to configure docker client: {}", e))?,
    );
    daemon::start::check_engine(engine.as_ref())
        .await
        .map_err(anyhow::Error::msg)?;
    tracing::info!("Connected to docker at {}", config.docker.endpoint);

    let store = Arc::new(state::StateStore::new());
    // Events from here on are replayed to the reconciler
    let since = engine::event_mark();
    state::bootstrap::load_snapshot(engine.as_ref(), &store)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load initial state: {}", e))?;

    let viewers = Arc::new(websocket::ViewerRegistry::new());

    // Engine events -> store + viewers, for the life of the process
    let _reconciler = state::Reconciler::new(
        engine.clone(),
        store.clone(),
        viewers.clone(),
        Duration::from_millis(config.events.resubscribe_delay_ms),
    )
    .spawn(Some(since));

    let dispatcher = websocket::CommandDispatcher::new(
        engine.clone(),
        store.clone(),
        viewers.clone(),
        config.commands.stop_grace_seconds,
        config.viewers.init_reply,
    );

    let ws_state = websocket::WebSocketState {
        viewers: viewers.clone(),
        dispatcher,
        queue_depth: config.viewers.queue_depth,
    };
    let public_state = router::public::PublicState {
        store,
        viewers,
        started_at: chrono::Utc::now(),
    };
    let app = router::app(public_state, ws_state, &config.web.directory);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Startup took {}ms", timer.elapsed_ms());
    tracing::info!("Serving files from {} at http://{}", config.web.directory, addr);
    tracing::info!("Viewer endpoint: ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
