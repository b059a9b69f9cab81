use anyhow::{bail, Context, Result};
use clap::Parser;
use rtms_coordinator::{
    create_router, print_transcript, AppState, Config, HandoffQueue, NatsTransportFactory,
    PollLoop, SessionRegistry, WebhookRouter,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Joins RTMS streams announced by platform webhooks and prints their transcripts
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file (extension optional; missing file means defaults + env)
    #[arg(short, long, default_value = "config/rtms-coordinator")]
    config: String,

    /// Override the HTTP port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config).context("Failed to load config")?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }
    if !cfg.service.http.webhook_path.starts_with('/') {
        bail!(
            "Webhook path must start with '/': {}",
            cfg.service.http.webhook_path
        );
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let registry = SessionRegistry::new();
    let queue = HandoffQueue::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let factory = NatsTransportFactory::new(cfg.transport.clone());
    let poll_loop = PollLoop::new(registry.clone(), queue.clone(), Arc::new(factory))
        .with_interval(cfg.poll.interval())
        .with_session_setup(|session| session.on_transcript_data(print_transcript));
    let poll_handle = poll_loop.spawn(shutdown_rx)?;

    let router = WebhookRouter::new(registry.clone(), queue);
    let app = create_router(AppState::new(router, registry), &cfg.service.http.webhook_path);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "Listening for webhooks on http://{}{}",
        addr, cfg.service.http.webhook_path
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for interrupt: {}", e);
            }
            info!("Interrupt received, shutting down");
        })
        .await;

    // Leave every stream even if the server failed
    let _ = shutdown_tx.send(true);
    match tokio::task::spawn_blocking(move || poll_handle.join()).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!("Poll loop failed: {:#}", e),
        Ok(Err(_)) => error!("Poll loop thread panicked"),
        Err(e) => error!("Failed to wait for poll loop: {}", e),
    }

    served.context("HTTP server failed")?;
    info!("Shutdown complete");

    Ok(())
}
