use anyhow::Result;
use aparajito_bridge::backend::simulated::{SimulatedBackend, SimulatedMedia};
use aparajito_bridge::backend::{BackendEventReceiver, PlaybackBackend};
use aparajito_bridge::{spawn_bridge, Bridge, EventBus};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod picker;

use config::{BackendKind, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("aparajito=info,tower_http=debug")),
        )
        .init();

    let args = cli::Args::parse();
    let mut config = Config::load(&args.config)?;

    // CLI flags override config file
    if let Some(backend) = args.backend {
        config.playback.backend = backend;
    }
    let web_dir = app::resolve_web_dir(args.web_dir, config.server.web_dir.clone());

    let (backend, backend_rx, backend_status) = start_backend(&config).await;
    let bridge = Bridge::new(
        backend,
        EventBus::new(config.playback.event_capacity),
        config.bridge_config(),
    );
    let (handle, bridge_task) = spawn_bridge(bridge, backend_rx, picker::host_picker());

    let web_ui_status = match &web_dir {
        Some(dir) => format!("Serving from {:?}", dir),
        None => "None (gateway-only mode)".to_string(),
    };
    let app = app::build_app(handle.clone(), web_dir.as_ref());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;

    print_startup_banner(
        &config.server.bind_address,
        &backend_status,
        &web_ui_status,
    );

    let shutdown_handle = handle.clone();
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
        println!();
        tracing::info!("Shutting down (ctrl-c)...");
        if let Err(e) = shutdown_handle.shutdown().await {
            tracing::debug!("Bridge already stopped: {}", e);
        }
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    if let Err(e) = bridge_task.await {
        tracing::warn!("Bridge runtime ended abnormally: {}", e);
    }

    Ok(())
}

/// Start the configured playback engine. A missing or broken mpv is not
/// fatal: the host falls back to the simulated engine so the UI still works.
async fn start_backend(
    config: &Config,
) -> (Box<dyn PlaybackBackend>, BackendEventReceiver, String) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    if config.playback.backend == BackendKind::Mpv {
        #[cfg(unix)]
        {
            let mpv_config = config.mpv_config();
            match aparajito_mpv::MpvBackend::launch(&mpv_config, events_tx.clone()).await {
                Ok(backend) => {
                    return (Box::new(backend), events_rx, "mpv (managed)".to_string());
                }
                Err(e) => {
                    tracing::warn!("Could not start mpv: {}", e);
                    tracing::warn!("Falling back to the simulated playback engine.");
                }
            }
        }
        #[cfg(not(unix))]
        {
            tracing::warn!("The mpv engine needs a Unix IPC socket on this build.");
            tracing::warn!("Falling back to the simulated playback engine.");
        }
    }

    let backend = SimulatedBackend::new(events_tx).with_fallback(SimulatedMedia::feature());
    let status = match config.playback.backend {
        BackendKind::Simulated => "Simulated".to_string(),
        BackendKind::Mpv => "Simulated (mpv unavailable)".to_string(),
    };
    (Box::new(backend), events_rx, status)
}

fn print_startup_banner(bind_address: &str, backend_status: &str, web_ui: &str) {
    println!();
    println!("    _                       _ _ _");
    println!("   / \\   _ __   __ _ _ __ __ _(_|_) |_ ___");
    println!("  / _ \\ | '_ \\ / _` | '__/ _` | | | __/ _ \\");
    println!(" / ___ \\| |_) | (_| | | | (_| | | | || (_) |");
    println!("/_/   \\_\\ .__/ \\__,_|_|  \\__,_|_/ |\\__\\___/");
    println!("        |_|                 |__/");
    println!();
    println!("  Listening:   http://{}", bind_address);
    println!("  Gateway:     ws://{}{}", bind_address, aparajito_ws::GATEWAY_PATH);
    println!();
    println!("  Playback:    {}", backend_status);
    println!("  Web UI:      {}", web_ui);
    println!();
}
