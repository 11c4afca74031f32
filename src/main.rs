//! Thrimer - A pausable interval timer controlled over HTTP
//!
//! This is the main entry point for the thrimer daemon.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use thrimer::{
    api::create_router,
    config::Config,
    state::{AppState, TimerCommand},
    tasks::action_log_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("thrimer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting thrimer daemon v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, duration={:.3}s, repeats={}, autostart={}",
        config.host,
        config.port,
        config.duration.as_secs_f64(),
        config.repeats,
        config.autostart()
    );

    // Create application state
    let state = Arc::new(AppState::from_config(&config)?);

    // Subscribe before the first run so the log sees every action
    let log_task = tokio::spawn(action_log_task(state.timer.subscribe()));

    if config.autostart() {
        state.apply(TimerCommand::Start);
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /start  - Start or restart the timer");
    info!("  POST /pause  - Pause the running timer");
    info!("  POST /resume - Resume a paused timer");
    info!("  POST /stop   - Stop the timer for good");
    info!("  GET  /status - Check timer status");
    info!("  GET  /health - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        signal = shutdown_signal() => {
            match signal {
                Ok(signal) => info!("Shutdown signal {} received", signal),
                Err(e) => tracing::error!("Failed to install signal handlers: {}", e),
            }
        }
    }

    state.apply(TimerCommand::Stop);
    if let Ok(seen) = log_task.await {
        info!("Logged {} timer actions", seen);
    }

    info!("Server shutdown complete");
    Ok(())
}
