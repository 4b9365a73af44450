use tokio::net::TcpListener;
use tokio::sync::broadcast;

use imgsync_core::Settings;

use crate::error::{io_err, DaemonError};
use crate::routes::{router, AppState};
use crate::services::Services;

/// Start the daemon and block the current thread until it exits.
pub fn start_blocking(settings: Settings, json_logs: bool) -> Result<(), DaemonError> {
    init_tracing(json_logs);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(settings))
}

/// Build the collaborators, bind the listener and serve until SIGINT/SIGTERM.
pub async fn run(settings: Settings) -> Result<(), DaemonError> {
    let services = Services::from_settings(&settings)?;
    for (key, value) in &services.describe {
        tracing::info!("{key}: {value}");
    }

    let listener = TcpListener::bind(&settings.listen)
        .await
        .map_err(|source| DaemonError::Bind {
            addr: settings.listen.clone(),
            source,
        })?;
    tracing::info!(addr = %settings.listen, "imgsync daemon listening");

    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    let state = AppState::new(services);

    let server_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = serve(listener, state, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = shutdown_signal() => {
                    match signal {
                        Ok(name) => {
                            tracing::info!("received {name}, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Task(format!("signal handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (server_result, signal_result) = tokio::join!(server_handle, signal_handle);
    handle_join("http_server", server_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("imgsync daemon stopped");
    Ok(())
}

/// Serve the HTTP surface on `listener` until `shutdown` fires.
///
/// In-flight requests finish before this returns.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
        .map_err(DaemonError::Serve)
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "ctrl-c"),
        _ = term.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Task(format!("{task} task join failure: {err}"))),
    }
}

/// Install the global subscriber, writing to stderr. `RUST_LOG` overrides the
/// `info` default.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
