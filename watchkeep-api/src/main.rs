mod app;

use anyhow::Context;
use app::{app_router, AppState, RateLimiter};
use dotenvy::dotenv;
use std::env;
use std::fs::{File, OpenOptions};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use watchkeep_core::runtime::{remove_pid_file, write_pid_file};
use watchkeep_core::{CommandExecutor, ControlFile, RegistryHandle, Scheduler};

#[derive(Debug, Clone)]
struct DaemonConfig {
    bind: SocketAddr,
    control_file: PathBuf,
}

impl DaemonConfig {
    fn from_env() -> anyhow::Result<Self> {
        let bind = match env::var("WK_BIND") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("invalid WK_BIND address: {raw}"))?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 2812)),
        };
        let control_file = env::var("WK_CONTROL_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./watchkeep.json"));
        Ok(Self { bind, control_file })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenv();

    let config = DaemonConfig::from_env()?;
    let control = ControlFile::load(&config.control_file)?;
    init_tracing(control.log_file.as_deref(), control.debug)?;
    info!(
        control_file = %config.control_file.display(),
        services = control.services.len(),
        "starting watchkeep daemon on {}",
        config.bind
    );

    let registry = RegistryHandle::new(control.build_registry()?);
    let run = Arc::new(control.run_info(&config.control_file, config.bind));
    if let Some(pid_file) = &run.pid_file {
        write_pid_file(pid_file)?;
    }

    let (scheduler_tx, scheduler_rx) = watch::channel(false);
    let scheduler = Scheduler::new(
        registry.clone(),
        CommandExecutor,
        Duration::from_secs(run.poll_interval_secs),
        scheduler_rx,
    )
    .with_start_delay(Duration::from_secs(run.start_delay_secs));
    let scheduler_task = tokio::spawn(scheduler.run());

    let (http_tx, http_rx) = watch::channel(false);
    let http_tx = Arc::new(http_tx);
    let state = AppState {
        registry,
        policy: Arc::new(control.access_policy()),
        run: run.clone(),
        auth_limiter: Arc::new(RateLimiter::new(10, Duration::from_secs(60))),
        http_shutdown: http_tx.clone(),
    };

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.bind))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(http_stopped(http_rx))
        .await?;

    // a user-requested stop only ends the http listener
    if *http_tx.borrow() {
        info!("http server stopped; scheduler keeps running until interrupted");
        tokio::signal::ctrl_c().await?;
    }

    let _ = scheduler_tx.send(true);
    if tokio::time::timeout(Duration::from_secs(5), scheduler_task)
        .await
        .is_err()
    {
        warn!("scheduler did not stop in time");
    }
    if let Some(pid_file) = &run.pid_file {
        remove_pid_file(pid_file);
    }
    info!("watchkeep daemon stopped");
    Ok(())
}

/// Resolves on Ctrl-C or when the stop flag is raised.
async fn http_stopped(mut stop: watch::Receiver<bool>) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received"),
        _ = stop.wait_for(|stopped| *stopped) => {}
    }
}

fn init_tracing(log_file: Option<&Path>, debug: bool) -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_level.into());

    let file_layer = match log_file {
        Some(path) => {
            let file: File = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(file_layer)
        .init();
    Ok(())
}
