mod app;
mod config;

use std::process::ExitCode;

use tokio::time::Instant;
use tracing::{error, info};

use app::App;
use config::WorkerConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let providers = match gunshot_observability::init(&config.telemetry()) {
        Ok(providers) => providers,
        Err(err) => {
            eprintln!("Failed to initialize telemetry: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        group = %config.consumer_group_name,
        mlservice = %format!("{}:{}", config.mlservice_host, config.mlservice_port),
        "starting main worker"
    );

    let (code, deadline) = match App::start(&config).await {
        Ok(mut app) => {
            let stop = app.wait().await;
            let deadline = Instant::now() + app::SHUTDOWN_TIMEOUT;
            match app.teardown(stop, deadline).await {
                Ok(()) => (ExitCode::SUCCESS, deadline),
                Err(err) => {
                    error!(error = format!("{err:#}"), "worker stopped");
                    (ExitCode::FAILURE, deadline)
                }
            }
        }
        Err(err) => {
            error!(error = format!("{err:#}"), "startup failed");
            (ExitCode::FAILURE, Instant::now() + app::SHUTDOWN_TIMEOUT)
        }
    };

    // The batch exporter flush blocks; keep it off the async workers.
    let flushed = tokio::task::spawn_blocking(move || gunshot_observability::shutdown(providers));
    match tokio::time::timeout_at(deadline, flushed).await {
        Ok(Ok(Err(err))) => eprintln!("Failed to shut down telemetry: {err}"),
        Ok(Err(err)) => eprintln!("Telemetry shutdown task failed: {err}"),
        Err(_) => eprintln!("Telemetry shutdown exceeded {:?}", app::SHUTDOWN_TIMEOUT),
        Ok(Ok(Ok(()))) => {}
    }

    code
}
