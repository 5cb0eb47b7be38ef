pub mod api; // HTTP surface: routes, response mapping, server lifecycle
pub mod config;
pub mod pipeline; // Upload → extract → normalize

#[cfg(test)]
mod test_support;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::api::ServiceError;
use crate::config::ServiceConfig;

pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    match start() {
        Ok(()) => {
            tracing::info!("{} stopped", config::APP_NAME);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "{} failed", config::APP_NAME);
            ExitCode::FAILURE
        }
    }
}

fn start() -> Result<(), ServiceError> {
    let config = ServiceConfig::from_env()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| ServiceError::Task(format!("failed to start runtime: {e}")))?;
    runtime.block_on(api::serve(config))
}
