use std::{fs::OpenOptions, sync::Arc};

use crate::{
    config::AppConfig,
    error::{AppError, Result},
};

/// Sends the logs to `log_file`; the terminal belongs to the UI.
pub fn init(config: &AppConfig) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "cashdesk={level},engine={level}",
            level = config.log_level
        ))
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .try_init()
        .map_err(|err| AppError::Logging(err.to_string()))
}
