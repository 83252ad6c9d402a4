mod app;
mod config;
mod error;
mod logging;
mod ui;

use std::time::Duration;

use engine::{Api, Console, HttpRemote, InMemoryRemote};

use crate::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;
    logging::init(&config)?;

    let (api, source) = if config.demo {
        (
            Api::new(InMemoryRemote::with_sample_data()?),
            "demo ledger".to_string(),
        )
    } else {
        let timeout = Duration::from_secs(config.timeout_secs);
        (
            Api::new(HttpRemote::new(&config.base_url, timeout)?),
            config.base_url.clone(),
        )
    };
    tracing::info!(source = %source, "starting cash desk");

    let console = Console::new(api, config.page_size, config.dictionary_page_size)?;
    let mut app = app::App::new(console, source);
    app.run().await?;
    Ok(())
}
