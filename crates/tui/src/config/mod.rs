use clap::Parser;
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/cashdesk.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub page_size: u32,
    pub dictionary_page_size: u32,
    pub log_level: String,
    pub log_file: String,
    pub timeout_secs: u64,
    /// Run against the in-memory sample ledger instead of a server.
    #[serde(skip)]
    pub demo: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api/".to_string(),
            page_size: 10,
            dictionary_page_size: 10,
            log_level: "info".to_string(),
            log_file: "cashdesk.log".to_string(),
            timeout_secs: 10,
            demo: false,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "cashdesk", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override API root (e.g. http://127.0.0.1:8000/api/).
    #[arg(long)]
    base_url: Option<String>,
    /// Initial page size of the cash flow list.
    #[arg(long)]
    page_size: Option<u32>,
    /// Initial page size of the dictionary lists.
    #[arg(long)]
    dictionary_page_size: Option<u32>,
    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
    /// File receiving the logs.
    #[arg(long)]
    log_file: Option<String>,
    /// HTTP timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Use a seeded in-memory ledger, no server needed.
    #[arg(long)]
    demo: bool,
}

pub fn load() -> Result<AppConfig> {
    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("CASHDESK"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(page_size) = args.page_size {
        settings.page_size = page_size;
    }
    if let Some(page_size) = args.dictionary_page_size {
        settings.dictionary_page_size = page_size;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(log_file) = args.log_file {
        settings.log_file = log_file;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.timeout_secs = timeout_secs;
    }
    settings.demo = args.demo;

    Ok(settings)
}
