use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use animeplay::account::{AuthStore, StoreOptions};
use animeplay::cli::{self, Cli};
use animeplay::config::AppConfig;
use animeplay::storage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    // Subscriber goes up before the config is read so its warnings are not lost
    let env_filter = EnvFilter::try_from_default_env().ok();
    let level_from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load_or_default(&args.config);

    // RUST_LOG wins over the configured level
    if !level_from_env {
        filter_handle.reload(EnvFilter::new(config.log_level.as_str()))?;
    }

    debug!("Using {:?} storage at {}", config.storage.backend, config.storage.path);
    let backend = storage::open(&config.storage)?;
    let mut store = AuthStore::with_options(backend, StoreOptions::from(&config));

    cli::account::handle_command(&mut store, args.command).await
}
