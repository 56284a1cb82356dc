use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use color_eyre::eyre::{self, Context};
use serde::Deserialize;
use store::MemoryStore;
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod reservation;
mod route;
mod store;
mod tui;

#[derive(Deserialize, Debug)]
#[serde(default, deny_unknown_fields)]
struct Config {
    /// Seed file with the reservations to show.
    reservations: PathBuf,
    /// Route the app opens on, e.g. `reservations` or `reservation/yes/R1`.
    start: String,
    /// Prepended to the reservation id to form the QR payload.
    qr_prefix: String,
    toast_ms: u64,
    /// Used when `RUST_LOG` is not set.
    log_filter: String,
    show_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reservations: PathBuf::from("reservations.toml"),
            start: "reservations".to_owned(),
            qr_prefix: String::new(),
            toast_ms: 2000,
            log_filter: "info".to_owned(),
            show_log: true,
        }
    }
}

impl Config {
    fn load(path: &Path) -> eyre::Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let config_file = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&config_file)
            .wrap_err_with(|| format!("Failed to deserialize {}", path.display()))
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let config = Config::load(Path::new("config.toml"))?;
    let start: route::Route = config
        .start
        .parse()
        .wrap_err("Invalid `start` route in config.toml")?;

    let (tx, rx) = tokio::sync::watch::channel(());
    let log = tui::log_pane::LogPane::new(tx);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .wrap_err_with(|| format!("Invalid log filter `{}`", config.log_filter))?;
    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .event_format(log.clone())
                .with_writer(std::io::sink),
        )
        .init();

    let store = if config.reservations.exists() {
        MemoryStore::load(&config.reservations)?
    } else {
        tracing::warn!(
            path = %config.reservations.display(),
            "No reservations file, starting empty"
        );
        MemoryStore::new()
    };

    let store_rx = store.changes();
    tui::tui(Arc::new(store), store_rx, Arc::new(config), log, rx, start).await?;

    Ok(())
}
