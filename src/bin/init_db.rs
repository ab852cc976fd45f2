//! Create the dashboard database file and bring its schema up to date.
//!
//! Usage: init-db [path]   (defaults to ./moex.db)

use moex_store::MarketDb;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> moex_store::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moex_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("moex.db"));

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let _db = MarketDb::new(&path)?;
    tracing::info!("Database ready at {}", path.display());

    Ok(())
}
