//! Exam Proctoring Server - Main Entry Point
//!
//! Usage: `proctor-server [settings.toml]`. The settings path can also be
//! given in `PROCTOR_CONFIG`.

use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PROCTOR_CONFIG").ok());
    let settings = Settings::load(path.as_deref())?;

    init_logging(&settings.logging)?;

    info!("=== Exam Proctor v{} ===", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &path {
        info!("Loaded settings from {}", path);
    }

    run_server(settings).await?;

    Ok(())
}
