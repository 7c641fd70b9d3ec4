use journal_core::JournalCore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let core = JournalCore::start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    core.shutdown().await?;
    Ok(())
}
