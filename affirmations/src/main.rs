// Affirmations - recurring local reminders for saved affirmations
// Entry point and application setup

use affirmations::app::{self, AppState};
use affirmations::config::DEFAULT_LOG_FILTER;
use affirmations::dispatch::CronDispatcher;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting affirmations");

    let dispatcher = Arc::new(CronDispatcher::new().await?);
    let state = AppState::initialize(app::resolve_data_dir(), dispatcher.clone()).await?;

    let outcome = state.reschedule().await?;
    tracing::info!("{} reminder(s) planned", outcome.jobs.len());

    let mut deliveries = dispatcher.subscribe();
    dispatcher.start().await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            delivery = deliveries.recv() => match delivery {
                Ok(delivery) => println!("{}: {}", delivery.title, delivery.body),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Missed {} delivered reminder(s)", missed)
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::info!("Shutting down");
    dispatcher.shutdown().await?;
    Ok(())
}
