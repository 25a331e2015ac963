use std::{io, sync::OnceLock};

use application::{Args, Config, Service};
use service::infra::{in_memory::Store, InMemory};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    layer::{Layer as _, SubscriberExt as _},
    util::SubscriberInitExt as _,
};

const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

fn verbosity() -> log::Level {
    LOG_LEVEL.get().copied().unwrap_or(log::Level::INFO)
}

#[tokio::main]
async fn main() {
    // `WARN` and `ERROR` entries go to stderr, everything else to stdout.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stdout)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || !STDERR_LEVELS.contains(meta.level())
                            && verbosity() >= *meta.level()
                })),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stderr)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || STDERR_LEVELS.contains(meta.level())
                            && verbosity() >= *meta.level()
                })),
        )
        .init();

    _ = run().await;
}

async fn run() -> Result<(), ()> {
    let Args { config } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let Config { service, log } = Config::new(config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    log::info!(
        "sweeping reservations every {:?}",
        service.tasks.sweep_reservations.interval,
    );

    let (_, background) =
        Service::new(service.into(), InMemory::new(Store::new()));

    background.await.map_err(|e| {
        log::error!("background task failed: {e}");
    })
}
