mod health;

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    clap::Parser,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    tgrelay_config::RelayConfig,
    tgrelay_pipeline::{ControlPlane, MediaDelivery, MediaSource, RelayPipeline, RuntimeState,
        start_workers},
    tgrelay_store::{FingerprintStore, SqliteFingerprintStore},
    tgrelay_telegram::TelegramRelay,
};

#[derive(Parser)]
#[command(name = "tgrelay", about = "tgrelay — Telegram channel media relay")]
struct Cli {
    /// Path to the config file (default: discover tgrelay.{toml,yaml,yml,json}).
    #[arg(long, env = "TGRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Health endpoint address (overrides config value).
    #[arg(long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn load(cli: &Cli) -> anyhow::Result<RelayConfig> {
    let mut cfg = match &cli.config {
        Some(path) => tgrelay_config::load_config(path)?,
        None => tgrelay_config::discover_and_load(),
    };
    if let Some(bind) = &cli.bind {
        cfg.health.bind = bind.clone();
    }
    tgrelay_config::validate(&cfg)?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli);

    // Invalid config is fatal before anything connects.
    let cfg = load(&cli)?;

    // Store initialization failure is likewise fatal; runtime store failures
    // are handled per-message by the pipeline policy.
    let store: Arc<dyn FingerprintStore> =
        Arc::new(SqliteFingerprintStore::open(&cfg.store.path).await?);

    // Free claims orphaned by a previous crash.
    let grace = Duration::from_secs(cfg.dedup.provisional_grace_secs);
    let purged = store
        .purge_abandoned(now_ms() - grace.as_millis() as i64)
        .await?;
    if purged > 0 {
        info!(purged, "removed abandoned delivery claims");
    }

    let bot = tgrelay_telegram::connect(&cfg.telegram).await?;
    let relay = Arc::new(TelegramRelay::new(bot.clone(), cfg.channels.target));

    let state = Arc::new(RuntimeState::new());
    let pipeline = Arc::new(RelayPipeline::new(
        &cfg,
        Arc::clone(&store),
        Arc::clone(&relay) as Arc<dyn MediaDelivery>,
        relay as Arc<dyn MediaSource>,
        Arc::clone(&state),
    ));

    let cancel = CancellationToken::new();
    let (handle, workers) = start_workers(
        Arc::clone(&pipeline),
        cfg.queue_capacity,
        cfg.workers,
        cancel.clone(),
    );

    let control = Arc::new(ControlPlane::new(Arc::clone(&state), Arc::clone(&store)));
    let poller = tgrelay_telegram::spawn_polling(
        bot.clone(),
        cfg.channels.sources.clone(),
        cfg.telegram.clone(),
        handle,
        control,
        cancel.clone(),
    );

    let sweeper = spawn_sweeper(Arc::clone(&store), grace, cancel.clone());

    if !cfg.health.bind.is_empty() {
        let bind = cfg.health.bind.clone();
        let pipeline = Arc::clone(&pipeline);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = health::serve(bind, pipeline, cancel).await {
                warn!(error = %e, "health endpoint failed");
            }
        });
    }

    state.mark_ready();
    tgrelay_telegram::notify_admins(&bot, &cfg.telegram, "tgrelay started").await;
    info!(
        sources = ?cfg.channels.sources,
        target = cfg.channels.target,
        "relay running"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining in-flight deliveries");
    cancel.cancel();

    poller.await.ok();
    for worker in workers {
        worker.await.ok();
    }
    sweeper.abort();
    tgrelay_telegram::notify_admins(&bot, &cfg.telegram, "tgrelay stopped").await;
    info!("shutdown complete");
    Ok(())
}

/// Periodically purge pending claims older than the grace period so a claim
/// orphaned mid-delivery never blocks its identity forever.
fn spawn_sweeper(
    store: Arc<dyn FingerprintStore>,
    grace: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let period = grace.max(Duration::from_secs(60)) / 2;
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {},
            }
            match store.purge_abandoned(now_ms() - grace.as_millis() as i64).await {
                Ok(0) => {},
                Ok(purged) => info!(purged, "swept abandoned delivery claims"),
                Err(e) => warn!(error = %e, "abandoned-claim sweep failed"),
            }
        }
    })
}
