//! Memocache demo
//!
//! Memoizes a slow squaring function on the configured provider and calls it
//! three times, the last call being served from the cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memocache::{
    CacheProvider, Config, Memoize, MemoizeConfig, MemoryCacheProvider, MemoryProviderConfig,
    RedisCacheProvider,
};

/// Demo entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the Redis provider when `REDIS_URL` is set, the memory provider otherwise
/// 4. Memoize `square_of` and call it for 10, 20, 10
/// 5. Stop early on SIGINT/SIGTERM, then stop the sweeper
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" for this crate, can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memocache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting memocache demo");

    let config = Config::from_env();
    info!(
        "Configuration loaded: default_ttl={}s, cleanup_interval={}s, args_order_vain={}, redis={}",
        config.default_ttl,
        config.cleanup_interval,
        config.args_order_vain,
        config.redis_url.is_some()
    );

    let memory = match config.redis_url {
        Some(_) => None,
        None => Some(Arc::new(MemoryCacheProvider::new(
            MemoryProviderConfig::default().with_cleanup_interval(config.cleanup_interval()),
        ))),
    };

    let provider: Arc<dyn CacheProvider> = match (&memory, &config.redis_url) {
        (Some(memory), _) => Arc::clone(memory) as Arc<dyn CacheProvider>,
        (None, Some(url)) => {
            let redis = RedisCacheProvider::new(url).context("creating redis provider")?;
            redis.ping().await.context("connecting to redis")?;
            Arc::new(redis)
        }
        (None, None) => anyhow::bail!("no cache provider configured"),
    };

    let square_of = Memoize::new(
        "square_of",
        square_of,
        config.default_ttl,
        MemoizeConfig::new(provider).args_order_vain(config.args_order_vain),
    );

    tokio::select! {
        result = run(&square_of) => result?,
        _ = shutdown_signal() => warn!("Demo interrupted"),
    }

    if let Some(memory) = memory {
        memory.shutdown();
    }

    info!("Demo complete");
    Ok(())
}

async fn run(square_of: &Memoize<(u64,), u64, String>) -> anyhow::Result<()> {
    for n in [10, 20, 10] {
        let started = Instant::now();
        let value = square_of
            .call((n,))
            .await
            .with_context(|| format!("square_of({})", n))?;
        info!(
            "square_of({}) = {} in {}ms",
            n,
            value,
            started.elapsed().as_millis()
        );
    }
    Ok(())
}

/// Squares its input after a pause standing in for real work.
async fn square_of((n,): (u64,)) -> Result<u64, String> {
    tokio::time::sleep(Duration::from_millis(500)).await;
    n.checked_mul(n)
        .ok_or_else(|| format!("square of {} overflows", n))
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
