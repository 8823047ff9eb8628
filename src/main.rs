use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_tracking::domain::order::{OrderCommandHandler, Status};
use order_tracking::query::{OrderQueries, QueryStrategy};
use order_tracking::store::{MemoryOrderStore, OrderStore, SqliteOrderStore};

// ============================================================================
// Fixture & Benchmark Harness
// ============================================================================
//
// Seeds orders in varied states, then times the Cancelled query under both
// strategies so the denormalized-scalar path can be compared against the
// history-derived one on the same dataset.
//
// ============================================================================

#[derive(Parser)]
#[command(
    name = "compare_status_queries",
    about = "Seed fixture orders and time both status query strategies"
)]
struct Args {
    /// Fixture groups to create; each group is three orders
    /// (one left pending, one cancelled, one completed)
    #[arg(long, default_value_t = 1000)]
    orders: usize,

    /// Timed repetitions of the Cancelled query per strategy
    #[arg(long, default_value_t = 100)]
    iterations: u32,

    /// Storage backend: "memory" or "sqlite"
    #[arg(long, default_value = "memory")]
    backend: String,

    /// Database URL for the sqlite backend
    #[arg(long, default_value = "sqlite::memory:")]
    database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let store: Arc<dyn OrderStore> = match args.backend.as_str() {
        "memory" => Arc::new(MemoryOrderStore::new()),
        "sqlite" => Arc::new(SqliteOrderStore::connect(&args.database_url).await?),
        other => anyhow::bail!("unknown backend: {other}"),
    };
    tracing::info!(backend = %args.backend, "🚀 Starting status query comparison");

    let handler = OrderCommandHandler::new(store.clone());
    let queries = OrderQueries::new(store.clone());

    let existing = store.count_orders().await?;
    tracing::info!("Having {} orders", existing);
    tracing::info!("Creating {} orders", args.orders * 3);

    let seeding = Instant::now();
    for _ in 0..args.orders {
        // One of each logical state per group
        handler.create_order().await?;
        let cancelled = handler.create_order().await?;
        let completed = handler.create_order().await?;
        handler.cancel_order(cancelled).await?;
        handler.complete_order(completed).await?;
    }
    tracing::info!(
        elapsed_ms = seeding.elapsed().as_millis() as u64,
        total = store.count_orders().await?,
        "✅ Fixture data ready"
    );

    time_strategy(&queries, QueryStrategy::DerivedLatest, args.iterations).await?;
    time_strategy(&queries, QueryStrategy::DenormalizedScalar, args.iterations).await?;

    Ok(())
}

async fn time_strategy(
    queries: &OrderQueries,
    strategy: QueryStrategy,
    iterations: u32,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let mut matched = 0;
    for _ in 0..iterations {
        matched = queries
            .by_status(Status::Cancelled, strategy)
            .await?
            .len();
    }
    let elapsed = started.elapsed();

    tracing::info!(
        ?strategy,
        iterations,
        matched,
        total_ms = elapsed.as_millis() as u64,
        mean_us = (elapsed.as_micros() / u128::from(iterations.max(1))) as u64,
        "⏱️ Strategy timed"
    );
    Ok(())
}
