//! Test-data population tool.
//!
//! Simulates a number of concurrent streams of incoming metrics, each
//! stream keeping one key and tag set while the value takes a random
//! walk. Useful for exercising the store under concurrent writers.
//!
//! Usage: `populate --streams 10 --length 10000`

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitals::storage::{MetricStore, NewMetric, SqlitePool, schema};

/// Keys that might plausibly be medical measurements.
const POSSIBLE_KEYS: &[&str] = &[
    "heartrate",
    "blood pressure",
    "temperature",
    "respiratory rate",
    "pulse oximetry",
];

/// Earliest generated timestamp (arbitrary fixed epoch in the past).
const BASE_TIMESTAMP: i64 = 1_505_327_537_848;

/// Vitals test-data populator
#[derive(Parser, Debug)]
#[command(name = "populate", version, about, long_about = None)]
struct Cli {
    /// Number of concurrent metric streams
    #[arg(short, long, default_value_t = 10)]
    streams: usize,

    /// Length of each stream in metrics (one per millisecond)
    #[arg(short, long, default_value_t = 10_000)]
    length: i64,

    /// Database URL
    #[arg(long, default_value = "sqlite:data/vitals.db?mode=rwc", env = "VITALS_DB_URL")]
    db_url: String,

    /// Drop and recreate the tables first. Never point this at production data.
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let pool = SqlitePool::connect(&cli.db_url).await?;

    if cli.reset {
        tracing::warn!("Resetting database");
        // Link table first: tag rows are delete-restricted while referenced
        for ddl in [
            "DROP TABLE IF EXISTS metric_tags",
            "DROP TABLE IF EXISTS metrics",
            "DROP TABLE IF EXISTS tags",
        ] {
            sqlx::query(ddl).execute(pool.inner()).await?;
        }
    }

    schema::provision(&pool).await?;
    let store = MetricStore::new(pool);

    tracing::info!(
        streams = cli.streams,
        length = cli.length,
        "Starting metric streams"
    );

    let mut handles = Vec::with_capacity(cli.streams);
    for stream in 0..cli.streams {
        let store = store.clone();
        let length = cli.length;
        handles.push(tokio::spawn(async move {
            run_stream(stream, store, length).await;
        }));
        // Stagger stream startup a little
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    for handle in handles {
        handle.await?;
    }

    tracing::info!("Done!");
    Ok(())
}

/// Write one stream of metrics: fixed key and tags, random-walk value,
/// one metric per millisecond of simulated time.
async fn run_stream(stream: usize, store: MetricStore, length: i64) {
    let mut rng = StdRng::from_entropy();

    let key = POSSIBLE_KEYS[rng.gen_range(0..POSSIBLE_KEYS.len())].to_string();
    let tags = random_tags(&mut rng);
    let start = BASE_TIMESTAMP + rng.gen_range(0..10_000_000_000i64);
    let mut value = rng.gen_range(0.0..100.0);

    for t in start..start + length {
        value += rng.gen_range(-0.5..0.5);
        let metric = NewMetric {
            key: key.clone(),
            value,
            timestamp: t,
            tags: tags.clone(),
        };

        if let Err(err) = store.insert(metric.clone()).await {
            tracing::warn!(stream, error = %err, "Insert failed, retrying once");
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Err(err) = store.insert(metric).await {
                tracing::error!(stream, error = %err, "Retry failed, dropping metric");
            }
        }

        // Tiny pause so we don't overwhelm the database
        tokio::time::sleep(Duration::from_micros(100)).await;
    }

    tracing::info!(stream, key = %key, "Stream finished");
}

/// Random tags of the form room-x, bed-y, patient-z with small ints.
fn random_tags(rng: &mut StdRng) -> Vec<String> {
    vec![
        format!("room-{}", rng.gen_range(0..100)),
        format!("bed-{}", rng.gen_range(0..100)),
        format!("patient-{}", rng.gen_range(0..100)),
    ]
}
