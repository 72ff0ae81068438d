//! Opens one pool in memory and races concurrent joins against it.
//!
//! Prints the final pool view as JSON. Retry policy is read from
//! `GROUPBUY_*` environment variables; log output is controlled by
//! `RUST_LOG`.

use std::ffi::OsString;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use groupbuy::CoordinatorSettings;
use groupbuy::domain::{
    CallerIdentity, JoinCoordinator, OpenPoolRequest, PoolAdminService, PoolError, PoolLocks,
    PoolQueryService, ProductId, Role, UserId, require_pool_opener,
};
use groupbuy::outbound::memory::{InMemoryCatalog, InMemoryOrderSink, InMemoryPoolRepository};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `groupbuy-demo` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "groupbuy-demo",
    about = "Race concurrent joins against an in-memory group-buy pool",
    version
)]
struct CliArgs {
    /// Units the pool needs to succeed.
    #[arg(long, default_value_t = 10)]
    target: u32,
    /// Number of members joining concurrently.
    #[arg(long, default_value_t = 6)]
    members: u32,
    /// Units each member pledges.
    #[arg(long, default_value_t = 3)]
    quantity: i64,
    /// Minutes until the pool deadline.
    #[arg(long = "deadline-minutes", default_value_t = 60)]
    deadline_minutes: i64,
    /// Unit price quoted by the catalog.
    #[arg(long, default_value = "19.99")]
    price: Decimal,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinTally {
    accepted: u32,
    rejected: u32,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let settings = CoordinatorSettings::load_from_iter([OsString::from("groupbuy-demo")])
        .map_err(|error| eyre!("failed to load coordinator settings: {error}"))?;
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build Tokio runtime")?;
    runtime.block_on(run(args, settings))
}

async fn run(args: CliArgs, settings: CoordinatorSettings) -> Result<()> {
    let repo = Arc::new(InMemoryPoolRepository::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let sink = Arc::new(InMemoryOrderSink::new());
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let locks = Arc::new(PoolLocks::new());
    let retry = settings.retry_policy();

    let deadline = deadline_after(clock.utc(), args.deadline_minutes)?;
    let product_id = ProductId::random();
    catalog.set_price(product_id, args.price);

    let admin = PoolAdminService::new(
        Arc::clone(&repo),
        Arc::clone(&catalog),
        Arc::clone(&clock),
        Arc::clone(&locks),
    )
    .with_retry(retry);
    let leader = require_pool_opener(&CallerIdentity::new(UserId::random(), Role::Leader))?;
    let pool = admin
        .open_pool(
            &leader,
            OpenPoolRequest {
                product_id,
                target_quantity: args.target,
                deadline,
                description: Some("demo pool".to_owned()),
            },
        )
        .await?;
    info!(pool_id = %pool.id(), target = pool.target_quantity(), "demo pool opened");

    let coordinator = JoinCoordinator::new(
        Arc::clone(&repo),
        Arc::clone(&catalog),
        Arc::clone(&sink),
        Arc::clone(&clock),
        Arc::clone(&locks),
    )
    .with_config(retry);

    let mut handles = Vec::new();
    for _ in 0..args.members {
        let coordinator = coordinator.clone();
        let pool_id = pool.id();
        let quantity = args.quantity;
        handles.push(tokio::spawn(async move {
            coordinator.join(pool_id, UserId::random(), quantity).await
        }));
    }

    let mut tally = JoinTally::default();
    for handle in handles {
        match handle.await.wrap_err("join task panicked")? {
            Ok(_) => tally.accepted += 1,
            Err(PoolError::InsufficientSlots { .. } | PoolError::PoolClosed { .. }) => {
                tally.rejected += 1;
            }
            Err(other) => return Err(other.into()),
        }
    }

    let query = PoolQueryService::new(Arc::clone(&repo), clock, locks);
    let view = query.get_pool(pool.id()).await?;
    let report = serde_json::json!({
        "joins": tally,
        "orders": sink.orders_for(pool.id()).len(),
        "pool": view,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&report).wrap_err("failed to render report")?
    );
    Ok(())
}

/// Deadline `minutes` after `now`, rejecting offsets chrono cannot represent.
fn deadline_after(now: DateTime<Utc>, minutes: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_minutes(minutes)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| eyre!("deadline of {minutes} minutes is out of range"))
}
