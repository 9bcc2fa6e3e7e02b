//! Force-execute one schedule slot from the command line. The dedup
//! gate still applies: a slot that already holds a successful post is
//! reported as such and not re-published.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::Arc;

use aviadata_bot::backend::{BackendClient, StatsBackend};
use aviadata_bot::engine::Engine;
use aviadata_bot::publisher::{SocialClient, TwitterClient};
use aviadata_bot::{config, db};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Schedule day to execute (0, 2, 4, ... 26)
    day: u32,
    /// Publishing month, "YYYY-MM"; defaults to the stored current month
    #[arg(long)]
    month: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load_from_env()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    let backend: Arc<dyn StatsBackend> = Arc::new(BackendClient::new(&cfg.backend.base_url)?);
    let social: Arc<dyn SocialClient> = Arc::new(TwitterClient::new(cfg.twitter.clone()));
    let engine = Engine::new(pool, backend, social, cfg.backend.clone());

    let month = match args.month {
        Some(month) => month,
        None => engine
            .current_month()
            .await
            .ok_or_else(|| anyhow!("no publishing month stored; pass --month YYYY-MM"))?,
    };

    if engine.execute_entry(args.day, &month).await {
        println!("post for day {} / {} is published", args.day, month);
        Ok(())
    } else {
        Err(anyhow!("post for day {} / {} was not published", args.day, month))
    }
}
