use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use aviadata_bot::backend::{BackendClient, StatsBackend};
use aviadata_bot::engine::Engine;
use aviadata_bot::publisher::{SocialClient, TwitterClient};
use aviadata_bot::{config, db, server};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Run one rollover check plus one catch-up pass, then exit
    #[arg(long)]
    once: bool,
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
    let engine = Arc::new(Engine::new(pool, backend, social, cfg.backend.clone()));

    // Initial rollover check, before either timer's first natural fire.
    if let Err(err) = engine.run_month_rollover().await {
        error!(?err, "initial rollover check failed");
    }

    if args.once {
        if let Err(err) = engine.run_pending_posts().await {
            error!(?err, "pending-post check failed");
        }
        return Ok(());
    }

    if let Some(addr) = cfg.app.debug_http_addr {
        let engine = engine.clone();
        tokio::spawn(async move {
            if let Err(err) = server::serve(engine, addr).await {
                error!(?err, "debug http server exited");
            }
        });
    }

    let catchup_interval = Duration::from_secs(cfg.app.catchup_interval_secs);
    let catchup_engine = engine.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(catchup_interval).await;
            if let Err(err) = catchup_engine.run_pending_posts().await {
                error!(?err, "pending-post check failed");
            }
        }
    });

    let rollover_interval = Duration::from_secs(cfg.app.rollover_interval_secs);
    let rollover_engine = engine.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(rollover_interval).await;
            if let Err(err) = rollover_engine.run_month_rollover().await {
                error!(?err, "month-rollover check failed");
            }
        }
    });

    info!(
        catchup_secs = cfg.app.catchup_interval_secs,
        rollover_secs = cfg.app.rollover_interval_secs,
        "bot started"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received; stopping");
    Ok(())
}
