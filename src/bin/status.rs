//! Print the bot's schedule state and recent publish attempts.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use aviadata_bot::backend::{BackendClient, StatsBackend};
use aviadata_bot::engine::Engine;
use aviadata_bot::publisher::{SocialClient, TwitterClient};
use aviadata_bot::{config, db};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Number of recent log rows to show
    #[arg(long, default_value_t = 10)]
    recent: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let cfg = config::load_from_env()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    let backend: Arc<dyn StatsBackend> = Arc::new(BackendClient::new(&cfg.backend.base_url)?);
    let social: Arc<dyn SocialClient> = Arc::new(TwitterClient::new(cfg.twitter.clone()));
    let engine = Engine::new(pool.clone(), backend, social, cfg.backend.clone());

    let today = Engine::today_day();
    let month = engine.current_month().await;
    println!(
        "publishing month: {}   today: day {today}",
        month.as_deref().unwrap_or("(none)")
    );

    let month_key = month.as_deref().unwrap_or("");
    println!("\nschedule:");
    for entry in engine.pending_status(today, month_key).await {
        let state = if entry.posted {
            "posted"
        } else if entry.due {
            "PENDING"
        } else {
            "upcoming"
        };
        println!(
            "  day {:>2}  {:<28} {:<8}  {}",
            entry.day, entry.content_type, state, entry.description
        );
    }

    println!("\nrecent attempts:");
    for row in db::recent_posts(&pool, args.recent).await? {
        println!(
            "  #{:<5} {}  {:<7} {:<28} {}",
            row.id,
            row.posted_at.format("%Y-%m-%d %H:%M"),
            row.status,
            row.content_type,
            row.post_id
                .as_deref()
                .or(row.error_message.as_deref())
                .unwrap_or("-")
        );
    }

    Ok(())
}
