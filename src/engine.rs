//! Schedule/dedup engine: decides what to publish on each tick.
//!
//! Per (content type, month) a slot is either not-yet-posted or posted;
//! the only transition is a successful publish, witnessed by a success
//! row in the post log. Overlapping ticks are not locked out: the
//! store-level dedup gate is the correctness mechanism, and the rare
//! double post a race could produce is accepted rather than engineered
//! against with transactions.
//!
//! Store errors degrade to conservative defaults ("not posted", "no
//! state"): the bot prefers occasional duplicate work over stopping.

use crate::backend::{BackendClient, Params, StatsBackend};
use crate::config;
use crate::content;
use crate::db::{self, Pool};
use crate::model::{ContentType, STATE_CURRENT_MONTH};
use crate::publisher::{self, SocialClient};
use crate::schedule;
use anyhow::Result;
use chrono::{Datelike, Local};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Engine {
    pool: Pool,
    backend: Arc<dyn StatsBackend>,
    social: Arc<dyn SocialClient>,
    backend_cfg: config::Backend,
}

/// One schedule slot with its dedup state, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct EntryStatus {
    pub day: u32,
    pub content_type: &'static str,
    pub description: &'static str,
    pub due: bool,
    pub posted: bool,
}

impl Engine {
    pub fn new(
        pool: Pool,
        backend: Arc<dyn StatsBackend>,
        social: Arc<dyn SocialClient>,
        backend_cfg: config::Backend,
    ) -> Self {
        Self {
            pool,
            backend,
            social,
            backend_cfg,
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn today_day() -> u32 {
        Local::now().day()
    }

    /// Current publishing month, or `None` when unset or unreadable.
    pub async fn current_month(&self) -> Option<String> {
        match db::get_state(&self.pool, STATE_CURRENT_MONTH).await {
            Ok(month) => month,
            Err(err) => {
                warn!(?err, "failed to read publishing month; assuming none");
                None
            }
        }
    }

    async fn already_posted(&self, content_type: ContentType, month: &str, day: u32) -> bool {
        match db::exists_successful_post(&self.pool, content_type, month, day).await {
            Ok(exists) => exists,
            Err(err) => {
                warn!(?err, "dedup check failed; assuming not yet posted");
                false
            }
        }
    }

    /// Catch-up tick: attempt every due, not-yet-posted entry for the
    /// current publishing month.
    pub async fn run_pending_posts(&self) -> Result<()> {
        let Some(month) = self.current_month().await else {
            info!("no active publishing month yet");
            return Ok(());
        };
        self.catch_up_for_day(Self::today_day(), &month).await;
        Ok(())
    }

    /// Clock-injected core of the catch-up tick.
    pub async fn catch_up_for_day(&self, day_of_month: u32, month: &str) {
        info!(month, day_of_month, "checking pending posts");
        let mut sent = 0u32;
        let mut already = 0u32;

        for entry in schedule::entries_due(day_of_month) {
            if self.already_posted(entry.content_type, month, entry.day).await {
                already += 1;
                continue;
            }
            if self.execute_entry(entry.day, month).await {
                sent += 1;
            }
        }

        info!(sent, already, month, "pending-post check complete");
    }

    /// Month-rollover tick: when the backend exposes a newer month,
    /// persist it and immediately fire the day-0 monthly summary.
    pub async fn run_month_rollover(&self) -> Result<()> {
        let Some(latest) = self.backend.latest_available_month().await else {
            warn!("could not determine latest backend month");
            return Ok(());
        };

        let current = self.current_month().await;
        if current.as_deref() == Some(latest.as_str()) {
            return Ok(());
        }

        info!(new = latest, old = ?current, "new publishing month detected");
        if let Err(err) = db::set_state(&self.pool, STATE_CURRENT_MONTH, &latest).await {
            // Next rollover tick will still see the mismatch and retry.
            warn!(?err, "failed to persist publishing month");
        }
        self.execute_entry(0, &latest).await;
        Ok(())
    }

    /// Run the full fetch→format→publish pipeline for one schedule day.
    /// True means the slot holds a successful post afterwards (including
    /// "was already posted").
    pub async fn execute_entry(&self, day: u32, month: &str) -> bool {
        let Some(entry) = schedule::entry_for_day(day) else {
            warn!(day, "no schedule entry for day");
            return false;
        };

        if self.already_posted(entry.content_type, month, day).await {
            info!(
                content_type = entry.content_type.as_str(),
                month, day, "post already exists; skipping"
            );
            return true;
        }

        info!(content_type = entry.content_type.as_str(), month, "executing post");
        let Some((text, source)) = self.render_entry(entry.content_type, month).await else {
            warn!(
                content_type = entry.content_type.as_str(),
                month, "no content generated; slot stays pending"
            );
            return false;
        };

        publisher::publish(
            &self.pool,
            self.social.as_ref(),
            &text,
            entry.content_type,
            month,
            day,
            source.as_ref(),
        )
        .await
    }

    /// Fetch the data an entry needs and render its text, without
    /// publishing. Shared by the pipeline and the preview endpoints.
    /// Returns the text together with the payload it was rendered from.
    pub async fn render_entry(
        &self,
        content_type: ContentType,
        month: &str,
    ) -> Option<(String, Option<Value>)> {
        let months = BackendClient::month_params(month);
        let with = |mut base: Params, extra: &[(&str, &str)]| {
            base.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
            base
        };

        match content_type {
            ContentType::MonthlySummary => {
                let data = self.backend.fetch("/vuelos/kpis", &months).await?;
                let text = content::monthly_summary(&data, month)?;
                Some((text, Some(data)))
            }
            ContentType::TopAirlines => {
                let params = with(months, &[("limit", "10")]);
                let data = self.backend.fetch("/vuelos/aerolinea", &params).await?;
                let text = content::top_airlines(&data, month)?;
                Some((text, Some(data)))
            }
            ContentType::BusiestRoutes => {
                let params = with(months, &[("limit", "10")]);
                let data = self
                    .backend
                    .fetch(&self.backend_cfg.routes_endpoint, &params)
                    .await?;
                let text = content::busiest_routes(&data, month)?;
                Some((text, Some(data)))
            }
            ContentType::TopAirports => {
                let params = with(months, &[("limit", "10")]);
                let data = self.backend.fetch("/vuelos/aeropuerto", &params).await?;
                let text = content::top_airports(&data, month)?;
                Some((text, Some(data)))
            }
            ContentType::InternationalDestinations => {
                let params = with(months, &[("tipo_pais", "destino")]);
                let data = self.backend.fetch("/vuelos/paises", &params).await?;
                let text = content::international_destinations(&data, month)?;
                Some((text, Some(data)))
            }
            ContentType::HistoricalTrend => {
                let data = self.backend.fetch("/vuelos/mes", &[]).await?;
                let text = content::historical_trend(&data, month)?;
                Some((text, Some(data)))
            }
            ContentType::AverageOccupancy => {
                let data = self.backend.fetch("/vuelos/ocupacion", &months).await?;
                let text = content::average_occupancy(&data, month)?;
                Some((text, Some(data)))
            }
            ContentType::MonthlyComparison => {
                let current = self.backend.fetch("/vuelos/kpis", &months).await?;
                let prior_month = content::previous_month(month)?;
                let prior = self
                    .backend
                    .fetch("/vuelos/kpis", &BackendClient::month_params(&prior_month))
                    .await
                    .unwrap_or(Value::Null);
                let text = content::monthly_comparison(&current, &prior, month)?;
                Some((text, Some(current)))
            }
            ContentType::InternationalRoutes => {
                let params = with(months, &[("flight_types", "Internacional")]);
                let data = self.backend.fetch("/vuelos/paises", &params).await?;
                let text = content::international_routes(&data, month)?;
                Some((text, Some(data)))
            }
            other => {
                info!(content_type = other.as_str(), "no formatter for content type");
                None
            }
        }
    }

    /// Per-entry schedule state for the given day and month.
    pub async fn pending_status(&self, day_of_month: u32, month: &str) -> Vec<EntryStatus> {
        let mut out = Vec::with_capacity(schedule::entries().len());
        for entry in schedule::entries() {
            out.push(EntryStatus {
                day: entry.day,
                content_type: entry.content_type.as_str(),
                description: entry.description,
                due: entry.day <= day_of_month,
                posted: self.already_posted(entry.content_type, month, entry.day).await,
            });
        }
        out
    }

    /// Execute the first due entry lacking a successful post. Returns
    /// the attempted day and whether it succeeded, or `None` when
    /// nothing is pending.
    pub async fn force_next_for(&self, day_of_month: u32, month: &str) -> Option<(u32, bool)> {
        for entry in schedule::entries_due(day_of_month) {
            if !self.already_posted(entry.content_type, month, entry.day).await {
                let ok = self.execute_entry(entry.day, month).await;
                return Some((entry.day, ok));
            }
        }
        None
    }

    /// Endpoints the raw debug pass-through may reach.
    pub fn raw_whitelist(&self) -> Vec<String> {
        vec![
            "/vuelos/kpis".to_string(),
            "/vuelos/aerolinea".to_string(),
            self.backend_cfg.routes_endpoint.clone(),
            "/vuelos/aeropuerto".to_string(),
            "/vuelos/paises".to_string(),
            "/vuelos/mes".to_string(),
            "/vuelos/ocupacion".to_string(),
            self.backend_cfg.airport_comparison_endpoint.clone(),
            "/vuelos/diario".to_string(),
            "/vuelos/detallados".to_string(),
            "/vuelos/clase".to_string(),
            "/aeropuertos/rango-meses".to_string(),
        ]
    }

    /// Whitelisted diagnostic pass-through to the backend.
    pub async fn raw_fetch(&self, endpoint: &str, params: &[(String, String)]) -> Option<Value> {
        if !self.raw_whitelist().iter().any(|e| e == endpoint) {
            warn!(endpoint, "raw fetch rejected: endpoint not whitelisted");
            return None;
        }
        self.backend.fetch(endpoint, params).await
    }
}
