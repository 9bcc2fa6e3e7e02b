//! Optional read/force debug HTTP surface.
//!
//! Operator-facing diagnostics only: schedule status, forced execution,
//! render previews, and a whitelisted raw pass-through to the backend.
//! Every response is JSON with an explicit `success` flag. Enabled by
//! setting `DEBUG_HTTP_ADDR`.

use crate::db;
use crate::engine::Engine;
use crate::schedule;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/debug/status", get(status))
        .route("/debug/force-next", post(force_next))
        .route("/debug/force/{day}/{month}", post(force_slot))
        .route("/debug/preview", get(preview))
        .route("/debug/raw/{*endpoint}", get(raw))
        .with_state(engine)
}

pub async fn serve(engine: Arc<Engine>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "debug http server listening");
    axum::serve(listener, router(engine)).await?;
    Ok(())
}

async fn status(State(engine): State<Arc<Engine>>) -> Json<Value> {
    let today = Engine::today_day();
    let month = engine.current_month().await;
    let entries = match &month {
        Some(month) => engine.pending_status(today, month).await,
        None => engine.pending_status(today, "").await,
    };
    let recent = match db::recent_posts(engine.pool(), 20).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(?err, "failed to load recent posts for status");
            Vec::new()
        }
    };
    Json(json!({
        "success": true,
        "current_month": month,
        "today": today,
        "entries": entries,
        "recent_posts": recent,
    }))
}

async fn force_next(State(engine): State<Arc<Engine>>) -> Json<Value> {
    let Some(month) = engine.current_month().await else {
        return Json(json!({ "success": false, "error": "no active publishing month" }));
    };
    match engine.force_next_for(Engine::today_day(), &month).await {
        Some((day, published)) => Json(json!({
            "success": published,
            "day": day,
            "month": month,
        })),
        None => Json(json!({
            "success": true,
            "month": month,
            "message": "no pending entries",
        })),
    }
}

async fn force_slot(
    State(engine): State<Arc<Engine>>,
    Path((day, month)): Path<(u32, String)>,
) -> Json<Value> {
    let published = engine.execute_entry(day, &month).await;
    Json(json!({
        "success": published,
        "day": day,
        "month": month,
    }))
}

#[derive(Debug, Deserialize)]
struct PreviewQuery {
    month: Option<String>,
    day: Option<u32>,
}

async fn preview(
    State(engine): State<Arc<Engine>>,
    Query(query): Query<PreviewQuery>,
) -> Json<Value> {
    let month = match query.month {
        Some(month) => month,
        None => match engine.current_month().await {
            Some(month) => month,
            None => {
                return Json(json!({ "success": false, "error": "no active publishing month" }))
            }
        },
    };

    let targets: Vec<_> = match query.day {
        Some(day) => match schedule::entry_for_day(day) {
            Some(entry) => vec![entry],
            None => {
                return Json(json!({ "success": false, "error": "no schedule entry for day" }))
            }
        },
        None => schedule::entries().iter().collect(),
    };

    let mut previews = Vec::with_capacity(targets.len());
    for entry in targets {
        let text = engine
            .render_entry(entry.content_type, &month)
            .await
            .map(|(text, _)| text);
        previews.push(json!({
            "day": entry.day,
            "content_type": entry.content_type.as_str(),
            "text": text,
        }));
    }
    Json(json!({ "success": true, "month": month, "previews": previews }))
}

async fn raw(
    State(engine): State<Arc<Engine>>,
    Path(endpoint): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<Value> {
    let endpoint = format!("/{}", endpoint.trim_start_matches('/'));
    match engine.raw_fetch(&endpoint, &params).await {
        Some(data) => Json(json!({ "success": true, "endpoint": endpoint, "data": data })),
        None => Json(json!({
            "success": false,
            "endpoint": endpoint,
            "error": "endpoint not whitelisted or fetch failed",
        })),
    }
}
