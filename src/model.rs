use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key in `bot_state` holding the month currently being published.
pub const STATE_CURRENT_MONTH: &str = "current_publishing_month";

/// Named category of statistical post. The wire slugs are the
/// `content_type` values stored in `posts_log`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContentType {
    MonthlySummary,
    TopAirlines,
    BusiestRoutes,
    TopAirports,
    InternationalDestinations,
    HistoricalTrend,
    AverageOccupancy,
    AirportComparison,
    DailyRecords,
    UnusualAirlines,
    MonthlyComparison,
    InternationalRoutes,
    ClassAverages,
    MonthlyRecap,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::MonthlySummary => "resumen_mensual",
            ContentType::TopAirlines => "top_aerolineas",
            ContentType::BusiestRoutes => "rutas_transitadas",
            ContentType::TopAirports => "aeropuertos_activos",
            ContentType::InternationalDestinations => "destinos_internacionales",
            ContentType::HistoricalTrend => "evolucion_historica",
            ContentType::AverageOccupancy => "ocupacion_promedio",
            ContentType::AirportComparison => "comparativa_aeropuertos",
            ContentType::DailyRecords => "records_curiosidades",
            ContentType::UnusualAirlines => "aerolineas_inusuales",
            ContentType::MonthlyComparison => "comparativa_mensual",
            ContentType::InternationalRoutes => "rutas_internacionales",
            ContentType::ClassAverages => "promedios_clase",
            ContentType::MonthlyRecap => "recap_grafico",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "resumen_mensual" => Some(ContentType::MonthlySummary),
            "top_aerolineas" => Some(ContentType::TopAirlines),
            "rutas_transitadas" => Some(ContentType::BusiestRoutes),
            "aeropuertos_activos" => Some(ContentType::TopAirports),
            "destinos_internacionales" => Some(ContentType::InternationalDestinations),
            "evolucion_historica" => Some(ContentType::HistoricalTrend),
            "ocupacion_promedio" => Some(ContentType::AverageOccupancy),
            "comparativa_aeropuertos" => Some(ContentType::AirportComparison),
            "records_curiosidades" => Some(ContentType::DailyRecords),
            "aerolineas_inusuales" => Some(ContentType::UnusualAirlines),
            "comparativa_mensual" => Some(ContentType::MonthlyComparison),
            "rutas_internacionales" => Some(ContentType::InternationalRoutes),
            "promedios_clase" => Some(ContentType::ClassAverages),
            "recap_grafico" => Some(ContentType::MonthlyRecap),
            _ => None,
        }
    }
}

/// Outcome of a publish attempt as stored in `posts_log.status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PostStatus {
    Success,
    Error,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Success => "success",
            PostStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(PostStatus::Success),
            "error" => Some(PostStatus::Error),
            _ => None,
        }
    }
}

/// Insert view for one publish attempt. Rows are append-only and never
/// mutated after insert.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub status: PostStatus,
    pub content_type: ContentType,
    pub related_month: Option<String>,
    pub schedule_day: Option<u32>,
    pub post_id: Option<String>,
    pub error_message: Option<String>,
    pub source_data: Option<String>,
}

/// A stored post-log row, as returned by the reporting queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostLogEntry {
    pub id: i64,
    pub posted_at: DateTime<Utc>,
    pub text: String,
    pub status: String,
    pub content_type: String,
    pub related_month: Option<String>,
    pub schedule_day: Option<i64>,
    pub post_id: Option<String>,
    pub error_message: Option<String>,
    pub source_data: Option<String>,
}
