//! Post text formatters.
//!
//! Pure functions from backend payloads to short Spanish post text. Every
//! formatter returns `None` when its payload is empty or unusable — a
//! malformed or empty post is never emitted — and every output is capped
//! at [`POST_MAX_CHARS`] by deterministic truncation.

use chrono::NaiveDate;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub mod normalize;

use normalize::{pick_f64, pick_str, ranked_entries, Ranked};

/// Hard cap on post length, in characters.
pub const POST_MAX_CHARS: usize = 280;

const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

const AIRLINE_KEYS: &[&str] = &["Aerolinea Nombre", "aerolinea", "airline", "name"];
const AIRPORT_KEYS: &[&str] = &["Aeropuerto Nombre", "aeropuerto", "airport", "name"];
const COUNTRY_KEYS: &[&str] = &["Pais Destino Nombre", "pais", "country", "name"];
const ROUTE_KEYS: &[&str] = &["Ruta", "ruta", "route", "name"];
const COUNT_KEYS: &[&str] = &["total_vuelos", "vuelos", "Cantidad", "count"];
const OCCUPANCY_KEYS: &[&str] = &["ocupacion_porcentaje", "ocupacion", "occupancy"];
const MONTH_KEYS: &[&str] = &["Mes", "mes", "month"];

/// Cut to the cap and append an ellipsis if the text is oversize.
pub fn truncate_post(text: &str) -> String {
    if text.chars().count() <= POST_MAX_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(POST_MAX_CHARS - 1).collect();
    format!("{cut}…")
}

/// "2025-09" → "Septiembre 2025". Falls back to the input when the month
/// string does not parse.
pub fn format_month_name(month: &str) -> String {
    const MONTHS: [&str; 12] = [
        "Enero",
        "Febrero",
        "Marzo",
        "Abril",
        "Mayo",
        "Junio",
        "Julio",
        "Agosto",
        "Septiembre",
        "Octubre",
        "Noviembre",
        "Diciembre",
    ];
    match split_month(month) {
        Some((year, idx)) => format!("{} {}", MONTHS[idx], year),
        None => month.to_string(),
    }
}

/// "2025-09" → "Sep 25".
fn short_month_label(month: &str) -> String {
    const MONTHS: [&str; 12] = [
        "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
    ];
    match split_month(month) {
        // `split_month` guarantees a 4-digit ASCII year.
        Some((year, idx)) => format!("{} {}", MONTHS[idx], &year[2..]),
        None => month.to_string(),
    }
}

fn split_month(month: &str) -> Option<(&str, usize)> {
    let (year, num) = month.split_once('-')?;
    let num: usize = num.parse().ok()?;
    if !(1..=12).contains(&num) || year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((year, num - 1))
}

/// Month preceding the given "YYYY-MM": the month of the last day before
/// the 1st of `month`.
pub fn previous_month(month: &str) -> Option<String> {
    let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").ok()?;
    let last_of_prior = first.pred_opt()?;
    Some(last_of_prior.format("%Y-%m").to_string())
}

/// Hashtag-friendly form: "Septiembre 2025" → "Septiembre2025".
fn hashtag_month(month: &str) -> String {
    format_month_name(month).replace(' ', "")
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if n < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn format_count(v: f64) -> String {
    group_thousands(v.round() as i64)
}

/// Deterministic intro rotation: the same month always yields the same
/// phrasing across runs; different months usually vary.
fn summary_intro(month: &str) -> String {
    let pretty = format_month_name(month);
    let intros = [
        format!("📊 ¡{pretty} cerró con estos números!"),
        format!("🚀 Resumen de {pretty} - ¡Qué mes!"),
        format!("✈️ Los números de {pretty} que tienes que conocer:"),
        format!("📈 {pretty}: Un mes lleno de vuelos"),
    ];
    let digest = Sha256::digest(month.as_bytes());
    let seed = digest[0] as usize % intros.len();
    intros[seed].clone()
}

fn non_empty_object(data: &Value) -> Option<&serde_json::Map<String, Value>> {
    data.as_object().filter(|obj| !obj.is_empty())
}

fn truncated_label(label: &str, max: usize) -> String {
    label.chars().take(max).collect()
}

/// Medal-labelled top-3 block, one line per entry.
fn medal_lines(top: &[Ranked], label_max: usize, render: impl Fn(&Ranked) -> String) -> String {
    top.iter()
        .zip(MEDALS)
        .map(|(entry, medal)| {
            format!(
                "{medal} {}: {}\n",
                truncated_label(&entry.label, label_max),
                render(entry)
            )
        })
        .collect()
}

/// Monthly summary from the KPI payload.
pub fn monthly_summary(data: &Value, month: &str) -> Option<String> {
    let obj = non_empty_object(data)?;
    let flights = obj.get("total_vuelos").and_then(Value::as_f64).unwrap_or(0.0);
    let passengers = obj
        .get("total_pasajeros")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let occupancy = obj
        .get("ocupacion_promedio")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    let text = format!(
        "{intro}\n\n✈️ Vuelos: {flights}\n👥 Pasajeros: {passengers}\n📊 Ocupación: {occupancy:.1}%\n\naviadata.ar\n#AviacionArgentina #{tag}",
        intro = summary_intro(month),
        flights = format_count(flights),
        passengers = format_count(passengers),
        tag = hashtag_month(month),
    );
    Some(truncate_post(&text))
}

/// Top airlines by flight count.
pub fn top_airlines(data: &Value, month: &str) -> Option<String> {
    let ranked = ranked_entries(data, AIRLINE_KEYS, COUNT_KEYS);
    if ranked.is_empty() {
        return None;
    }
    let top = &ranked[..ranked.len().min(3)];

    let mut text = format!(
        "🏆 Top Aerolíneas {}\n¿Cuál es tu favorita?\n\n",
        format_month_name(month)
    );
    text.push_str(&medal_lines(top, 15, |e| {
        format!("{} vuelos", format_count(e.value))
    }));
    text.push_str(&format!("\naviadata.ar\n#Aerolineas #{}", hashtag_month(month)));
    Some(truncate_post(&text))
}

/// Busiest routes of the month.
pub fn busiest_routes(data: &Value, month: &str) -> Option<String> {
    let ranked = ranked_entries(data, ROUTE_KEYS, COUNT_KEYS);
    if ranked.is_empty() {
        return None;
    }
    let top = &ranked[..ranked.len().min(3)];

    let mut text = format!("🛫 Rutas más transitadas de {}\n\n", format_month_name(month));
    text.push_str(&medal_lines(top, 25, |e| {
        format!("{} vuelos", format_count(e.value))
    }));
    text.push_str(&format!("\naviadata.ar\n#Rutas #{}", hashtag_month(month)));
    Some(truncate_post(&text))
}

/// Most active airports by flight count.
pub fn top_airports(data: &Value, month: &str) -> Option<String> {
    let ranked = ranked_entries(data, AIRPORT_KEYS, COUNT_KEYS);
    if ranked.is_empty() {
        return None;
    }
    let top = &ranked[..ranked.len().min(3)];

    let mut text = format!(
        "🛬 Aeropuertos más activos de {}\n\n",
        format_month_name(month)
    );
    text.push_str(&medal_lines(top, 20, |e| {
        format!("{} vuelos", format_count(e.value))
    }));
    text.push_str(&format!(
        "\naviadata.ar\n#Aeropuertos #{}",
        hashtag_month(month)
    ));
    Some(truncate_post(&text))
}

/// Top international destination countries.
pub fn international_destinations(data: &Value, month: &str) -> Option<String> {
    let ranked = ranked_entries(data, COUNTRY_KEYS, COUNT_KEYS);
    if ranked.is_empty() {
        return None;
    }
    let top = &ranked[..ranked.len().min(3)];

    let mut text = format!(
        "🌍 ¿A dónde volamos en {}?\nTop destinos internacionales:\n\n",
        format_month_name(month)
    );
    text.push_str(&medal_lines(top, 15, |e| {
        format!("{} vuelos", format_count(e.value))
    }));
    text.push_str(&format!(
        "\naviadata.ar\n#DestinosInternacionales #{}",
        hashtag_month(month)
    ));
    Some(truncate_post(&text))
}

/// Top international routes, grouped by destination country.
pub fn international_routes(data: &Value, month: &str) -> Option<String> {
    let ranked = ranked_entries(data, COUNTRY_KEYS, COUNT_KEYS);
    if ranked.is_empty() {
        return None;
    }
    let top = &ranked[..ranked.len().min(3)];

    let mut text = format!(
        "🌐 Top rutas internacionales de {}\n\n",
        format_month_name(month)
    );
    text.push_str(&medal_lines(top, 15, |e| {
        format!("{} vuelos", format_count(e.value))
    }));
    text.push_str(&format!(
        "\naviadata.ar\n#RutasInternacionales #{}",
        hashtag_month(month)
    ));
    Some(truncate_post(&text))
}

/// Top airlines by average occupancy percentage.
pub fn average_occupancy(data: &Value, month: &str) -> Option<String> {
    let ranked = ranked_entries(data, AIRLINE_KEYS, OCCUPANCY_KEYS);
    if ranked.is_empty() {
        return None;
    }
    let top = &ranked[..ranked.len().min(3)];

    let mut text = format!(
        "📈 Ocupación Promedio {}\nTop aerolíneas:\n\n",
        format_month_name(month)
    );
    text.push_str(&medal_lines(top, 20, |e| format!("{:.1}%", e.value)));
    text.push_str(&format!("\naviadata.ar\n#Ocupacion #{}", hashtag_month(month)));
    Some(truncate_post(&text))
}

/// Flight-count evolution over the last four months with a trend line.
pub fn historical_trend(data: &Value, _month: &str) -> Option<String> {
    let items = data.as_array()?;
    let mut rows: Vec<(String, f64)> = items
        .iter()
        .filter_map(|item| {
            let label = pick_str(item, MONTH_KEYS)?;
            let count = pick_f64(item, COUNT_KEYS)?;
            Some((label, count))
        })
        .collect();
    if rows.len() < 2 {
        return None;
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    let tail = &rows[rows.len().saturating_sub(4)..];

    let mut text = String::from("📈 Evolución histórica de vuelos:\n\n");
    for (month_raw, count) in tail {
        text.push_str(&format!(
            "{}: {} vuelos\n",
            short_month_label(month_raw),
            format_count(*count)
        ));
    }

    let last = tail[tail.len() - 1].1;
    let prior = tail[tail.len() - 2].1;
    if prior > 0.0 {
        let change = (last - prior) / prior * 100.0;
        if change > 0.0 {
            text.push_str(&format!("\n📊 Crecimiento del {change:.1}%"));
        } else {
            text.push_str(&format!("\n📊 Variación del {change:.1}%"));
        }
    }

    text.push_str("\n\naviadata.ar\n#Aviación #Estadísticas");
    Some(truncate_post(&text))
}

/// Current month KPIs against the prior calendar month. Returns `None`
/// when the prior month has no data; a partial comparison is never shown.
pub fn monthly_comparison(current: &Value, prior: &Value, month: &str) -> Option<String> {
    let cur = non_empty_object(current)?;
    let prev = non_empty_object(prior)?;

    let cur_flights = cur.get("total_vuelos").and_then(Value::as_f64)?;
    let prev_flights = prev
        .get("total_vuelos")
        .and_then(Value::as_f64)
        .filter(|v| *v > 0.0)?;
    let cur_pax = cur.get("total_pasajeros").and_then(Value::as_f64).unwrap_or(0.0);
    let prev_pax = prev
        .get("total_pasajeros")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    let prior_month = previous_month(month)?;
    let flights_change = (cur_flights - prev_flights) / prev_flights * 100.0;

    let mut text = format!(
        "📊 {} vs {}\n\n✈️ Vuelos: {} ({:+.1}%)\n",
        format_month_name(month),
        format_month_name(&prior_month),
        format_count(cur_flights),
        flights_change,
    );
    if prev_pax > 0.0 {
        let pax_change = (cur_pax - prev_pax) / prev_pax * 100.0;
        text.push_str(&format!(
            "👥 Pasajeros: {} ({:+.1}%)\n",
            format_count(cur_pax),
            pax_change
        ));
    }
    text.push_str(&format!(
        "\naviadata.ar\n#AviacionArgentina #{}",
        hashtag_month(month)
    ));
    Some(truncate_post(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kpis() -> Value {
        json!({
            "total_vuelos": 24931,
            "total_pasajeros": 3120455,
            "ocupacion_promedio": 81.25
        })
    }

    #[test]
    fn truncation_caps_pathological_input() {
        let long = "✈".repeat(5000);
        let capped = truncate_post(&long);
        assert_eq!(capped.chars().count(), POST_MAX_CHARS);
        assert!(capped.ends_with('…'));

        let short = "hola";
        assert_eq!(truncate_post(short), "hola");
    }

    #[test]
    fn month_names() {
        assert_eq!(format_month_name("2025-09"), "Septiembre 2025");
        assert_eq!(format_month_name("2024-01"), "Enero 2024");
        assert_eq!(format_month_name("garbage"), "garbage");
        assert_eq!(short_month_label("2025-09"), "Sep 25");
    }

    #[test]
    fn previous_month_crosses_year_boundary() {
        assert_eq!(previous_month("2025-09").as_deref(), Some("2025-08"));
        assert_eq!(previous_month("2025-01").as_deref(), Some("2024-12"));
        assert!(previous_month("nope").is_none());
    }

    #[test]
    fn summary_is_deterministic_per_month() {
        let a = monthly_summary(&kpis(), "2025-09").unwrap();
        let b = monthly_summary(&kpis(), "2025-09").unwrap();
        assert_eq!(a, b);
        assert!(a.contains("✈️ Vuelos: 24,931"));
        assert!(a.contains("👥 Pasajeros: 3,120,455"));
        assert!(a.contains("📊 Ocupación: 81.2%") || a.contains("📊 Ocupación: 81.3%"));
        assert!(a.contains("#Septiembre2025"));
        assert!(a.chars().count() <= POST_MAX_CHARS);
    }

    #[test]
    fn summary_rejects_empty_payloads() {
        assert!(monthly_summary(&json!({}), "2025-09").is_none());
        assert!(monthly_summary(&Value::Null, "2025-09").is_none());
        assert!(monthly_summary(&json!([1, 2]), "2025-09").is_none());
    }

    #[test]
    fn top_airlines_ranks_and_excludes_zero_counts() {
        let data = json!([
            {"name": "A", "count": 0},
            {"name": "B", "count": 50},
            {"name": "C", "count": 30},
        ]);
        let text = top_airlines(&data, "2025-09").unwrap();
        let b_at = text.find("🥇 B").unwrap();
        let c_at = text.find("🥈 C").unwrap();
        assert!(b_at < c_at);
        assert!(!text.contains("A:"));

        let all_zero = json!([{"name": "A", "count": 0}]);
        assert!(top_airlines(&all_zero, "2025-09").is_none());
    }

    #[test]
    fn top_airlines_accepts_original_field_names() {
        let data = json!([
            {"Aerolinea Nombre": "Aerolíneas Argentinas SA", "total_vuelos": 9120},
            {"Aerolinea Nombre": "Flybondi", "total_vuelos": 3100},
        ]);
        let text = top_airlines(&data, "2025-09").unwrap();
        // Labels are cut to 15 chars.
        assert!(text.contains("🥇 Aerolíneas Arge: 9,120 vuelos"));
        assert!(text.contains("🥈 Flybondi: 3,100 vuelos"));
    }

    #[test]
    fn occupancy_formats_percentages() {
        let data = json!([
            {"Aerolinea Nombre": "A1", "ocupacion_porcentaje": 91.37},
            {"Aerolinea Nombre": "A2", "ocupacion_porcentaje": 84.0},
            {"Aerolinea Nombre": "A3", "ocupacion_porcentaje": 79.5},
            {"Aerolinea Nombre": "A4", "ocupacion_porcentaje": 60.1},
        ]);
        let text = average_occupancy(&data, "2025-09").unwrap();
        assert!(text.contains("🥇 A1: 91.4%"));
        assert!(text.contains("🥉 A3: 79.5%"));
        assert!(!text.contains("A4"));
    }

    #[test]
    fn trend_takes_last_four_months_and_reports_change() {
        let data = json!([
            {"Mes": "2025-09", "Cantidad": 1100},
            {"Mes": "2025-05", "Cantidad": 900},
            {"Mes": "2025-06", "Cantidad": 950},
            {"Mes": "2025-07", "Cantidad": 980},
            {"Mes": "2025-08", "Cantidad": 1000},
        ]);
        let text = historical_trend(&data, "2025-09").unwrap();
        assert!(!text.contains("May 25"));
        assert!(text.contains("Jun 25: 950 vuelos"));
        assert!(text.contains("Sep 25: 1,100 vuelos"));
        assert!(text.contains("📊 Crecimiento del 10.0%"));
    }

    #[test]
    fn trend_keeps_malformed_month_labels_verbatim() {
        // A year with a multibyte character must not split mid-character;
        // the raw label is shown as-is instead.
        let data = json!([
            {"Mes": "2é5-08", "Cantidad": 1000},
            {"Mes": "2é5-09", "Cantidad": 1100},
        ]);
        let text = historical_trend(&data, "2025-09").unwrap();
        assert!(text.contains("2é5-08: 1,000 vuelos"));
        assert!(text.contains("2é5-09: 1,100 vuelos"));
        assert_eq!(format_month_name("2é5-09"), "2é5-09");
    }

    #[test]
    fn trend_needs_at_least_two_months() {
        let data = json!([{"Mes": "2025-09", "Cantidad": 1100}]);
        assert!(historical_trend(&data, "2025-09").is_none());
    }

    #[test]
    fn comparison_requires_prior_month_data() {
        let cur = kpis();
        assert!(monthly_comparison(&cur, &json!({}), "2025-09").is_none());
        assert!(monthly_comparison(&cur, &Value::Null, "2025-09").is_none());
        assert!(
            monthly_comparison(&cur, &json!({"total_vuelos": 0}), "2025-09").is_none()
        );

        let prior = json!({"total_vuelos": 20000, "total_pasajeros": 3000000});
        let text = monthly_comparison(&cur, &prior, "2025-09").unwrap();
        assert!(text.contains("Septiembre 2025 vs Agosto 2025"));
        assert!(text.contains("✈️ Vuelos: 24,931 (+24."));
        assert!(text.chars().count() <= POST_MAX_CHARS);
    }

    #[test]
    fn all_ranking_formatters_stay_under_cap_with_huge_labels() {
        let huge = "X".repeat(1000);
        let data = json!([
            {"name": huge.clone(), "count": 500},
            {"name": huge.clone(), "count": 400},
            {"name": huge, "count": 300},
        ]);
        for text in [
            top_airlines(&data, "2025-09").unwrap(),
            busiest_routes(&data, "2025-09").unwrap(),
            top_airports(&data, "2025-09").unwrap(),
            international_destinations(&data, "2025-09").unwrap(),
            international_routes(&data, "2025-09").unwrap(),
        ] {
            assert!(text.chars().count() <= POST_MAX_CHARS);
        }
    }

    #[test]
    fn grouping_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(3120455), "3,120,455");
        assert_eq!(group_thousands(-12345), "-12,345");
    }
}
