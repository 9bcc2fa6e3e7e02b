//! The monthly publishing schedule.
//!
//! A fixed, immutable day-of-month → content-type table, ordered
//! day-ascending; the catch-up loop depends on that ordering. Day 0 is
//! the monthly summary fired directly by month-rollover detection.

use crate::model::ContentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub day: u32,
    pub content_type: ContentType,
    pub description: &'static str,
}

const fn entry(day: u32, content_type: ContentType, description: &'static str) -> ScheduleEntry {
    ScheduleEntry {
        day,
        content_type,
        description,
    }
}

static SCHEDULE: [ScheduleEntry; 14] = [
    entry(0, ContentType::MonthlySummary, "Resumen mensual del mes nuevo"),
    entry(2, ContentType::TopAirlines, "Top aerolíneas"),
    entry(4, ContentType::BusiestRoutes, "Rutas más transitadas"),
    entry(6, ContentType::TopAirports, "Aeropuertos más activos"),
    entry(8, ContentType::InternationalDestinations, "Destinos internacionales"),
    entry(10, ContentType::HistoricalTrend, "Evolución histórica"),
    entry(12, ContentType::AverageOccupancy, "Ocupación promedio"),
    entry(14, ContentType::AirportComparison, "Comparativa aeropuertos"),
    entry(16, ContentType::DailyRecords, "Día récords y curiosidades"),
    entry(18, ContentType::UnusualAirlines, "Aerolíneas inusuales"),
    entry(20, ContentType::MonthlyComparison, "Comparativa mensual con mes anterior"),
    entry(22, ContentType::InternationalRoutes, "Top rutas internacionales"),
    entry(24, ContentType::ClassAverages, "Promedios por clase de vuelo"),
    entry(26, ContentType::MonthlyRecap, "Recap gráfico mensual"),
];

/// The full schedule, day-ascending.
pub fn entries() -> &'static [ScheduleEntry] {
    &SCHEDULE
}

/// Entries whose day has been reached by `day_of_month`, day-ascending.
pub fn entries_due(day_of_month: u32) -> impl Iterator<Item = &'static ScheduleEntry> {
    SCHEDULE.iter().filter(move |e| e.day <= day_of_month)
}

pub fn entry_for_day(day: u32) -> Option<&'static ScheduleEntry> {
    SCHEDULE.iter().find(|e| e.day == day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_is_day_ascending_and_unique() {
        let days: Vec<u32> = entries().iter().map(|e| e.day).collect();
        let mut sorted = days.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(days, sorted);
        assert!(days.iter().all(|d| *d <= 31));
    }

    #[test]
    fn due_entries_stop_at_today() {
        // Day 5 with entries at 0, 2, 4, 6: only 0, 2, 4 are due.
        let due: Vec<u32> = entries_due(5).map(|e| e.day).collect();
        assert_eq!(due, vec![0, 2, 4]);

        assert_eq!(entries_due(0).count(), 1);
        assert_eq!(entries_due(31).count(), entries().len());
    }

    #[test]
    fn day_lookup() {
        assert_eq!(
            entry_for_day(0).map(|e| e.content_type),
            Some(ContentType::MonthlySummary)
        );
        assert_eq!(
            entry_for_day(20).map(|e| e.content_type),
            Some(ContentType::MonthlyComparison)
        );
        assert!(entry_for_day(1).is_none());
    }
}
