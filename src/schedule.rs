//! Due-date arithmetic for lubrication cycles.
//!
//! Everything here works on calendar dates (`NaiveDate`); there is no
//! timezone conversion anywhere in the scheduling path.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::ServiceError;
use crate::models::equipment::Equipment;

/// Schedule state of one piece of equipment relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceStatus {
    Ok,
    Due,
    Overdue,
}

/// Adds `cycle_days` calendar days to `last_date`.
pub fn compute_next_date(last_date: NaiveDate, cycle_days: u32) -> Result<NaiveDate, ServiceError> {
    last_date
        .checked_add_days(Days::new(u64::from(cycle_days)))
        .ok_or_else(|| {
            ServiceError::InvalidDate(format!(
                "{} + {} days is out of range",
                last_date, cycle_days
            ))
        })
}

/// OVERDUE if the next date is in the past, DUE if it is today, OK otherwise.
pub fn classify_status(next_date: NaiveDate, today: NaiveDate) -> ServiceStatus {
    if next_date < today {
        ServiceStatus::Overdue
    } else if next_date == today {
        ServiceStatus::Due
    } else {
        ServiceStatus::Ok
    }
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(text: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| ServiceError::InvalidDate(format!("{:?}: {}", text, e)))
}

/// Equipment due today or earlier, most overdue first.
pub fn due_items(equipment: &[Equipment], today: NaiveDate) -> Vec<Equipment> {
    let mut due: Vec<Equipment> = equipment
        .iter()
        .filter(|eq| eq.next_service_date <= today)
        .cloned()
        .collect();
    due.sort_by(|a, b| a.next_service_date.cmp(&b.next_service_date));
    due
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub ok: usize,
    pub due: usize,
    pub overdue: usize,
    pub total: usize,
}

pub fn status_summary(equipment: &[Equipment], today: NaiveDate) -> StatusSummary {
    equipment
        .iter()
        .fold(StatusSummary::default(), |mut summary, eq| {
            match classify_status(eq.next_service_date, today) {
                ServiceStatus::Ok => summary.ok += 1,
                ServiceStatus::Due => summary.due += 1,
                ServiceStatus::Overdue => summary.overdue += 1,
            }
            summary.total += 1;
            summary
        })
}

/// Source of "today" for scheduling and retention decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant, used by tests and replays
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn on(date: NaiveDate) -> Self {
        FixedClock(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub type SharedClock = Arc<dyn Clock>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn equipment(id: &str, next: &str) -> Equipment {
        Equipment {
            id: id.to_string(),
            name: format!("Pump {}", id),
            equipment_type: "Pump".into(),
            location: "Pump room".into(),
            lubricant: "ISO VG 46".into(),
            cycle_days: 30,
            last_service_date: date(next) - Days::new(30),
            next_service_date: date(next),
            capacity: "2L".into(),
            notes: None,
        }
    }

    #[test]
    fn next_date_adds_calendar_days() {
        assert_eq!(compute_next_date(date("2024-01-01"), 30).unwrap(), date("2024-01-31"));
    }

    #[test]
    fn next_date_crosses_leap_february() {
        assert_eq!(compute_next_date(date("2024-02-05"), 30).unwrap(), date("2024-03-06"));
        assert_eq!(compute_next_date(date("2023-02-05"), 30).unwrap(), date("2023-03-07"));
    }

    #[test]
    fn zero_cycle_keeps_date() {
        assert_eq!(compute_next_date(date("2024-06-02"), 0).unwrap(), date("2024-06-02"));
    }

    #[test]
    fn next_date_out_of_range_is_invalid() {
        assert_matches!(
            compute_next_date(NaiveDate::MAX, 1),
            Err(ServiceError::InvalidDate(_))
        );
    }

    #[rstest]
    #[case("2024-06-01", "2024-06-02", ServiceStatus::Overdue)]
    #[case("2024-06-02", "2024-06-02", ServiceStatus::Due)]
    #[case("2024-06-03", "2024-06-02", ServiceStatus::Ok)]
    #[case("2023-12-31", "2024-01-01", ServiceStatus::Overdue)]
    fn status_is_classified_on_calendar_dates(
        #[case] next: &str,
        #[case] today: &str,
        #[case] expected: ServiceStatus,
    ) {
        assert_eq!(classify_status(date(next), date(today)), expected);
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert_matches!(parse_date("2024-13-01"), Err(ServiceError::InvalidDate(_)));
        assert_matches!(parse_date("yesterday"), Err(ServiceError::InvalidDate(_)));
    }

    #[test]
    fn due_items_are_sorted_most_overdue_first() {
        let list = vec![
            equipment("a", "2024-06-02"),
            equipment("b", "2024-05-20"),
            equipment("c", "2024-07-01"),
        ];
        let due = due_items(&list, date("2024-06-02"));
        let ids: Vec<&str> = due.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn summary_counts_each_status() {
        let list = vec![
            equipment("a", "2024-06-02"),
            equipment("b", "2024-05-20"),
            equipment("c", "2024-07-01"),
            equipment("d", "2024-08-01"),
        ];
        let summary = status_summary(&list, date("2024-06-02"));
        assert_eq!(
            summary,
            StatusSummary {
                ok: 2,
                due: 1,
                overdue: 1,
                total: 4
            }
        );
    }

    #[test]
    fn fixed_clock_reports_its_date() {
        let clock = FixedClock::on(date("2024-06-02"));
        assert_eq!(clock.today(), date("2024-06-02"));
    }
}
