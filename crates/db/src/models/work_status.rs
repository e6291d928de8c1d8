use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// Progress of a work order or work session.
///
/// Not stored: it is derived from the nullable `started_at` / `completed_at` columns.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl WorkStatus {
    pub fn from_dates(
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        match (started_at, completed_at) {
            (_, Some(_)) => WorkStatus::Completed,
            (Some(_), None) => WorkStatus::InProgress,
            (None, None) => WorkStatus::Pending,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, WorkStatus::Completed)
    }

    /// SQL predicate over a table alias that selects rows in this status.
    pub fn sql_predicate(&self, alias: &str) -> String {
        match self {
            WorkStatus::Pending => {
                format!("({alias}.started_at IS NULL AND {alias}.completed_at IS NULL)")
            }
            WorkStatus::InProgress => {
                format!("({alias}.started_at IS NOT NULL AND {alias}.completed_at IS NULL)")
            }
            WorkStatus::Completed => format!("({alias}.completed_at IS NOT NULL)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_status_from_dates() {
        let now = Utc::now();
        assert_eq!(WorkStatus::from_dates(None, None), WorkStatus::Pending);
        assert_eq!(WorkStatus::from_dates(Some(now), None), WorkStatus::InProgress);
        assert_eq!(WorkStatus::from_dates(Some(now), Some(now)), WorkStatus::Completed);
        // A completion date wins even if the start was never recorded
        assert_eq!(WorkStatus::from_dates(None, Some(now)), WorkStatus::Completed);
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        assert_eq!(WorkStatus::InProgress.to_string(), "in_progress");
        assert_eq!(WorkStatus::from_str("completed").unwrap(), WorkStatus::Completed);
        assert!(WorkStatus::from_str("invoiced").is_err());
    }

    #[test]
    fn test_sql_predicate_uses_alias() {
        assert_eq!(
            WorkStatus::Completed.sql_predicate("wo"),
            "(wo.completed_at IS NOT NULL)"
        );
    }
}
