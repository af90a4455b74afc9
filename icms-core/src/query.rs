//! Dashboard query parameters and the metrics window they resolve to.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{DashboardError, DashboardResult};

/// Number of hex characters kept from the query digest.
const QUERY_KEY_LEN: usize = 16;

/// Relative reporting period used when no explicit start date is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl Period {
    pub fn duration(&self) -> ChronoDuration {
        match self {
            Period::Day => ChronoDuration::days(1),
            Period::Week => ChronoDuration::days(7),
            Period::Month => ChronoDuration::days(30),
            Period::Quarter => ChronoDuration::days(90),
            Period::Year => ChronoDuration::days(365),
        }
    }
}

/// Filters accepted by every dashboard read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema, utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    /// Restricts the HR employee count to one department.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
}

impl DashboardQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_department(mut self, department_id: Uuid) -> Self {
        self.department_id = Some(department_id);
        self
    }

    /// Stable digest of the query, used as the cache key suffix.
    ///
    /// Equal queries always produce equal keys; field order is fixed by the
    /// struct definition.
    pub fn cache_key(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        let mut key = hex::encode(digest);
        key.truncate(QUERY_KEY_LEN);
        key
    }

    /// Resolve the query into a concrete time window relative to `now`.
    pub fn window(&self, now: DateTime<Utc>) -> DashboardResult<MetricsWindow> {
        let period = self.period.unwrap_or_default().duration();

        let (start, end) = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => {
                if start > now {
                    return Err(DashboardError::InvalidQuery {
                        reason: "startDate is in the future".to_string(),
                    });
                }
                (start, now)
            }
            (None, Some(end)) => (window_start(end, period)?, end),
            (None, None) => (window_start(now, period)?, now),
        };

        if start > end {
            return Err(DashboardError::InvalidQuery {
                reason: format!("startDate {} is after endDate {}", start, end),
            });
        }

        Ok(MetricsWindow { start, end })
    }
}

/// `end - period`, rejecting ends so early the subtraction leaves chrono's range.
fn window_start(end: DateTime<Utc>, period: ChronoDuration) -> DashboardResult<DateTime<Utc>> {
    end.checked_sub_signed(period)
        .ok_or_else(|| DashboardError::InvalidQuery {
            reason: "date out of range".to_string(),
        })
}

/// Inclusive time window the windowed metrics are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_default_window_is_last_month() -> DashboardResult<()> {
        let window = DashboardQuery::new().window(now())?;
        assert_eq!(window.end, now());
        assert_eq!((window.end - window.start).num_days(), 30);
        Ok(())
    }

    #[test]
    fn test_end_only_window_uses_period() -> DashboardResult<()> {
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let query = DashboardQuery {
            end_date: Some(end),
            period: Some(Period::Week),
            ..Default::default()
        };
        let window = query.window(now())?;
        assert_eq!(window.end, end);
        assert_eq!((window.end - window.start).num_days(), 7);
        Ok(())
    }

    #[test]
    fn test_inverted_range_rejected() {
        let query = DashboardQuery::new().with_range(now(), now() - ChronoDuration::days(1));
        assert!(matches!(
            query.window(now()),
            Err(DashboardError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn test_future_start_rejected() {
        let query = DashboardQuery {
            start_date: Some(now() + ChronoDuration::days(1)),
            ..Default::default()
        };
        assert!(query.window(now()).is_err());
    }

    #[test]
    fn test_end_at_minimum_date_is_rejected_not_panicking() {
        let earliest: DateTime<Utc> = "-262143-01-05T00:00:00Z".parse().unwrap();
        let query = DashboardQuery {
            end_date: Some(earliest),
            ..Default::default()
        };
        match query.window(now()) {
            Err(DashboardError::InvalidQuery { reason }) => assert_eq!(reason, "date out of range"),
            other => panic!("expected InvalidQuery, got {:?}", other),
        }
    }

    #[test]
    fn test_cache_key_stable_and_distinct() {
        let a = DashboardQuery::new().with_period(Period::Week);
        let b = DashboardQuery::new().with_period(Period::Week);
        let c = DashboardQuery::new().with_period(Period::Year);

        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert_eq!(a.cache_key().len(), 16);
    }
}
