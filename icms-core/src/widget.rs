//! Dashboard widget identifiers and export formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DashboardError;

/// A dashboard widget that can be fetched on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "kebab-case")]
pub enum WidgetId {
    SystemHealth,
    ContentStats,
    UserActivity,
    HrSummary,
    MarketingPerformance,
}

impl WidgetId {
    pub const ALL: [WidgetId; 5] = [
        WidgetId::SystemHealth,
        WidgetId::ContentStats,
        WidgetId::UserActivity,
        WidgetId::HrSummary,
        WidgetId::MarketingPerformance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetId::SystemHealth => "system-health",
            WidgetId::ContentStats => "content-stats",
            WidgetId::UserActivity => "user-activity",
            WidgetId::HrSummary => "hr-summary",
            WidgetId::MarketingPerformance => "marketing-performance",
        }
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetId {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WidgetId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| DashboardError::UnknownWidget {
                widget_id: s.to_string(),
            })
    }
}

/// Output format of a dashboard export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(DashboardError::InvalidExportFormat {
                format: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_ids_round_trip_through_str() -> Result<(), DashboardError> {
        for id in WidgetId::ALL {
            assert_eq!(id.as_str().parse::<WidgetId>()?, id);
        }
        Ok(())
    }

    #[test]
    fn test_unknown_widget_rejected() {
        let err = "nonexistent".parse::<WidgetId>().unwrap_err();
        assert_eq!(
            err,
            DashboardError::UnknownWidget {
                widget_id: "nonexistent".to_string()
            }
        );
    }

    #[test]
    fn test_widget_serde_matches_as_str() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&WidgetId::MarketingPerformance)?;
        assert_eq!(json, "\"marketing-performance\"");
        Ok(())
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().ok(), Some(ExportFormat::Csv));
        assert!(matches!(
            "xlsx".parse::<ExportFormat>(),
            Err(DashboardError::InvalidExportFormat { .. })
        ));
    }
}
