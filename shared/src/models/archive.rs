//! Archive and bulk listing operations

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::property::PropertyStatus;

/// Reason recorded when a bulk archive request gives none
pub const DEFAULT_ARCHIVE_REASON: &str = "Bulk archive operation";

/// Bulk operation over a set of listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BulkAction {
    Archive {
        #[serde(default)]
        reason: Option<String>,
    },
    /// Restores listings as `available`
    Unarchive,
    UpdateStatus {
        status: PropertyStatus,
    },
    Delete,
}

impl BulkAction {
    pub fn name(&self) -> &'static str {
        match self {
            BulkAction::Archive { .. } => "archive",
            BulkAction::Unarchive => "unarchive",
            BulkAction::UpdateStatus { .. } => "update_status",
            BulkAction::Delete => "delete",
        }
    }

    pub fn archive_reason(&self) -> Option<&str> {
        match self {
            BulkAction::Archive { reason } => Some(
                reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .unwrap_or(DEFAULT_ARCHIVE_REASON),
            ),
            _ => None,
        }
    }
}

/// Bulk request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRequest {
    #[serde(flatten)]
    pub action: BulkAction,
    #[serde(default)]
    pub property_ids: Vec<Uuid>,
}

/// One listing touched by a bulk operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedProperty {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<PropertyStatus>,
    pub action: String,
}

/// How busy archiving has been recently
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivityLevel {
    Low,
    Medium,
    High,
}

impl ActivityLevel {
    /// High above 5 archives in the last week, Medium above 2
    pub fn from_weekly_count(archived_last_7_days: i64) -> Self {
        if archived_last_7_days > 5 {
            ActivityLevel::High
        } else if archived_last_7_days > 2 {
            ActivityLevel::Medium
        } else {
            ActivityLevel::Low
        }
    }
}

/// Archive overview for the master dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveOverview {
    pub total_archived: i64,
    pub total_active: i64,
    pub archived_last_30_days: i64,
    pub archived_last_7_days: i64,
    pub last_archived_date: Option<DateTime<Utc>>,
    pub users_with_archived_properties: i64,
    /// Percentage of all listings that are archived, one decimal place
    pub archive_rate: f64,
    pub activity_level: ActivityLevel,
}

impl ArchiveOverview {
    pub fn archive_rate(total_archived: i64, total_active: i64) -> f64 {
        let total = total_archived + total_active;
        if total <= 0 {
            return 0.0;
        }
        let rate = total_archived as f64 / total as f64 * 100.0;
        (rate * 10.0).round() / 10.0
    }
}

/// Recently archived listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentArchive {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub archived_by: String,
}

/// Full archive statistics payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveStats {
    pub timestamp: DateTime<Utc>,
    pub overview: ArchiveOverview,
    pub reason_breakdown: BTreeMap<String, i64>,
    pub most_common_reason: Option<String>,
    pub recent_archives: Vec<RecentArchive>,
}

/// Most frequent reason; ties resolve to the alphabetically first reason
pub fn most_common_reason(breakdown: &BTreeMap<String, i64>) -> Option<String> {
    breakdown
        .iter()
        .fold(None::<(&String, i64)>, |best, (reason, count)| match best {
            Some((_, best_count)) if best_count >= *count => best,
            _ => Some((reason, *count)),
        })
        .map(|(reason, _)| reason.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_levels() {
        assert_eq!(ActivityLevel::from_weekly_count(0), ActivityLevel::Low);
        assert_eq!(ActivityLevel::from_weekly_count(2), ActivityLevel::Low);
        assert_eq!(ActivityLevel::from_weekly_count(3), ActivityLevel::Medium);
        assert_eq!(ActivityLevel::from_weekly_count(5), ActivityLevel::Medium);
        assert_eq!(ActivityLevel::from_weekly_count(6), ActivityLevel::High);
    }

    #[test]
    fn test_archive_rate() {
        assert_eq!(ArchiveOverview::archive_rate(0, 0), 0.0);
        assert_eq!(ArchiveOverview::archive_rate(1, 2), 33.3);
        assert_eq!(ArchiveOverview::archive_rate(5, 5), 50.0);
    }

    #[test]
    fn test_bulk_request_parsing() {
        let req: BulkRequest = serde_json::from_str(
            r#"{"action": "update_status", "status": "sold", "property_ids": []}"#,
        )
        .unwrap();
        assert_eq!(
            req.action,
            BulkAction::UpdateStatus {
                status: PropertyStatus::Sold
            }
        );

        let archive: BulkRequest =
            serde_json::from_str(r#"{"action": "archive", "property_ids": []}"#).unwrap();
        assert_eq!(archive.action.archive_reason(), Some(DEFAULT_ARCHIVE_REASON));
    }

    #[test]
    fn test_most_common_reason() {
        let mut breakdown = BTreeMap::new();
        assert_eq!(most_common_reason(&breakdown), None);

        breakdown.insert("Sold".to_string(), 3);
        breakdown.insert("Duplicate".to_string(), 3);
        breakdown.insert("Expired".to_string(), 1);
        assert_eq!(most_common_reason(&breakdown), Some("Duplicate".to_string()));
    }
}
