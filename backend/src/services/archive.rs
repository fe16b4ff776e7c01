//! Archive dashboard and bulk listing operations

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use shared::models::{
    most_common_reason, ActivityLevel, ArchiveOverview, ArchiveStats, BulkAction, BulkRequest,
    ProcessedProperty, Property, PropertyStatus, RecentArchive,
};
use shared::types::BatchResult;
use sqlx::PgPool;
use uuid::Uuid;

use super::property::{PropertyRow, PropertyService, PROPERTY_COLUMNS};
use crate::error::{AppError, AppResult};

/// Archive service
#[derive(Clone)]
pub struct ArchiveService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct OverviewRow {
    total_archived: i64,
    total_active: i64,
    archived_last_30_days: i64,
    archived_last_7_days: i64,
    last_archived_date: Option<DateTime<Utc>>,
    users_with_archived_properties: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct RecentArchiveRow {
    id: Uuid,
    name: String,
    location: Option<String>,
    archived_at: Option<DateTime<Utc>>,
    archive_reason: Option<String>,
    archived_by: String,
}

const RECENT_ARCHIVE_LIMIT: i64 = 10;

impl ArchiveService {
    /// Create a new ArchiveService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Archived listings, most recently archived first
    pub async fn list_archived(&self) -> AppResult<Vec<Property>> {
        let rows = sqlx::query_as::<_, PropertyRow>(&format!(
            r#"
            SELECT {}
            FROM properties
            WHERE status = 'archived'
            ORDER BY archived_at DESC NULLS LAST
            "#,
            PROPERTY_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Property::try_from).collect()
    }

    /// Archive dashboard statistics
    pub async fn archive_stats(&self) -> AppResult<ArchiveStats> {
        let overview = sqlx::query_as::<_, OverviewRow>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'archived') AS total_archived,
                COUNT(*) FILTER (WHERE status <> 'archived') AS total_active,
                COUNT(*) FILTER (WHERE status = 'archived'
                                   AND archived_at >= NOW() - INTERVAL '30 days') AS archived_last_30_days,
                COUNT(*) FILTER (WHERE status = 'archived'
                                   AND archived_at >= NOW() - INTERVAL '7 days') AS archived_last_7_days,
                MAX(archived_at) FILTER (WHERE status = 'archived') AS last_archived_date,
                COUNT(DISTINCT created_by) FILTER (WHERE status = 'archived') AS users_with_archived_properties
            FROM properties
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let reasons: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT COALESCE(NULLIF(archive_reason, ''), 'No reason provided') AS reason,
                   COUNT(*) AS count
            FROM properties
            WHERE status = 'archived'
            GROUP BY 1
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        let reason_breakdown: BTreeMap<String, i64> = reasons.into_iter().collect();

        let recent = sqlx::query_as::<_, RecentArchiveRow>(
            r#"
            SELECT p.id, p.name, p.location, p.archived_at, p.archive_reason,
                   COALESCE(u.name, u.email, 'Unknown') AS archived_by
            FROM properties p
            LEFT JOIN users u ON u.id = p.created_by
            WHERE p.status = 'archived'
            ORDER BY p.archived_at DESC NULLS LAST
            LIMIT $1
            "#,
        )
        .bind(RECENT_ARCHIVE_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(ArchiveStats {
            timestamp: Utc::now(),
            overview: ArchiveOverview {
                total_archived: overview.total_archived,
                total_active: overview.total_active,
                archived_last_30_days: overview.archived_last_30_days,
                archived_last_7_days: overview.archived_last_7_days,
                last_archived_date: overview.last_archived_date,
                users_with_archived_properties: overview.users_with_archived_properties,
                archive_rate: ArchiveOverview::archive_rate(
                    overview.total_archived,
                    overview.total_active,
                ),
                activity_level: ActivityLevel::from_weekly_count(overview.archived_last_7_days),
            },
            most_common_reason: most_common_reason(&reason_breakdown),
            reason_breakdown,
            recent_archives: recent
                .into_iter()
                .map(|row| RecentArchive {
                    id: row.id,
                    name: row.name,
                    location: row.location,
                    archived_at: row.archived_at,
                    reason: row.archive_reason,
                    archived_by: row.archived_by,
                })
                .collect(),
        })
    }

    /// Apply one action to each listing; per-item failures do not stop the batch
    pub async fn bulk_update(&self, request: &BulkRequest) -> AppResult<BatchResult<ProcessedProperty>> {
        if request.property_ids.is_empty() {
            return Err(AppError::Validation {
                field: "property_ids".to_string(),
                message: "Property IDs array is required and cannot be empty".to_string(),
            });
        }
        if let BulkAction::UpdateStatus { status } = &request.action {
            if !PropertyStatus::ASSIGNABLE.contains(status) {
                return Err(AppError::Validation {
                    field: "status".to_string(),
                    message: format!("Invalid status: {}. Use the archive action instead", status),
                });
            }
        }

        let properties = PropertyService::new(self.db.clone());
        let mut batch = BatchResult::new(request.property_ids.len());

        for &property_id in &request.property_ids {
            let existing = match properties.find_property(property_id).await {
                Ok(Some(property)) => property,
                Ok(None) => {
                    batch.record_failure(Some(property_id), "Property not found");
                    continue;
                }
                Err(e) => {
                    batch.record_failure(Some(property_id), e.to_string());
                    continue;
                }
            };

            match self.apply(&request.action, &existing).await {
                Ok(processed) => batch.record_success(processed),
                Err(e) => batch.record_failure(Some(property_id), e.to_string()),
            }
        }

        tracing::info!(
            action = request.action.name(),
            successful = batch.successful,
            requested = batch.total_requested,
            "Bulk operation completed"
        );

        Ok(batch)
    }

    async fn apply(&self, action: &BulkAction, property: &Property) -> AppResult<ProcessedProperty> {
        let (new_status, label) = match action {
            BulkAction::Archive { .. } => {
                sqlx::query(
                    r#"
                    UPDATE properties
                    SET status = 'archived', archived_at = NOW(), archive_reason = $1, updated_at = NOW()
                    WHERE id = $2
                    "#,
                )
                .bind(action.archive_reason())
                .bind(property.id)
                .execute(&self.db)
                .await?;
                (Some(PropertyStatus::Archived), "archived")
            }
            BulkAction::Unarchive => {
                if property.status != PropertyStatus::Archived {
                    return Err(AppError::Conflict("Property is not archived".to_string()));
                }
                sqlx::query(
                    r#"
                    UPDATE properties
                    SET status = 'available', archived_at = NULL, archive_reason = NULL, updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(property.id)
                .execute(&self.db)
                .await?;
                (Some(PropertyStatus::Available), "unarchived")
            }
            BulkAction::UpdateStatus { status } => {
                sqlx::query(
                    r#"
                    UPDATE properties
                    SET status = $1, archived_at = NULL, archive_reason = NULL, updated_at = NOW()
                    WHERE id = $2
                    "#,
                )
                .bind(status.as_str())
                .bind(property.id)
                .execute(&self.db)
                .await?;
                (Some(*status), "status_updated")
            }
            BulkAction::Delete => {
                sqlx::query("DELETE FROM properties WHERE id = $1")
                    .bind(property.id)
                    .execute(&self.db)
                    .await?;
                (None, "deleted")
            }
        };

        Ok(ProcessedProperty {
            id: property.id,
            name: property.name.clone(),
            new_status,
            action: label.to_string(),
        })
    }
}
