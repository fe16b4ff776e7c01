//! Sharing link service for the `property_shares` table

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use shared::models::{CreateShareInput, Property, ShareLink, ShareStatus};
use sqlx::PgPool;
use uuid::Uuid;

use super::PropertyService;
use crate::error::{AppError, AppResult};

/// Sharing link service
#[derive(Clone)]
pub struct ShareService {
    db: PgPool,
}

/// Sharing link row as stored
#[derive(Debug, sqlx::FromRow)]
pub struct ShareRow {
    pub id: Uuid,
    pub property_id: Uuid,
    pub token: String,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub custom_message: Option<String>,
    pub allowed_views: Option<i32>,
    pub view_count: i32,
    pub allow_downloads: bool,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ShareRow> for ShareLink {
    fn from(row: ShareRow) -> Self {
        ShareLink {
            id: row.id,
            property_id: row.property_id,
            token: row.token,
            client_name: row.client_name,
            client_email: row.client_email,
            custom_message: row.custom_message,
            allowed_views: row.allowed_views,
            view_count: row.view_count,
            allow_downloads: row.allow_downloads,
            is_active: row.is_active,
            created_by: row.created_by,
            expires_at: row.expires_at,
            last_viewed_at: row.last_viewed_at,
            created_at: row.created_at,
        }
    }
}

const SHARE_COLUMNS: &str = "id, property_id, token, client_name, client_email, custom_message, \
     allowed_views, view_count, allow_downloads, is_active, created_by, expires_at, \
     last_viewed_at, created_at";

/// 32 random bytes, URL-safe base64 without padding
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Error for a token that did not open; unknown and revoked links look alike
fn closed_link_error(status: Option<ShareStatus>) -> AppError {
    match status {
        Some(ShareStatus::Expired) => AppError::Gone("This sharing link has expired".to_string()),
        Some(ShareStatus::ViewLimitReached) => {
            AppError::LimitExceeded("This sharing link has reached its view limit".to_string())
        }
        _ => AppError::NotFound("Share link".to_string()),
    }
}

impl ShareService {
    /// Create a new ShareService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Issue a new link for a listing
    pub async fn create_share(
        &self,
        property_id: Uuid,
        created_by: Option<Uuid>,
        input: &CreateShareInput,
    ) -> AppResult<ShareLink> {
        let row = sqlx::query_as::<_, ShareRow>(&format!(
            r#"
            INSERT INTO property_shares (property_id, token, client_name, client_email,
                                         custom_message, allowed_views, allow_downloads,
                                         created_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            SHARE_COLUMNS
        ))
        .bind(property_id)
        .bind(generate_token())
        .bind(&input.client_name)
        .bind(&input.client_email)
        .bind(&input.custom_message)
        .bind(input.allowed_views)
        .bind(input.allow_downloads())
        .bind(created_by)
        .bind(input.expires_at(Utc::now()))
        .fetch_one(&self.db)
        .await?;

        let link = ShareLink::from(row);
        tracing::info!(
            share_id = %link.id,
            %property_id,
            expires_at = %link.expires_at,
            "Sharing link created"
        );

        Ok(link)
    }

    /// Links issued for a listing, newest first
    pub async fn list_shares(&self, property_id: Uuid) -> AppResult<Vec<ShareLink>> {
        let rows = sqlx::query_as::<_, ShareRow>(&format!(
            "SELECT {} FROM property_shares WHERE property_id = $1 ORDER BY created_at DESC",
            SHARE_COLUMNS
        ))
        .bind(property_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ShareLink::from).collect())
    }

    /// Stop a link from opening
    pub async fn deactivate_share(&self, property_id: Uuid, share_id: Uuid) -> AppResult<ShareLink> {
        let row = sqlx::query_as::<_, ShareRow>(&format!(
            r#"
            UPDATE property_shares
            SET is_active = FALSE
            WHERE id = $1 AND property_id = $2
            RETURNING {}
            "#,
            SHARE_COLUMNS
        ))
        .bind(share_id)
        .bind(property_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Share link".to_string()))?;

        tracing::info!(%share_id, %property_id, "Sharing link deactivated");
        Ok(ShareLink::from(row))
    }

    /// Open a link: count the view and return the listing it points at.
    ///
    /// The view is only counted when the link is active, unexpired, under its
    /// view limit, and the listing is neither archived nor private.
    pub async fn open_share(&self, token: &str) -> AppResult<(ShareLink, Property)> {
        let opened = sqlx::query_as::<_, ShareRow>(&format!(
            r#"
            UPDATE property_shares
            SET view_count = view_count + 1,
                last_viewed_at = NOW()
            WHERE token = $1
              AND is_active
              AND expires_at > NOW()
              AND (allowed_views IS NULL OR view_count < allowed_views)
              AND EXISTS (
                  SELECT 1 FROM properties p
                  WHERE p.id = property_shares.property_id
                    AND p.status NOT IN ('archived', 'private')
              )
            RETURNING {}
            "#,
            SHARE_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = opened else {
            return Err(self.refuse(token).await?);
        };

        let link = ShareLink::from(row);
        let property = PropertyService::new(self.db.clone())
            .find_property(link.property_id)
            .await?
            .filter(Property::is_shareable)
            .ok_or_else(|| closed_link_error(None))?;

        tracing::debug!(share_id = %link.id, view_count = link.view_count, "Sharing link opened");
        Ok((link, property))
    }

    /// Work out why a token did not open; expired links are switched off
    async fn refuse(&self, token: &str) -> AppResult<AppError> {
        let link = sqlx::query_as::<_, ShareRow>(&format!(
            "SELECT {} FROM property_shares WHERE token = $1",
            SHARE_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.db)
        .await?
        .map(ShareLink::from);

        let status = link.as_ref().map(|l| l.status_at(Utc::now()));
        if let (Some(link), Some(ShareStatus::Expired)) = (&link, status) {
            sqlx::query("UPDATE property_shares SET is_active = FALSE WHERE id = $1")
                .bind(link.id)
                .execute(&self.db)
                .await?;
            tracing::info!(share_id = %link.id, "Expired sharing link deactivated");
        }

        Ok(closed_link_error(status))
    }
}
