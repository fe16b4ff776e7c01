//! Time-limited client links to a single listing

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{Property, PropertyStatus};

/// Link lifetime when the request names none (one week)
pub const DEFAULT_SHARE_HOURS: i64 = 168;

/// Longest lifetime a link may be given (thirty days)
pub const MAX_SHARE_HOURS: i64 = 720;

/// A sharing link as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLink {
    pub id: Uuid,
    pub property_id: Uuid,
    pub token: String,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub custom_message: Option<String>,
    /// `None` means unlimited
    pub allowed_views: Option<i32>,
    pub view_count: i32,
    pub allow_downloads: bool,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Whether a link still opens
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShareStatus {
    Active,
    Inactive,
    Expired,
    ViewLimitReached,
}

impl ShareLink {
    pub fn status_at(&self, now: DateTime<Utc>) -> ShareStatus {
        if !self.is_active {
            ShareStatus::Inactive
        } else if now >= self.expires_at {
            ShareStatus::Expired
        } else if self
            .allowed_views
            .is_some_and(|limit| self.view_count >= limit)
        {
            ShareStatus::ViewLimitReached
        } else {
            ShareStatus::Active
        }
    }
}

/// Request to share a listing with a client
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateShareInput {
    /// Clamped to `1..=MAX_SHARE_HOURS`
    pub expiry_hours: Option<i64>,
    #[validate(length(max = 255))]
    pub client_name: Option<String>,
    #[validate(email(message = "Invalid client email"))]
    pub client_email: Option<String>,
    #[validate(range(min = 1, message = "Allowed views must be at least 1"))]
    pub allowed_views: Option<i32>,
    /// Defaults to true
    pub allow_downloads: Option<bool>,
    #[validate(length(max = 2000))]
    pub custom_message: Option<String>,
}

impl CreateShareInput {
    pub fn expiry_hours(&self) -> i64 {
        self.expiry_hours
            .unwrap_or(DEFAULT_SHARE_HOURS)
            .clamp(1, MAX_SHARE_HOURS)
    }

    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::hours(self.expiry_hours())
    }

    pub fn allow_downloads(&self) -> bool {
        self.allow_downloads.unwrap_or(true)
    }
}

impl Property {
    /// Archived and private listings are never shown through a link
    pub fn is_shareable(&self) -> bool {
        !matches!(self.status, PropertyStatus::Archived | PropertyStatus::Private)
    }
}

/// The client-facing copy of a listing; internal notes and ownership stay out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedProperty {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub images: Vec<String>,
    pub maps_link: Option<String>,
    pub status: PropertyStatus,
    /// Present only when the link allows downloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl SharedProperty {
    pub fn from_property(property: &Property, allow_downloads: bool) -> Self {
        Self {
            id: property.id,
            name: property.name.clone(),
            location: property.location.clone(),
            price: property.price,
            description: property.description.clone(),
            cover_image: property.cover_image.clone(),
            images: property.images.clone(),
            maps_link: property.maps_link.clone(),
            status: property.status,
            documents: allow_downloads.then(|| property.documents.clone()),
            created_at: property.created_at,
        }
    }
}

/// Link details shown alongside a shared listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareInfo {
    pub id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub custom_message: Option<String>,
    pub client_name: Option<String>,
    pub allow_downloads: bool,
    pub view_count: i32,
    pub allowed_views: Option<i32>,
}

impl From<&ShareLink> for ShareInfo {
    fn from(link: &ShareLink) -> Self {
        Self {
            id: link.id,
            expires_at: link.expires_at,
            custom_message: link.custom_message.clone(),
            client_name: link.client_name.clone(),
            allow_downloads: link.allow_downloads,
            view_count: link.view_count,
            allowed_views: link.allowed_views,
        }
    }
}

/// What an anonymous client receives for a valid token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedListing {
    pub property: SharedProperty,
    pub share: ShareInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(is_active: bool, expires_in_hours: i64, views: (i32, Option<i32>)) -> ShareLink {
        let now = Utc::now();
        ShareLink {
            id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            token: "token".to_string(),
            client_name: None,
            client_email: None,
            custom_message: None,
            allowed_views: views.1,
            view_count: views.0,
            allow_downloads: true,
            is_active,
            created_by: None,
            expires_at: now + Duration::hours(expires_in_hours),
            last_viewed_at: None,
            created_at: now,
        }
    }

    fn listing(status: PropertyStatus) -> Property {
        let now = Utc::now();
        Property {
            id: Uuid::new_v4(),
            name: "Garden Flat".to_string(),
            location: Some("Riverside".to_string()),
            price: Some(Decimal::new(250_000, 0)),
            description: None,
            cover_image: None,
            images: vec!["front.jpg".to_string()],
            documents: vec!["deed.pdf".to_string()],
            maps_link: None,
            notes: Some("Seller wants a quick close".to_string()),
            status,
            created_by: Some(Uuid::new_v4()),
            archived_at: None,
            archive_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_link_status() {
        let now = Utc::now();
        assert_eq!(link(true, 24, (0, None)).status_at(now), ShareStatus::Active);
        assert_eq!(link(false, 24, (0, None)).status_at(now), ShareStatus::Inactive);
        assert_eq!(link(true, -1, (0, None)).status_at(now), ShareStatus::Expired);
        assert_eq!(
            link(true, 24, (3, Some(3))).status_at(now),
            ShareStatus::ViewLimitReached
        );
        assert_eq!(link(true, 24, (2, Some(3))).status_at(now), ShareStatus::Active);
    }

    #[test]
    fn test_inactive_wins_over_expired() {
        assert_eq!(
            link(false, -1, (5, Some(1))).status_at(Utc::now()),
            ShareStatus::Inactive
        );
    }

    #[test]
    fn test_expiry_hours_default_and_clamp() {
        assert_eq!(CreateShareInput::default().expiry_hours(), DEFAULT_SHARE_HOURS);

        let long = CreateShareInput {
            expiry_hours: Some(10_000),
            ..Default::default()
        };
        assert_eq!(long.expiry_hours(), MAX_SHARE_HOURS);

        let negative = CreateShareInput {
            expiry_hours: Some(-5),
            ..Default::default()
        };
        assert_eq!(negative.expiry_hours(), 1);
    }

    #[test]
    fn test_share_input_validation() {
        assert!(CreateShareInput::default().validate().is_ok());
        assert!(CreateShareInput::default().allow_downloads());

        let bad_email = CreateShareInput {
            client_email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(bad_email.validate().is_err());

        let zero_views = CreateShareInput {
            allowed_views: Some(0),
            ..Default::default()
        };
        assert!(zero_views.validate().is_err());
    }

    #[test]
    fn test_shareable_statuses() {
        assert!(listing(PropertyStatus::Available).is_shareable());
        assert!(listing(PropertyStatus::Sold).is_shareable());
        assert!(!listing(PropertyStatus::Private).is_shareable());
        assert!(!listing(PropertyStatus::Archived).is_shareable());
    }

    #[test]
    fn test_shared_copy_hides_documents_without_downloads() {
        let property = listing(PropertyStatus::Available);

        let with = SharedProperty::from_property(&property, true);
        assert_eq!(with.documents, Some(vec!["deed.pdf".to_string()]));

        let without = SharedProperty::from_property(&property, false);
        assert!(without.documents.is_none());
        let json = serde_json::to_value(&without).unwrap();
        assert!(json.get("documents").is_none());
        assert!(json.get("notes").is_none());
        assert!(json.get("created_by").is_none());
    }
}
