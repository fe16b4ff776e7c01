//! Property listing models and visibility rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::access::{Action, Capability, Grant, Role};
use crate::validation::validate_non_negative;

/// Listing status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Available,
    Occupied,
    Maintenance,
    Sold,
    Pending,
    /// Visible to its creator only
    Private,
    Archived,
}

impl PropertyStatus {
    /// Statuses a listing may be moved to through ordinary edits
    pub const ASSIGNABLE: [PropertyStatus; 6] = [
        PropertyStatus::Available,
        PropertyStatus::Occupied,
        PropertyStatus::Maintenance,
        PropertyStatus::Sold,
        PropertyStatus::Pending,
        PropertyStatus::Private,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Available => "available",
            PropertyStatus::Occupied => "occupied",
            PropertyStatus::Maintenance => "maintenance",
            PropertyStatus::Sold => "sold",
            PropertyStatus::Pending => "pending",
            PropertyStatus::Private => "private",
            PropertyStatus::Archived => "archived",
        }
    }

    /// Statuses an editor sees on listings created by others
    pub fn is_listed(&self) -> bool {
        matches!(self, PropertyStatus::Available | PropertyStatus::Pending)
    }
}

impl std::fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PropertyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(PropertyStatus::Available),
            "occupied" => Ok(PropertyStatus::Occupied),
            "maintenance" => Ok(PropertyStatus::Maintenance),
            "sold" => Ok(PropertyStatus::Sold),
            "pending" => Ok(PropertyStatus::Pending),
            "private" => Ok(PropertyStatus::Private),
            "archived" => Ok(PropertyStatus::Archived),
            other => Err(format!("unknown property status: {}", other)),
        }
    }
}

/// A property listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub images: Vec<String>,
    pub documents: Vec<String>,
    pub maps_link: Option<String>,
    pub notes: Option<String>,
    pub status: PropertyStatus,
    pub created_by: Option<Uuid>,
    pub archived_at: Option<DateTime<Utc>>,
    pub archive_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PropertyInput {
    #[validate(length(min = 1, max = 255, message = "Property name is required"))]
    pub name: String,
    pub location: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub documents: Vec<String>,
    #[validate(url)]
    pub maps_link: Option<String>,
    pub notes: Option<String>,
    pub status: Option<PropertyStatus>,
}

impl PropertyInput {
    /// Trim text fields; blank optional text becomes `None`
    pub fn normalized(mut self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        self.name = self.name.trim().to_string();
        self.location = blank_to_none(self.location);
        self.description = blank_to_none(self.description);
        self.cover_image = blank_to_none(self.cover_image);
        self.maps_link = blank_to_none(self.maps_link);
        self.notes = blank_to_none(self.notes);
        self
    }

    pub fn status_or_default(&self) -> PropertyStatus {
        self.status.unwrap_or_default()
    }
}

/// Which listings a caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyScope {
    /// Every listing except other users' private ones
    All,
    /// Own listings plus available and pending listings of others
    OwnOrListed,
    /// Same listings as `All`, without any right to change them
    Browse,
}

impl PropertyScope {
    /// Derive the scope from a passed guard
    pub fn for_grant(grant: &Grant<'_>) -> Self {
        let roles = grant.roles();
        if roles.can(grant.role, Action::PropertyAll) {
            PropertyScope::All
        } else if roles.can_manage_properties(grant.role) {
            PropertyScope::OwnOrListed
        } else {
            PropertyScope::Browse
        }
    }

    /// Whether `viewer` may see `property`.
    ///
    /// Private listings are only ever visible to their creator. Archived
    /// listings are only visible when `include_archived` is set, which
    /// callers do only for roles with archive access.
    pub fn permits(&self, property: &Property, viewer: Option<Uuid>, include_archived: bool) -> bool {
        let is_owner = viewer.is_some() && property.created_by == viewer;

        match property.status {
            PropertyStatus::Private => return is_owner,
            PropertyStatus::Archived if !include_archived => return false,
            _ => {}
        }

        match self {
            PropertyScope::All | PropertyScope::Browse => true,
            PropertyScope::OwnOrListed => is_owner || property.status.is_listed(),
        }
    }
}

/// Everything needed to decide whether one caller sees one listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyVisibility {
    pub scope: PropertyScope,
    pub viewer: Option<Uuid>,
    /// Archived listings are included only for roles with archive access
    pub include_archived: bool,
}

impl PropertyVisibility {
    pub fn for_grant(grant: &Grant<'_>) -> Self {
        Self {
            scope: PropertyScope::for_grant(grant),
            viewer: grant.user.user_id,
            include_archived: grant.allows(Capability::AccessArchive),
        }
    }

    pub fn permits(&self, property: &Property) -> bool {
        self.scope.permits(property, self.viewer, self.include_archived)
    }
}

/// Whether the caller may modify an existing listing
pub fn can_edit_property(grant: &Grant<'_>, property: &Property) -> bool {
    match PropertyScope::for_grant(grant) {
        PropertyScope::All => true,
        PropertyScope::OwnOrListed => {
            grant.user.user_id.is_some() && property.created_by == grant.user.user_id
        }
        PropertyScope::Browse => false,
    }
}

/// Only `master` may mark listings private
pub fn may_set_private(grant: &Grant<'_>, status: PropertyStatus) -> bool {
    status != PropertyStatus::Private || grant.role == Role::Master
}

/// Query filters for listing properties
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub location: Option<String>,
}

impl PropertyFilter {
    /// Status filter, with `all` and unknown values meaning no filter
    pub fn status(&self) -> Option<PropertyStatus> {
        self.status
            .as_deref()
            .filter(|s| *s != "all")
            .and_then(|s| s.parse().ok())
    }
}
