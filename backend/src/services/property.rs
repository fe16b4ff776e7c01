//! Property listing service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::models::{Property, PropertyFilter, PropertyInput, PropertyStatus, PropertyVisibility};
use shared::validation::validate_price_range;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Property service for the `properties` table
#[derive(Clone)]
pub struct PropertyService {
    db: PgPool,
}

/// Listing row as stored
#[derive(Debug, sqlx::FromRow)]
pub struct PropertyRow {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub images: Json<Vec<String>>,
    pub documents: Json<Vec<String>>,
    pub maps_link: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub archived_at: Option<DateTime<Utc>>,
    pub archive_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PropertyRow> for Property {
    type Error = AppError;

    fn try_from(row: PropertyRow) -> AppResult<Self> {
        Ok(Property {
            id: row.id,
            name: row.name,
            location: row.location,
            price: row.price,
            description: row.description,
            cover_image: row.cover_image,
            images: row.images.0,
            documents: row.documents.0,
            maps_link: row.maps_link,
            notes: row.notes,
            status: row.status.parse().map_err(AppError::Internal)?,
            created_by: row.created_by,
            archived_at: row.archived_at,
            archive_reason: row.archive_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) const PROPERTY_COLUMNS: &str = "id, name, location, price, description, cover_image, \
     images, documents, maps_link, notes, status, created_by, archived_at, archive_reason, \
     created_at, updated_at";

impl PropertyService {
    /// Create a new PropertyService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Active listings matching `filter`, narrowed to what the caller may see
    pub async fn list_properties(
        &self,
        visibility: &PropertyVisibility,
        filter: &PropertyFilter,
    ) -> AppResult<Vec<Property>> {
        validate_price_range(filter.min_price, filter.max_price).map_err(|message| {
            AppError::Validation {
                field: "min_price".to_string(),
                message: message.to_string(),
            }
        })?;

        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        let location = filter
            .location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let rows = sqlx::query_as::<_, PropertyRow>(&format!(
            r#"
            SELECT {}
            FROM properties
            WHERE status <> 'archived'
              AND ($1::text IS NULL OR name ILIKE $1 OR location ILIKE $1 OR description ILIKE $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::numeric IS NULL OR price >= $3)
              AND ($4::numeric IS NULL OR price <= $4)
              AND ($5::text IS NULL OR location ILIKE $5)
            ORDER BY created_at DESC
            "#,
            PROPERTY_COLUMNS
        ))
        .bind(search)
        .bind(filter.status().map(|s| s.as_str()))
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(location)
        .fetch_all(&self.db)
        .await?;

        let mut properties = Vec::with_capacity(rows.len());
        for row in rows {
            let property = Property::try_from(row)?;
            if visibility.permits(&property) {
                properties.push(property);
            }
        }

        Ok(properties)
    }

    /// Fetch a listing regardless of visibility
    pub async fn find_property(&self, property_id: Uuid) -> AppResult<Option<Property>> {
        let row = sqlx::query_as::<_, PropertyRow>(&format!(
            "SELECT {} FROM properties WHERE id = $1",
            PROPERTY_COLUMNS
        ))
        .bind(property_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Property::try_from).transpose()
    }

    /// Fetch a listing the caller may see; anything else is not found
    pub async fn get_property(
        &self,
        visibility: &PropertyVisibility,
        property_id: Uuid,
    ) -> AppResult<Property> {
        self.find_property(property_id)
            .await?
            .filter(|p| visibility.permits(p))
            .ok_or_else(|| AppError::NotFound("Property".to_string()))
    }

    /// Create a listing owned by `created_by`
    pub async fn create_property(
        &self,
        created_by: Option<Uuid>,
        input: PropertyInput,
    ) -> AppResult<Property> {
        let status = input.status_or_default();
        if !PropertyStatus::ASSIGNABLE.contains(&status) {
            return Err(AppError::Validation {
                field: "status".to_string(),
                message: "Use the archive operations to archive a property".to_string(),
            });
        }

        let row = sqlx::query_as::<_, PropertyRow>(&format!(
            r#"
            INSERT INTO properties (name, location, price, description, cover_image, images,
                                    documents, maps_link, notes, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        ))
        .bind(&input.name)
        .bind(&input.location)
        .bind(input.price)
        .bind(&input.description)
        .bind(&input.cover_image)
        .bind(Json(&input.images))
        .bind(Json(&input.documents))
        .bind(&input.maps_link)
        .bind(&input.notes)
        .bind(status.as_str())
        .bind(created_by)
        .fetch_one(&self.db)
        .await?;

        let property = Property::try_from(row)?;
        tracing::info!(property_id = %property.id, status = %property.status, "Property created");

        Ok(property)
    }

    /// Replace a listing's fields; status is kept when the input omits it
    pub async fn update_property(&self, property_id: Uuid, input: PropertyInput) -> AppResult<Property> {
        if input.status.is_some_and(|s| !PropertyStatus::ASSIGNABLE.contains(&s)) {
            return Err(AppError::Validation {
                field: "status".to_string(),
                message: "Use the archive operations to archive a property".to_string(),
            });
        }

        let row = sqlx::query_as::<_, PropertyRow>(&format!(
            r#"
            UPDATE properties
            SET name = $1,
                location = $2,
                price = $3,
                description = $4,
                cover_image = $5,
                images = $6,
                documents = $7,
                maps_link = $8,
                notes = $9,
                status = COALESCE($10, status),
                updated_at = NOW()
            WHERE id = $11
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        ))
        .bind(&input.name)
        .bind(&input.location)
        .bind(input.price)
        .bind(&input.description)
        .bind(&input.cover_image)
        .bind(Json(&input.images))
        .bind(Json(&input.documents))
        .bind(&input.maps_link)
        .bind(&input.notes)
        .bind(input.status.map(|s| s.as_str()))
        .bind(property_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Property".to_string()))?;

        let property = Property::try_from(row)?;
        tracing::info!(property_id = %property.id, "Property updated");

        Ok(property)
    }

    /// Delete a listing along with its finance records
    pub async fn delete_property(&self, property_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(property_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Property".to_string()));
        }

        tracing::info!(%property_id, "Property deleted");
        Ok(())
    }
}
