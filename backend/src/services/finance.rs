//! Finance record service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{
    CreateFinanceInput, FinanceFilter, FinanceRecord, FinanceScope, Property, PropertyVisibility,
    UpdateFinanceInput,
};
use shared::validation::validate_date_order;
use sqlx::PgPool;
use uuid::Uuid;

use super::PropertyService;
use crate::error::{AppError, AppResult};

/// Finance service for the `finances` table
#[derive(Clone)]
pub struct FinanceService {
    db: PgPool,
}

/// Finance row joined with its property name
#[derive(Debug, sqlx::FromRow)]
pub struct FinanceRow {
    pub id: Uuid,
    pub property_id: Uuid,
    pub property_name: Option<String>,
    pub client_name: String,
    pub client_email: Option<String>,
    pub amount: Decimal,
    pub payment_type: String,
    pub due_date: Option<NaiveDate>,
    pub next_payment_date: Option<NaiveDate>,
    pub status: String,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<FinanceRow> for FinanceRecord {
    type Error = AppError;

    fn try_from(row: FinanceRow) -> AppResult<Self> {
        Ok(FinanceRecord {
            id: row.id,
            property_id: row.property_id,
            property_name: row.property_name,
            client_name: row.client_name,
            client_email: row.client_email,
            amount: row.amount,
            payment_type: row.payment_type.parse().map_err(AppError::Internal)?,
            due_date: row.due_date,
            next_payment_date: row.next_payment_date,
            status: row.status.parse().map_err(AppError::Internal)?,
            receipt_url: row.receipt_url,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Flat CSV line for spreadsheet export
#[derive(Debug, Serialize)]
struct FinanceCsvRow<'a> {
    id: Uuid,
    property: &'a str,
    client_name: &'a str,
    client_email: &'a str,
    amount: Decimal,
    payment_type: &'a str,
    status: &'a str,
    due_date: Option<NaiveDate>,
    next_payment_date: Option<NaiveDate>,
    receipt_url: &'a str,
    notes: &'a str,
    created_at: String,
}

impl<'a> From<&'a FinanceRecord> for FinanceCsvRow<'a> {
    fn from(record: &'a FinanceRecord) -> Self {
        Self {
            id: record.id,
            property: record.property_name.as_deref().unwrap_or(""),
            client_name: &record.client_name,
            client_email: record.client_email.as_deref().unwrap_or(""),
            amount: record.amount,
            payment_type: record.payment_type.as_str(),
            status: record.status.as_str(),
            due_date: record.due_date,
            next_payment_date: record.next_payment_date,
            receipt_url: record.receipt_url.as_deref().unwrap_or(""),
            notes: record.notes.as_deref().unwrap_or(""),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// A payment may only point at a listing the caller can see
fn ensure_attachable(visibility: &PropertyVisibility, property: Option<&Property>) -> AppResult<()> {
    match property {
        Some(property) if visibility.permits(property) => Ok(()),
        _ => Err(AppError::Validation {
            field: "property_id".to_string(),
            message: "Property does not exist".to_string(),
        }),
    }
}

const FINANCE_SELECT: &str = r#"
    SELECT f.id, f.property_id, p.name AS property_name, f.client_name, f.client_email,
           f.amount, f.payment_type, f.due_date, f.next_payment_date, f.status,
           f.receipt_url, f.notes, f.created_by, f.created_at, f.updated_at
    FROM finances f
    LEFT JOIN properties p ON p.id = f.property_id
"#;

impl FinanceService {
    /// Create a new FinanceService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Records matching `filter` within `scope`, newest first
    pub async fn list_records(
        &self,
        scope: FinanceScope,
        filter: &FinanceFilter,
    ) -> AppResult<Vec<FinanceRecord>> {
        validate_date_order(filter.start_date, filter.end_date).map_err(|message| {
            AppError::Validation {
                field: "start_date".to_string(),
                message: message.to_string(),
            }
        })?;

        // An own-records scope without an account id can reach nothing
        if scope == FinanceScope::Own(None) {
            return Ok(Vec::new());
        }

        let client_name = filter
            .client_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let rows = sqlx::query_as::<_, FinanceRow>(&format!(
            r#"
            {}
            WHERE ($1::uuid IS NULL OR f.property_id = $1)
              AND ($2::text IS NULL OR f.status = $2)
              AND ($3::text IS NULL OR f.client_name ILIKE $3)
              AND ($4::date IS NULL OR f.due_date >= $4)
              AND ($5::date IS NULL OR f.due_date <= $5)
              AND ($6::uuid IS NULL OR f.created_by = $6)
            ORDER BY f.created_at DESC
            "#,
            FINANCE_SELECT
        ))
        .bind(filter.property_id)
        .bind(filter.status().map(|s| s.as_str()))
        .bind(client_name)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.effective_creator(scope))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(FinanceRecord::try_from).collect()
    }

    /// Fetch a record the caller may reach; anything else is not found
    pub async fn get_record(&self, scope: FinanceScope, record_id: Uuid) -> AppResult<FinanceRecord> {
        let row = sqlx::query_as::<_, FinanceRow>(&format!("{} WHERE f.id = $1", FINANCE_SELECT))
            .bind(record_id)
            .fetch_optional(&self.db)
            .await?;

        row.map(FinanceRecord::try_from)
            .transpose()?
            .filter(|record| scope.permits(record))
            .ok_or_else(|| AppError::NotFound("Finance record".to_string()))
    }

    async fn check_property(&self, visibility: &PropertyVisibility, property_id: Uuid) -> AppResult<()> {
        let property = PropertyService::new(self.db.clone())
            .find_property(property_id)
            .await?;
        ensure_attachable(visibility, property.as_ref())
    }

    /// Record a payment against a listing visible to the caller
    pub async fn create_record(
        &self,
        created_by: Option<Uuid>,
        visibility: &PropertyVisibility,
        input: CreateFinanceInput,
    ) -> AppResult<FinanceRecord> {
        self.check_property(visibility, input.property_id).await?;

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO finances (property_id, client_name, client_email, amount, payment_type,
                                  due_date, next_payment_date, status, receipt_url, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(input.property_id)
        .bind(input.client_name.trim())
        .bind(&input.client_email)
        .bind(input.amount)
        .bind(input.payment_type.as_str())
        .bind(input.due_date)
        .bind(input.next_payment_date)
        .bind(input.status.unwrap_or_default().as_str())
        .bind(&input.receipt_url)
        .bind(&input.notes)
        .bind(created_by)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(finance_id = %id, amount = %input.amount, "Finance record created");

        self.get_record(FinanceScope::All, id).await
    }

    /// Apply a partial update; a new property must be visible to the caller
    pub async fn update_record(
        &self,
        record_id: Uuid,
        visibility: &PropertyVisibility,
        input: UpdateFinanceInput,
    ) -> AppResult<FinanceRecord> {
        if let Some(property_id) = input.property_id {
            self.check_property(visibility, property_id).await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE finances
            SET property_id = COALESCE($1, property_id),
                client_name = COALESCE($2, client_name),
                client_email = COALESCE($3, client_email),
                amount = COALESCE($4, amount),
                payment_type = COALESCE($5, payment_type),
                due_date = COALESCE($6, due_date),
                next_payment_date = COALESCE($7, next_payment_date),
                status = COALESCE($8, status),
                receipt_url = COALESCE($9, receipt_url),
                notes = COALESCE($10, notes),
                updated_at = NOW()
            WHERE id = $11
            "#,
        )
        .bind(input.property_id)
        .bind(input.client_name.as_deref().map(str::trim))
        .bind(&input.client_email)
        .bind(input.amount)
        .bind(input.payment_type.map(|t| t.as_str()))
        .bind(input.due_date)
        .bind(input.next_payment_date)
        .bind(input.status.map(|s| s.as_str()))
        .bind(&input.receipt_url)
        .bind(&input.notes)
        .bind(record_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Finance record".to_string()));
        }

        tracing::info!(finance_id = %record_id, "Finance record updated");
        self.get_record(FinanceScope::All, record_id).await
    }

    /// Delete a record
    pub async fn delete_record(&self, record_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM finances WHERE id = $1")
            .bind(record_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Finance record".to_string()));
        }

        tracing::info!(finance_id = %record_id, "Finance record deleted");
        Ok(())
    }

    /// Render records as CSV with a header row
    pub fn export_to_csv(records: &[FinanceRecord]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in records {
            wtr.serialize(FinanceCsvRow::from(record))
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;

        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
