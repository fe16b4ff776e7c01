//! Finance and payment tracking models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::access::Grant;
use crate::validation::validate_positive;

/// Payment status of a finance record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FinanceStatus {
    #[default]
    Pending,
    Paid,
    Partial,
    Overdue,
}

impl FinanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinanceStatus::Pending => "pending",
            FinanceStatus::Paid => "paid",
            FinanceStatus::Partial => "partial",
            FinanceStatus::Overdue => "overdue",
        }
    }
}

impl std::fmt::Display for FinanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FinanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FinanceStatus::Pending),
            "paid" => Ok(FinanceStatus::Paid),
            "partial" => Ok(FinanceStatus::Partial),
            "overdue" => Ok(FinanceStatus::Overdue),
            other => Err(format!("unknown finance status: {}", other)),
        }
    }
}

/// What a payment is for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Registration,
    Advocate,
    Documents,
    Travel,
    Other,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Registration => "registration",
            PaymentType::Advocate => "advocate",
            PaymentType::Documents => "documents",
            PaymentType::Travel => "travel",
            PaymentType::Other => "other",
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registration" => Ok(PaymentType::Registration),
            "advocate" => Ok(PaymentType::Advocate),
            "documents" => Ok(PaymentType::Documents),
            "travel" => Ok(PaymentType::Travel),
            "other" => Ok(PaymentType::Other),
            other => Err(format!("unknown payment type: {}", other)),
        }
    }
}

/// A payment tracked against a property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceRecord {
    pub id: Uuid,
    pub property_id: Uuid,
    pub property_name: Option<String>,
    pub client_name: String,
    pub client_email: Option<String>,
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub due_date: Option<NaiveDate>,
    pub next_payment_date: Option<NaiveDate>,
    pub status: FinanceStatus,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a payment
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFinanceInput {
    pub property_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Client name is required"))]
    pub client_name: String,
    #[validate(email)]
    pub client_email: Option<String>,
    #[validate(custom = "validate_positive")]
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub due_date: Option<NaiveDate>,
    pub next_payment_date: Option<NaiveDate>,
    pub status: Option<FinanceStatus>,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateFinanceInput {
    pub property_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub client_name: Option<String>,
    #[validate(email)]
    pub client_email: Option<String>,
    #[validate(custom = "validate_positive")]
    pub amount: Option<Decimal>,
    pub payment_type: Option<PaymentType>,
    pub due_date: Option<NaiveDate>,
    pub next_payment_date: Option<NaiveDate>,
    pub status: Option<FinanceStatus>,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
}

/// Which finance records a caller may reach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinanceScope {
    All,
    /// Records created by this account only
    Own(Option<Uuid>),
}

impl FinanceScope {
    pub fn for_grant(grant: &Grant<'_>) -> Self {
        if grant.roles().can_view_all_finances(grant.role) {
            FinanceScope::All
        } else {
            FinanceScope::Own(grant.user.user_id)
        }
    }

    pub fn permits(&self, record: &FinanceRecord) -> bool {
        match self {
            FinanceScope::All => true,
            FinanceScope::Own(owner) => owner.is_some() && record.created_by == *owner,
        }
    }

    /// Records are locked after creation for callers without full access
    pub fn may_edit(&self) -> bool {
        matches!(self, FinanceScope::All)
    }
}

/// Query filters for listing finance records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinanceFilter {
    pub property_id: Option<Uuid>,
    pub status: Option<String>,
    pub client_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_by: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl FinanceFilter {
    pub fn status(&self) -> Option<FinanceStatus> {
        self.status
            .as_deref()
            .filter(|s| *s != "all")
            .and_then(|s| s.parse().ok())
    }

    /// Creator filter the caller is allowed to apply.
    ///
    /// Full-access callers may filter by any creator; others only ever see
    /// their own records, so their creator filter is dropped unless it is
    /// themselves.
    pub fn effective_creator(&self, scope: FinanceScope) -> Option<Uuid> {
        let requested = self.user_id.or(self.created_by);
        match scope {
            FinanceScope::All => requested,
            FinanceScope::Own(owner) => owner,
        }
    }
}

/// Totals over a set of finance records
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub total_receivables: Decimal,
    pub total_received: Decimal,
    pub pending_amount: Decimal,
    pub overdue_amount: Decimal,
    pub total_records: usize,
    pub paid_records: usize,
    pub pending_records: usize,
    pub overdue_records: usize,
}

impl FinanceSummary {
    pub fn from_records(records: &[FinanceRecord]) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            summary.total_receivables += record.amount;
            summary.total_records += 1;
            match record.status {
                FinanceStatus::Paid => {
                    summary.total_received += record.amount;
                    summary.paid_records += 1;
                }
                FinanceStatus::Pending => {
                    summary.pending_amount += record.amount;
                    summary.pending_records += 1;
                }
                FinanceStatus::Overdue => {
                    summary.overdue_amount += record.amount;
                    summary.overdue_records += 1;
                }
                FinanceStatus::Partial => {}
            }
            summary
        })
    }
}
