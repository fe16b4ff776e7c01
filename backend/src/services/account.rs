//! Account service: sign-in upserts and administrative changes

use chrono::{DateTime, Utc};
use shared::access::AccessPolicy;
use shared::models::{Account, AccountStatus, SignInProfile, UpdateAccountInput};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Account service for the `users` table
#[derive(Clone)]
pub struct AccountService {
    db: PgPool,
}

/// Account row as stored
#[derive(Debug, sqlx::FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Option<String>,
    pub status: String,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = AppError;

    fn try_from(row: AccountRow) -> AppResult<Self> {
        Ok(Account {
            id: row.id,
            email: row.email,
            name: row.name,
            image: row.image,
            role: row.role,
            status: row.status.parse().map_err(AppError::Internal)?,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, email, name, image, role, status, last_login, created_at, updated_at";

impl AccountService {
    /// Create a new AccountService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get all accounts, newest first
    pub async fn list_accounts(&self) -> AppResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Account::try_from).collect()
    }

    /// Get an account by id
    pub async fn find_account(&self, account_id: Uuid) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Account::try_from).transpose()
    }

    /// Record a successful provider sign-in.
    ///
    /// New accounts receive their initial role; existing accounts keep the
    /// stored one and only get profile fields and `last_login` refreshed.
    /// Suspended accounts are left untouched and rejected.
    pub async fn record_sign_in(
        &self,
        profile: &SignInProfile,
        policy: &AccessPolicy,
    ) -> AppResult<Account> {
        let initial_role = policy.initial_role(&profile.email);

        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            INSERT INTO users (email, name, image, role, status, last_login)
            VALUES ($1, $2, $3, $4, 'active', NOW())
            ON CONFLICT (email) DO UPDATE
            SET name = COALESCE(EXCLUDED.name, users.name),
                image = COALESCE(EXCLUDED.image, users.image),
                last_login = NOW(),
                updated_at = NOW()
            WHERE users.status <> $5
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(&profile.image)
        .bind(initial_role.as_str())
        .bind(AccountStatus::Suspended.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Forbidden("This account has been suspended".to_string()))?;

        let account = Account::try_from(row)?;
        tracing::info!(
            email = %account.email,
            role = account.role.as_deref().unwrap_or("none"),
            "Account signed in"
        );

        Ok(account)
    }

    /// Change an account's role and/or status
    pub async fn update_account(
        &self,
        account_id: Uuid,
        input: UpdateAccountInput,
        policy: &AccessPolicy,
    ) -> AppResult<Account> {
        if input.role.is_none() && input.status.is_none() {
            return Err(AppError::ValidationError(
                "Nothing to update: provide role or status".to_string(),
            ));
        }

        let role = match input.role.as_deref() {
            Some(tag) => Some(policy.recognize(tag).ok_or_else(|| AppError::Validation {
                field: "role".to_string(),
                message: format!("Unknown role: {}", tag),
            })?),
            None => None,
        };

        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            UPDATE users
            SET role = COALESCE($1, role),
                status = COALESCE($2, status),
                updated_at = NOW()
            WHERE id = $3
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(role.map(|r| r.as_str()))
        .bind(input.status.map(|s| s.as_str()))
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let account = Account::try_from(row)?;
        if account.status == AccountStatus::Suspended {
            tracing::info!(email = %account.email, "Account suspended");
        }
        tracing::info!(account_id = %account.id, "Account updated");

        Ok(account)
    }
}
