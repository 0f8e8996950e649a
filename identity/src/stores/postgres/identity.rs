//! PostgreSQL identity repository.
//!
//! Each lifecycle write is one conditional statement, so its precondition
//! and effect are atomic without an explicit transaction.
//!
//! # Example
//!
//! ```no_run
//! use airena_identity::stores::postgres::PostgresIdentityRepository;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/airena").await?;
//! let repo = PostgresIdentityRepository::new(pool);
//! repo.migrate().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{IdentityError, Result};
use crate::providers::IdentityRepository;
use crate::state::{Identity, OtcPurpose, PendingOtc};
use airena_core::{IdentityId, Role};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const COLUMNS: &str = "id, email, password_hash, name, role, email_verified, otc_hash, otc_purpose, \
     otc_expires_at, otc_failed_attempts, host_approved, host_approved_at, host_requested_at, last_login_at, \
     created_at, updated_at";

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: uuid::Uuid,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    email_verified: bool,
    otc_hash: Option<String>,
    otc_purpose: Option<String>,
    otc_expires_at: Option<DateTime<Utc>>,
    otc_failed_attempts: i32,
    host_approved: bool,
    host_approved_at: Option<DateTime<Utc>>,
    host_requested_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = IdentityError;

    fn try_from(row: IdentityRow) -> Result<Self> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| IdentityError::Database(format!("Corrupt role for {}: {e}", row.id)))?;
        let otc = match (row.otc_hash, row.otc_purpose, row.otc_expires_at) {
            (Some(code_hash), Some(purpose), Some(expires_at)) => Some(PendingOtc {
                code_hash,
                purpose: OtcPurpose::from_storage(&purpose).ok_or_else(|| {
                    IdentityError::Database(format!("Corrupt code purpose for {}: {purpose}", row.id))
                })?,
                expires_at,
            }),
            _ => None,
        };

        Ok(Self {
            id: IdentityId(row.id),
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            role,
            email_verified: row.email_verified,
            otc,
            otc_failed_attempts: u32::try_from(row.otc_failed_attempts).unwrap_or_default(),
            host_approved: row.host_approved,
            host_approved_at: row.host_approved_at,
            host_requested_at: row.host_requested_at,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn db_error(context: &str) -> impl FnOnce(sqlx::Error) -> IdentityError + '_ {
    move |e| {
        tracing::error!(error = %e, "{context}");
        IdentityError::Database(format!("{context}: {e}"))
    }
}

fn convert(row: Option<IdentityRow>) -> Result<Option<Identity>> {
    row.map(Identity::try_from).transpose()
}

/// PostgreSQL identity repository.
#[derive(Debug, Clone)]
pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    /// Create a repository over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the identity migrations.
    ///
    /// Migrations of other crates sharing the database are tolerated.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("./migrations");
        migrator.set_ignore_missing(true);
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| IdentityError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

impl IdentityRepository for PostgresIdentityRepository {
    async fn find_by_id(&self, id: IdentityId) -> Result<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!("SELECT {COLUMNS} FROM identities WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load identity"))?;
        convert(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!("SELECT {COLUMNS} FROM identities WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load identity"))?;
        convert(row)
    }

    async fn insert(&self, identity: &Identity) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO identities
                (id, email, password_hash, name, role, email_verified, otc_hash, otc_purpose,
                 otc_expires_at, otc_failed_attempts, host_approved, host_approved_at,
                 host_requested_at, last_login_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ",
        )
        .bind(identity.id.0)
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .bind(&identity.name)
        .bind(identity.role.as_str())
        .bind(identity.email_verified)
        .bind(identity.otc.as_ref().map(|otc| otc.code_hash.clone()))
        .bind(identity.otc.as_ref().map(|otc| otc.purpose.as_str()))
        .bind(identity.otc.as_ref().map(|otc| otc.expires_at))
        .bind(i32::try_from(identity.otc_failed_attempts).unwrap_or(i32::MAX))
        .bind(identity.host_approved)
        .bind(identity.host_approved_at)
        .bind(identity.host_requested_at)
        .bind(identity.last_login_at)
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return IdentityError::EmailAlreadyRegistered;
                }
            }
            db_error("Failed to insert identity")(e)
        })?;
        Ok(())
    }

    async fn store_otc(&self, id: IdentityId, otc: &PendingOtc, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE identities
            SET otc_hash = $2, otc_purpose = $3, otc_expires_at = $4, otc_failed_attempts = 0,
                updated_at = $5
            WHERE id = $1
            ",
        )
        .bind(id.0)
        .bind(&otc.code_hash)
        .bind(otc.purpose.as_str())
        .bind(otc.expires_at)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to store verification code"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn consume_otc(
        &self,
        id: IdentityId,
        code_hash: &str,
        purpose: OtcPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            r"
            UPDATE identities
            SET otc_hash = NULL, otc_purpose = NULL, otc_expires_at = NULL, otc_failed_attempts = 0,
                email_verified = TRUE, updated_at = $4
            WHERE id = $1 AND otc_hash = $2 AND otc_purpose = $3 AND otc_expires_at > $4
            RETURNING {COLUMNS}
            "
        ))
        .bind(id.0)
        .bind(code_hash)
        .bind(purpose.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to consume verification code"))?;
        convert(row)
    }

    async fn clear_expired_otc(&self, id: IdentityId, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE identities
            SET otc_hash = NULL, otc_purpose = NULL, otc_expires_at = NULL, otc_failed_attempts = 0
            WHERE id = $1 AND otc_expires_at <= $2
            ",
        )
        .bind(id.0)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to clear verification code"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_failed_otc_attempt(&self, id: IdentityId, code_hash: &str) -> Result<u32> {
        let attempts: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE identities
            SET otc_failed_attempts = otc_failed_attempts + 1
            WHERE id = $1 AND otc_hash = $2
            RETURNING otc_failed_attempts
            ",
        )
        .bind(id.0)
        .bind(code_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to record verification attempt"))?;
        Ok(attempts.and_then(|n| u32::try_from(n).ok()).unwrap_or_default())
    }

    async fn clear_otc(&self, id: IdentityId, code_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE identities
            SET otc_hash = NULL, otc_purpose = NULL, otc_expires_at = NULL, otc_failed_attempts = 0
            WHERE id = $1 AND otc_hash = $2
            ",
        )
        .bind(id.0)
        .bind(code_hash)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to clear verification code"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_host_review_requested(&self, id: IdentityId, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE identities
            SET host_requested_at = $2, updated_at = $2
            WHERE id = $1 AND host_requested_at IS NULL
            ",
        )
        .bind(id.0)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to record host review request"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn approve_host(&self, id: IdentityId, at: DateTime<Utc>, otc: &PendingOtc) -> Result<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            r"
            UPDATE identities
            SET host_approved = TRUE, host_approved_at = $2,
                otc_hash = $3, otc_purpose = $4, otc_expires_at = $5, otc_failed_attempts = 0,
                updated_at = $2
            WHERE id = $1 AND role = 'HOST' AND host_approved = FALSE
            RETURNING {COLUMNS}
            "
        ))
        .bind(id.0)
        .bind(at)
        .bind(&otc.code_hash)
        .bind(otc.purpose.as_str())
        .bind(otc.expires_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to approve host"))?;
        convert(row)
    }

    async fn delete_pending_host(&self, id: IdentityId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM identities WHERE id = $1 AND role = 'HOST' AND host_approved = FALSE")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete host"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_non_admin(&self, id: IdentityId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM identities WHERE id = $1 AND role <> 'ADMIN'")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete identity"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_login(&self, id: IdentityId, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE identities SET last_login_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id.0)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to record login"))?;
        Ok(())
    }

    async fn pending_host_requests(&self) -> Result<Vec<Identity>> {
        let rows = sqlx::query_as::<_, IdentityRow>(&format!(
            r"
            SELECT {COLUMNS} FROM identities
            WHERE role = 'HOST' AND host_approved = FALSE AND host_requested_at IS NOT NULL
            ORDER BY host_requested_at ASC
            "
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list host requests"))?;
        rows.into_iter().map(Identity::try_from).collect()
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Identity>> {
        let rows = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {COLUMNS} FROM identities WHERE role = $1 ORDER BY created_at DESC"
        ))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list identities"))?;
        rows.into_iter().map(Identity::try_from).collect()
    }
}
