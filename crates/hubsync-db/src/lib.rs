//! hubsync-db
//!
//! PostgreSQL record store for reconciled users.
//!
//! Free functions take a `&PgPool` and return `anyhow::Result` with step
//! context. [`PgRecordStore`] adapts them to the engine's `RecordStore`
//! boundary. Every call checks a connection out of the pool and returns it
//! on all exit paths.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubsync_reconcile::{RecordStore, StoreError};
use hubsync_schemas::{CrmSync, NewUserRecord, ProfileFields, UserRecord};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::debug;

/// Env var used by DB-backed tests.
pub const ENV_DB_URL: &str = "HUBSYNC_DATABASE_URL";

const UQ_USERS_USERNAME: &str = "uq_users_username";

/// Connect to Postgres with a bounded pool.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations. Idempotent.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_users_table: bool,
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'users'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_users_table: exists,
    })
}

fn user_from_row(row: &PgRow) -> Result<UserRecord> {
    let record_id: i64 = row.try_get("id")?;
    let crm_synced: bool = row.try_get("crm_synced")?;
    let crm_contact_id: Option<i64> = row.try_get("crm_contact_id")?;

    let sync = CrmSync::from_columns(crm_synced, crm_contact_id).ok_or_else(|| {
        anyhow!(
            "record {} has inconsistent sync state: crm_synced={} crm_contact_id={:?}",
            record_id,
            crm_synced,
            crm_contact_id
        )
    })?;

    Ok(UserRecord {
        record_id,
        username: row.try_get("username")?,
        fields: ProfileFields {
            display_name: row.try_get("display_name")?,
            email: row.try_get("email")?,
            bio: row.try_get("bio")?,
            location: row.try_get("location")?,
        },
        created_at: row.try_get::<Option<DateTime<Utc>>, _>("created_at")?,
        sync,
    })
}

/// Exact-match lookup by username.
pub async fn find_user_by_username(pool: &PgPool, username: &str) -> Result<Option<UserRecord>> {
    let row = sqlx::query(
        r#"
        select id, username, display_name, email, bio, location, created_at,
               crm_synced, crm_contact_id
        from users
        where username = $1
        order by id
        limit 1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("find_user_by_username failed")?;

    row.as_ref().map(user_from_row).transpose()
}

/// Insert a new user (unsynced). Returns the assigned id.
pub async fn insert_user(pool: &PgPool, rec: &NewUserRecord) -> Result<i64> {
    let res = sqlx::query_as::<_, (i64,)>(
        r#"
        insert into users (
          username, display_name, email, bio, location, created_at, crm_synced, crm_contact_id
        ) values (
          $1, $2, $3, $4, $5, $6, false, null
        )
        returning id
        "#,
    )
    .bind(&rec.username)
    .bind(&rec.fields.display_name)
    .bind(&rec.fields.email)
    .bind(&rec.fields.bio)
    .bind(&rec.fields.location)
    .bind(rec.created_at)
    .fetch_one(pool)
    .await;

    match res {
        Ok((id,)) => Ok(id),
        Err(e) => {
            if is_unique_constraint_violation(&e, UQ_USERS_USERNAME) {
                return Err(anyhow!("username '{}' is already recorded", rec.username));
            }
            Err(anyhow::Error::new(e).context("insert_user failed"))
        }
    }
}

/// Mark a record synced and bind its contact id.
pub async fn update_sync_status(pool: &PgPool, record_id: i64, contact_id: i64) -> Result<()> {
    let res = sqlx::query(
        r#"
        update users
        set crm_synced = true,
            crm_contact_id = $1
        where id = $2
        "#,
    )
    .bind(contact_id)
    .bind(record_id)
    .execute(pool)
    .await
    .context("update_sync_status failed")?;

    if res.rows_affected() == 0 {
        return Err(anyhow!("update_sync_status: no record with id {}", record_id));
    }
    Ok(())
}

/// Overwrite the mutable profile columns. `created_at` is never touched.
pub async fn update_profile_fields(
    pool: &PgPool,
    record_id: i64,
    fields: &ProfileFields,
) -> Result<()> {
    let res = sqlx::query(
        r#"
        update users
        set display_name = $1,
            email = $2,
            bio = $3,
            location = $4
        where id = $5
        "#,
    )
    .bind(&fields.display_name)
    .bind(&fields.email)
    .bind(&fields.bio)
    .bind(&fields.location)
    .bind(record_id)
    .execute(pool)
    .await
    .context("update_profile_fields failed")?;

    if res.rows_affected() == 0 {
        return Err(anyhow!("update_profile_fields: no record with id {}", record_id));
    }
    Ok(())
}

/// Detect a Postgres unique constraint violation by name.
fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

fn store_err(e: anyhow::Error) -> StoreError {
    StoreError::new(format!("{e:#}"))
}

/// `RecordStore` backed by a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        debug!(username, "db find_by_username");
        find_user_by_username(&self.pool, username).await.map_err(store_err)
    }

    async fn insert(&self, record: &NewUserRecord) -> Result<i64, StoreError> {
        debug!(username = %record.username, "db insert");
        insert_user(&self.pool, record).await.map_err(store_err)
    }

    async fn update_sync_status(&self, record_id: i64, contact_id: i64) -> Result<(), StoreError> {
        debug!(record_id, contact_id, "db update_sync_status");
        update_sync_status(&self.pool, record_id, contact_id)
            .await
            .map_err(store_err)
    }

    async fn update_profile_fields(
        &self,
        record_id: i64,
        fields: &ProfileFields,
    ) -> Result<(), StoreError> {
        debug!(record_id, "db update_profile_fields");
        update_profile_fields(&self.pool, record_id, fields)
            .await
            .map_err(store_err)
    }
}
