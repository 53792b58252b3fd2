//! Collaborator boundaries consumed by the engine.
//!
//! Implementations must be `Send + Sync` so they can be held behind
//! references across await points on a multi-threaded runtime.

use async_trait::async_trait;
use hubsync_schemas::{NewUserRecord, ProfileFields, UserProfile, UserRecord};

use crate::error::{CrmError, IdentityError, StoreError};

/// System of record for profile data, addressed by username.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Short name used in logs (e.g. `"github"`).
    fn source_name(&self) -> &'static str;

    async fn fetch(&self, username: &str) -> Result<UserProfile, IdentityError>;
}

/// Local store of previously reconciled users, keyed by username.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point lookup by exact username equality.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert with `crm_synced = false` and no contact id. Returns the new record id.
    async fn insert(&self, record: &NewUserRecord) -> Result<i64, StoreError>;

    /// Mark the record synced and bind it to `contact_id`.
    async fn update_sync_status(&self, record_id: i64, contact_id: i64) -> Result<(), StoreError>;

    /// Overwrite the mutable profile fields. `created_at` is untouched.
    async fn update_profile_fields(
        &self,
        record_id: i64,
        fields: &ProfileFields,
    ) -> Result<(), StoreError>;
}

/// Remote contact store keyed by an opaque numeric id.
///
/// `username` is passed alongside the fields so adapters that require a
/// contact name can fall back to it.
#[async_trait]
pub trait CrmAdapter: Send + Sync {
    fn crm_name(&self) -> &'static str;

    /// Reject a tenant identifier this adapter could never address.
    /// Called before any collaborator is touched.
    fn validate_domain(&self, domain: &str) -> Result<(), CrmError>;

    /// Create a contact in tenant `domain`. Returns the contact id.
    async fn create_contact(
        &self,
        domain: &str,
        username: &str,
        fields: &ProfileFields,
    ) -> Result<i64, CrmError>;

    async fn update_contact(
        &self,
        domain: &str,
        contact_id: i64,
        username: &str,
        fields: &ProfileFields,
    ) -> Result<(), CrmError>;
}
