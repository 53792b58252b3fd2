//! hubsync-schemas
//!
//! Shared identity data model. The identity provider's profile, the local
//! record store's row, and the flat field set pushed to the CRM.

use chrono::{DateTime, Utc};

/// Canonical profile as returned by the identity provider.
///
/// Built fresh on every run and never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Canonical login. Non-empty, unique across the system.
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    /// Set by the identity provider; written once on insert and never again.
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: None,
            email: None,
            bio: None,
            location: None,
            created_at: None,
        }
    }

    /// The mutable field set shared by the record store and the CRM.
    pub fn fields(&self) -> ProfileFields {
        ProfileFields {
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            bio: self.bio.clone(),
            location: self.location.clone(),
        }
    }

    /// Record-without-id for the first insert of this username.
    pub fn to_new_record(&self) -> NewUserRecord {
        NewUserRecord {
            username: self.username.clone(),
            fields: self.fields(),
            created_at: self.created_at,
        }
    }
}

/// Profile fields overwritten wholesale on every update (no field-level merge).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// CRM sync state of a stored record.
///
/// A contact id exists exactly when the record is synced, so the pair
/// (`crm_synced`, `crm_contact_id`) is carried as one value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrmSync {
    #[default]
    Pending,
    Synced { contact_id: i64 },
}

impl CrmSync {
    /// Rebuild from the two stored columns. Returns `None` when they disagree.
    pub fn from_columns(crm_synced: bool, crm_contact_id: Option<i64>) -> Option<Self> {
        match (crm_synced, crm_contact_id) {
            (false, None) => Some(CrmSync::Pending),
            (true, Some(contact_id)) => Some(CrmSync::Synced { contact_id }),
            _ => None,
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, CrmSync::Synced { .. })
    }

    pub fn contact_id(&self) -> Option<i64> {
        match self {
            CrmSync::Pending => None,
            CrmSync::Synced { contact_id } => Some(*contact_id),
        }
    }
}

/// The record store's view of a previously seen user.
///
/// `record_id` and `username` never change after insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub record_id: i64,
    pub username: String,
    pub fields: ProfileFields,
    pub created_at: Option<DateTime<Utc>>,
    pub sync: CrmSync,
}

impl UserRecord {
    pub fn crm_synced(&self) -> bool {
        self.sync.is_synced()
    }

    pub fn crm_contact_id(&self) -> Option<i64> {
        self.sync.contact_id()
    }
}

/// Insert payload. Sync state always starts as [`CrmSync::Pending`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRecord {
    pub username: String,
    pub fields: ProfileFields,
    pub created_at: Option<DateTime<Utc>>,
}
