//! hubsync-testkit
//!
//! In-memory fakes of the three collaborators, sharing one call journal so
//! scenario tests can assert on cross-collaborator ordering.
//!
//! Test-only. Nothing here touches the network or a database.

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use hubsync_reconcile::{ReconcileError, ReconcileOutcome};
use hubsync_schemas::{ProfileFields, UserProfile};

mod crm;
mod identity;
mod store;

pub use crm::{CrmFailure, FakeCrm};
pub use identity::{FakeIdentity, IdentityFailure};
pub use store::{MemoryRecordStore, StoreOp};

/// One observed collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch {
        username: String,
    },
    FindByUsername {
        username: String,
    },
    Insert {
        username: String,
    },
    UpdateSyncStatus {
        record_id: i64,
        contact_id: i64,
    },
    UpdateProfileFields {
        record_id: i64,
        fields: ProfileFields,
    },
    CreateContact {
        domain: String,
        fields: ProfileFields,
    },
    UpdateContact {
        domain: String,
        contact_id: i64,
        fields: ProfileFields,
    },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::Fetch { .. } => "fetch",
            Call::FindByUsername { .. } => "find_by_username",
            Call::Insert { .. } => "insert",
            Call::UpdateSyncStatus { .. } => "update_sync_status",
            Call::UpdateProfileFields { .. } => "update_profile_fields",
            Call::CreateContact { .. } => "create_contact",
            Call::UpdateContact { .. } => "update_contact",
        }
    }
}

/// Append-only call log shared by the fakes.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, call: Call) {
        self.calls.lock().expect("journal poisoned").push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("journal poisoned").clone()
    }

    /// Call names in order, e.g. `["fetch", "find_by_username", "insert", ...]`.
    pub fn names(&self) -> Vec<&'static str> {
        self.calls().iter().map(Call::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.name() == name).count()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("journal poisoned").clear();
    }
}

/// All three fakes wired to one journal.
#[derive(Debug, Clone)]
pub struct Harness {
    pub journal: Journal,
    pub identity: FakeIdentity,
    pub store: MemoryRecordStore,
    pub crm: FakeCrm,
}

impl Harness {
    /// CRM contact ids are handed out from `first_contact_id` upwards.
    pub fn new(first_contact_id: i64) -> Self {
        let journal = Journal::new();
        Self {
            identity: FakeIdentity::new(journal.clone()),
            store: MemoryRecordStore::new(journal.clone()),
            crm: FakeCrm::new(journal.clone(), first_contact_id),
            journal,
        }
    }

    pub async fn run(&self, username: &str, domain: &str) -> Result<ReconcileOutcome, ReconcileError> {
        hubsync_reconcile::reconcile(&self.identity, &self.store, &self.crm, username, domain).await
    }
}

/// The canonical sample profile.
pub fn octocat() -> UserProfile {
    UserProfile {
        username: "octocat".to_string(),
        display_name: Some("The Octocat".to_string()),
        email: Some("octo@github.com".to_string()),
        bio: None,
        location: Some("San Francisco".to_string()),
        created_at: Utc.with_ymd_and_hms(2011, 1, 25, 18, 44, 36).single(),
    }
}
