use hubsync_schemas::{CrmSync, UserRecord};

/// Point-in-time classification of one username, taken from a single
/// record store lookup. Never re-checked between transition steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordState {
    /// No record for this username.
    Unknown,
    /// Record exists, no CRM contact yet.
    PendingSync(UserRecord),
    /// Record exists and is bound to a CRM contact.
    Synced { record: UserRecord, contact_id: i64 },
}

impl RecordState {
    pub fn classify(found: Option<UserRecord>) -> Self {
        match found {
            None => RecordState::Unknown,
            Some(record) => match record.sync {
                CrmSync::Pending => RecordState::PendingSync(record),
                CrmSync::Synced { contact_id } => RecordState::Synced { record, contact_id },
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Unknown => "UNKNOWN",
            RecordState::PendingSync(_) => "PENDING_SYNC",
            RecordState::Synced { .. } => "SYNCED",
        }
    }
}

/// Which transition ran. Exactly one per successful call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Unknown: new record + new contact created.
    RecordAndContactCreated { record_id: i64, contact_id: i64 },
    /// PendingSync: new contact created for an existing record.
    ContactCreated { record_id: i64, contact_id: i64 },
    /// Synced: contact and record updated.
    ContactUpdated { record_id: i64, contact_id: i64 },
}

impl ReconcileOutcome {
    pub fn record_id(&self) -> i64 {
        match self {
            ReconcileOutcome::RecordAndContactCreated { record_id, .. }
            | ReconcileOutcome::ContactCreated { record_id, .. }
            | ReconcileOutcome::ContactUpdated { record_id, .. } => *record_id,
        }
    }

    pub fn contact_id(&self) -> i64 {
        match self {
            ReconcileOutcome::RecordAndContactCreated { contact_id, .. }
            | ReconcileOutcome::ContactCreated { contact_id, .. }
            | ReconcileOutcome::ContactUpdated { contact_id, .. } => *contact_id,
        }
    }

    /// Operator-facing success lines, in the order the writes happened.
    pub fn messages(&self) -> &'static [&'static str] {
        match self {
            ReconcileOutcome::RecordAndContactCreated { .. } => &[
                "New db user created successfully.",
                "New freshdesk contact created successfully.",
            ],
            ReconcileOutcome::ContactCreated { .. } => {
                &["New freshdesk contact created successfully."]
            }
            ReconcileOutcome::ContactUpdated { .. } => &["Contact updated successfully."],
        }
    }
}
