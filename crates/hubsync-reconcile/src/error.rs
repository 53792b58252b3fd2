use thiserror::Error;

/// Identity provider failure.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("user '{0}' not found")]
    NotFound(String),

    /// Missing or rejected credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network failure or unexpected non-2xx response.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// Local persistence failure.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// CRM failure.
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-2xx response; `body` is the raw response text.
    #[error("http error status={status} body={body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Engine failure: the step that was attempted plus the collaborator cause.
///
/// Steps completed before the failing one are not rolled back.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to fetch profile for '{username}'")]
    FetchProfile {
        username: String,
        #[source]
        source: IdentityError,
    },

    #[error("failed to look up record for '{username}'")]
    Lookup {
        username: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to persist user info for '{username}'")]
    InsertRecord {
        username: String,
        #[source]
        source: StoreError,
    },

    /// The record is stored (possibly inserted by this run) and still pending.
    #[error("record {record_id} is stored but its contact could not be created; re-run to retry")]
    CreateContact {
        record_id: i64,
        #[source]
        source: CrmError,
    },

    /// The contact exists remotely but the record still says pending.
    /// A re-run would create a second contact unless the record is repaired.
    #[error(
        "contact {contact_id} was created but record {record_id} could not be marked synced; \
         set crm_contact_id={contact_id} on record {record_id} before re-running"
    )]
    SyncStatusNotRecorded {
        record_id: i64,
        contact_id: i64,
        #[source]
        source: StoreError,
    },

    #[error("failed to update contact {contact_id}")]
    UpdateContact {
        contact_id: i64,
        #[source]
        source: CrmError,
    },

    #[error("contact {contact_id} was updated but record {record_id} profile fields were not")]
    UpdateProfile {
        record_id: i64,
        contact_id: i64,
        #[source]
        source: StoreError,
    },
}
