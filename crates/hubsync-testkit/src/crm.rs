use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hubsync_reconcile::{CrmAdapter, CrmError};
use hubsync_schemas::ProfileFields;

use crate::{Call, Journal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrmFailure {
    Auth(String),
    Http { status: u16, body: String },
    Transport(String),
}

impl CrmFailure {
    fn to_error(&self) -> CrmError {
        match self {
            CrmFailure::Auth(m) => CrmError::Auth(m.clone()),
            CrmFailure::Http { status, body } => CrmError::Http {
                status: *status,
                body: body.clone(),
            },
            CrmFailure::Transport(m) => CrmError::Transport(m.clone()),
        }
    }
}

#[derive(Debug)]
struct State {
    contacts: BTreeMap<i64, ProfileFields>,
    next_id: i64,
    fail_create: Option<CrmFailure>,
    fail_update: Option<CrmFailure>,
}

/// CRM holding contacts in memory, ids handed out sequentially.
#[derive(Debug, Clone)]
pub struct FakeCrm {
    journal: Journal,
    state: Arc<Mutex<State>>,
}

impl FakeCrm {
    pub fn new(journal: Journal, first_contact_id: i64) -> Self {
        Self {
            journal,
            state: Arc::new(Mutex::new(State {
                contacts: BTreeMap::new(),
                next_id: first_contact_id,
                fail_create: None,
                fail_update: None,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("crm state poisoned")
    }

    pub fn fail_create_with(&self, failure: CrmFailure) {
        self.lock().fail_create = Some(failure);
    }

    pub fn fail_update_with(&self, failure: CrmFailure) {
        self.lock().fail_update = Some(failure);
    }

    /// Place a contact as if created earlier.
    pub fn seed(&self, contact_id: i64, fields: ProfileFields) {
        self.lock().contacts.insert(contact_id, fields);
    }

    pub fn contact(&self, contact_id: i64) -> Option<ProfileFields> {
        self.lock().contacts.get(&contact_id).cloned()
    }

    pub fn contact_count(&self) -> usize {
        self.lock().contacts.len()
    }
}

#[async_trait]
impl CrmAdapter for FakeCrm {
    fn crm_name(&self) -> &'static str {
        "fake-crm"
    }

    /// Same label rule as a hosted tenant: `[A-Za-z0-9-]+`.
    fn validate_domain(&self, domain: &str) -> Result<(), CrmError> {
        if domain.is_empty() || !domain.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(CrmError::InvalidRequest(format!("invalid domain '{domain}'")));
        }
        Ok(())
    }

    async fn create_contact(
        &self,
        domain: &str,
        _username: &str,
        fields: &ProfileFields,
    ) -> Result<i64, CrmError> {
        self.journal.record(Call::CreateContact {
            domain: domain.to_string(),
            fields: fields.clone(),
        });

        let mut st = self.lock();
        if let Some(f) = &st.fail_create {
            return Err(f.to_error());
        }
        let id = st.next_id;
        st.next_id += 1;
        st.contacts.insert(id, fields.clone());
        Ok(id)
    }

    async fn update_contact(
        &self,
        domain: &str,
        contact_id: i64,
        _username: &str,
        fields: &ProfileFields,
    ) -> Result<(), CrmError> {
        self.journal.record(Call::UpdateContact {
            domain: domain.to_string(),
            contact_id,
            fields: fields.clone(),
        });

        let mut st = self.lock();
        if let Some(f) = &st.fail_update {
            return Err(f.to_error());
        }
        match st.contacts.get_mut(&contact_id) {
            Some(c) => {
                *c = fields.clone();
                Ok(())
            }
            None => Err(CrmError::Http {
                status: 404,
                body: format!(r#"{{"description":"contact {contact_id} not found"}}"#),
            }),
        }
    }
}
