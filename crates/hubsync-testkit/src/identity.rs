use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hubsync_reconcile::{IdentityError, IdentitySource};
use hubsync_schemas::UserProfile;

use crate::{Call, Journal};

/// Failure to inject on the next fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityFailure {
    Auth(String),
    Transport(String),
}

#[derive(Debug, Default)]
struct State {
    /// Keyed by the lowercased requested name; the stored profile carries the canonical login.
    profiles: BTreeMap<String, UserProfile>,
    failure: Option<IdentityFailure>,
}

/// Identity source serving profiles from memory. Unknown names are `NotFound`.
#[derive(Debug, Clone)]
pub struct FakeIdentity {
    journal: Journal,
    state: Arc<Mutex<State>>,
}

impl FakeIdentity {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Serve `profile` for its username (case-insensitive, like GitHub).
    pub fn put(&self, profile: UserProfile) {
        let mut st = self.state.lock().expect("identity state poisoned");
        st.profiles.insert(profile.username.to_ascii_lowercase(), profile);
    }

    pub fn fail_with(&self, failure: IdentityFailure) {
        self.state.lock().expect("identity state poisoned").failure = Some(failure);
    }
}

#[async_trait]
impl IdentitySource for FakeIdentity {
    fn source_name(&self) -> &'static str {
        "fake-identity"
    }

    async fn fetch(&self, username: &str) -> Result<UserProfile, IdentityError> {
        self.journal.record(Call::Fetch {
            username: username.to_string(),
        });

        let st = self.state.lock().expect("identity state poisoned");
        match &st.failure {
            Some(IdentityFailure::Auth(msg)) => return Err(IdentityError::Auth(msg.clone())),
            Some(IdentityFailure::Transport(msg)) => {
                return Err(IdentityError::Transport(msg.clone()))
            }
            None => {}
        }
        st.profiles
            .get(&username.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| IdentityError::NotFound(username.to_string()))
    }
}
