use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hubsync_reconcile::{RecordStore, StoreError};
use hubsync_schemas::{CrmSync, NewUserRecord, ProfileFields, UserProfile, UserRecord};
use tokio::sync::Barrier;

use crate::{Call, Journal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreOp {
    Find,
    Insert,
    UpdateSyncStatus,
    UpdateProfileFields,
}

#[derive(Debug)]
struct LookupGate {
    barrier: Arc<Barrier>,
    remaining: usize,
}

#[derive(Debug)]
struct State {
    records: BTreeMap<i64, UserRecord>,
    next_id: i64,
    fail_on: BTreeSet<StoreOp>,
    gate: Option<LookupGate>,
}

/// Record store in memory. Does not enforce username uniqueness, so
/// overlapping runs can produce duplicates exactly as the engine allows.
#[derive(Debug, Clone)]
pub struct MemoryRecordStore {
    journal: Journal,
    state: Arc<Mutex<State>>,
}

impl MemoryRecordStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            state: Arc::new(Mutex::new(State {
                records: BTreeMap::new(),
                next_id: 1,
                fail_on: BTreeSet::new(),
                gate: None,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("store state poisoned")
    }

    pub fn fail_on(&self, op: StoreOp) {
        self.lock().fail_on.insert(op);
    }

    /// The next `parties` lookups each take their snapshot, then wait until
    /// all of them have looked. Simulates overlapping invocations.
    pub fn hold_lookups(&self, parties: usize) {
        self.lock().gate = Some(LookupGate {
            barrier: Arc::new(Barrier::new(parties)),
            remaining: parties,
        });
    }

    /// Seed a record without touching the journal.
    pub fn seed(&self, profile: &UserProfile, sync: CrmSync) -> i64 {
        let mut st = self.lock();
        let record_id = st.next_id;
        st.next_id += 1;
        st.records.insert(
            record_id,
            UserRecord {
                record_id,
                username: profile.username.clone(),
                fields: profile.fields(),
                created_at: profile.created_at,
                sync,
            },
        );
        record_id
    }

    pub fn get(&self, record_id: i64) -> Option<UserRecord> {
        self.lock().records.get(&record_id).cloned()
    }

    pub fn records_for(&self, username: &str) -> Vec<UserRecord> {
        self.lock()
            .records
            .values()
            .filter(|r| r.username == username)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.lock().fail_on.contains(&op) {
            return Err(StoreError::new(format!("injected store failure on {op:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.journal.record(Call::FindByUsername {
            username: username.to_string(),
        });
        self.check(StoreOp::Find)?;

        let (found, barrier) = {
            let mut st = self.lock();
            let found = st
                .records
                .values()
                .find(|r| r.username == username)
                .cloned();
            let barrier = match st.gate.take() {
                Some(mut gate) => {
                    gate.remaining -= 1;
                    let b = Arc::clone(&gate.barrier);
                    if gate.remaining > 0 {
                        st.gate = Some(gate);
                    }
                    Some(b)
                }
                None => None,
            };
            (found, barrier)
        };

        if let Some(b) = barrier {
            b.wait().await;
        }
        Ok(found)
    }

    async fn insert(&self, record: &NewUserRecord) -> Result<i64, StoreError> {
        self.journal.record(Call::Insert {
            username: record.username.clone(),
        });
        self.check(StoreOp::Insert)?;

        let mut st = self.lock();
        let record_id = st.next_id;
        st.next_id += 1;
        st.records.insert(
            record_id,
            UserRecord {
                record_id,
                username: record.username.clone(),
                fields: record.fields.clone(),
                created_at: record.created_at,
                sync: CrmSync::Pending,
            },
        );
        Ok(record_id)
    }

    async fn update_sync_status(&self, record_id: i64, contact_id: i64) -> Result<(), StoreError> {
        self.journal.record(Call::UpdateSyncStatus {
            record_id,
            contact_id,
        });
        self.check(StoreOp::UpdateSyncStatus)?;

        let mut st = self.lock();
        let rec = st
            .records
            .get_mut(&record_id)
            .ok_or_else(|| StoreError::new(format!("no record with id {record_id}")))?;
        rec.sync = CrmSync::Synced { contact_id };
        Ok(())
    }

    async fn update_profile_fields(
        &self,
        record_id: i64,
        fields: &ProfileFields,
    ) -> Result<(), StoreError> {
        self.journal.record(Call::UpdateProfileFields {
            record_id,
            fields: fields.clone(),
        });
        self.check(StoreOp::UpdateProfileFields)?;

        let mut st = self.lock();
        let rec = st
            .records
            .get_mut(&record_id)
            .ok_or_else(|| StoreError::new(format!("no record with id {record_id}")))?;
        rec.fields = fields.clone();
        Ok(())
    }
}
