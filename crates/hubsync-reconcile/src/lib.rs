//! hubsync-reconcile
//!
//! Identity reconciliation engine.
//!
//! Given a username, bring the local record store and the CRM in line with
//! the identity provider:
//! - Unknown username     => insert record, create contact, mark record synced
//! - Record, not synced   => create contact, mark record synced
//! - Record, synced       => update contact, overwrite record profile fields
//!
//! The engine owns no state. All IO goes through the collaborator traits in
//! [`ports`]; concrete adapters live in their own crates.

mod engine;
mod error;
pub mod ports;
mod types;

pub use engine::reconcile;
pub use error::{CrmError, IdentityError, ReconcileError, StoreError};
pub use ports::{CrmAdapter, IdentitySource, RecordStore};
pub use types::{ReconcileOutcome, RecordState};
