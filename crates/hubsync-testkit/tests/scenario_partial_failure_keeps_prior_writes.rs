//! Scenario: a collaborator fails mid-transition.
//!
//! The run stops at the failing step. Writes already made stay in place and
//! nothing after the failing step is attempted.

use std::error::Error as _;

use hubsync_reconcile::{CrmError, IdentityError, ReconcileError};
use hubsync_schemas::CrmSync;
use hubsync_testkit::{octocat, CrmFailure, Harness, IdentityFailure, StoreOp};

#[tokio::test]
async fn unknown_identity_stops_before_the_store() {
    let h = Harness::new(432);

    let err = h.run("ghost", "acme").await.unwrap_err();
    match &err {
        ReconcileError::FetchProfile { username, source } => {
            assert_eq!(username, "ghost");
            assert!(matches!(source, IdentityError::NotFound(_)));
        }
        other => panic!("expected FetchProfile, got {other}"),
    }
    assert_eq!(h.journal.names(), vec!["fetch"]);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn identity_auth_failure_is_chained_as_source() {
    let h = Harness::new(432);
    h.identity.put(octocat());
    h.identity
        .fail_with(IdentityFailure::Auth("bad credentials".to_string()));

    let err = h.run("octocat", "acme").await.unwrap_err();
    let source = err.source().expect("fetch failure must carry a source");
    assert!(source.to_string().contains("bad credentials"));
    assert_eq!(h.journal.names(), vec!["fetch"]);
}

#[tokio::test]
async fn lookup_failure_stops_before_any_write() {
    let h = Harness::new(432);
    h.identity.put(octocat());
    h.store.fail_on(StoreOp::Find);

    let err = h.run("octocat", "acme").await.unwrap_err();
    assert!(matches!(err, ReconcileError::Lookup { .. }), "got: {err}");
    assert_eq!(h.journal.names(), vec!["fetch", "find_by_username"]);
    assert_eq!(h.crm.contact_count(), 0);
}

#[tokio::test]
async fn insert_failure_reports_persist_error_and_skips_crm() {
    let h = Harness::new(432);
    h.identity.put(octocat());
    h.store.fail_on(StoreOp::Insert);

    let err = h.run("octocat", "acme").await.unwrap_err();
    assert!(matches!(err, ReconcileError::InsertRecord { .. }), "got: {err}");
    assert!(err.to_string().contains("failed to persist user info"));
    assert_eq!(h.journal.count("create_contact"), 0);
}

#[tokio::test]
async fn create_failure_after_insert_leaves_record_pending() {
    let h = Harness::new(432);
    h.identity.put(octocat());
    h.crm.fail_create_with(CrmFailure::Http {
        status: 409,
        body: r#"{"errors":[{"code":"duplicate_value"}]}"#.to_string(),
    });

    let err = h.run("octocat", "acme").await.unwrap_err();
    match &err {
        ReconcileError::CreateContact { record_id, source } => {
            assert_eq!(*record_id, 1);
            assert!(matches!(source, CrmError::Http { status: 409, .. }));
        }
        other => panic!("expected CreateContact, got {other}"),
    }

    let msg = err.to_string();
    assert!(
        msg.contains("record 1 is stored"),
        "operator must learn the record exists: {msg}"
    );

    assert_eq!(h.journal.count("update_sync_status"), 0);
    let rec = h.store.get(1).expect("inserted record must survive");
    assert_eq!(rec.sync, CrmSync::Pending);
}

#[tokio::test]
async fn pending_record_left_by_create_failure_is_recovered_by_rerun() {
    let h = Harness::new(432);
    h.identity.put(octocat());
    h.crm
        .fail_create_with(CrmFailure::Transport("connection reset".to_string()));
    h.run("octocat", "acme").await.unwrap_err();

    let h2 = Harness {
        crm: hubsync_testkit::FakeCrm::new(h.journal.clone(), 432),
        ..h.clone()
    };
    h2.journal.clear();

    let outcome = h2.run("octocat", "acme").await.unwrap();
    assert_eq!(outcome.record_id(), 1);
    assert_eq!(outcome.contact_id(), 432);
    assert_eq!(h2.journal.count("insert"), 0);
    assert_eq!(h2.store.len(), 1);
}

#[tokio::test]
async fn bind_failure_names_the_orphaned_contact() {
    let h = Harness::new(432);
    h.identity.put(octocat());
    h.store.fail_on(StoreOp::UpdateSyncStatus);

    let err = h.run("octocat", "acme").await.unwrap_err();
    match &err {
        ReconcileError::SyncStatusNotRecorded {
            record_id,
            contact_id,
            ..
        } => {
            assert_eq!(*record_id, 1);
            assert_eq!(*contact_id, 432);
        }
        other => panic!("expected SyncStatusNotRecorded, got {other}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("432"), "message must name the contact: {msg}");

    // The contact exists remotely while the record still reads pending.
    assert_eq!(h.crm.contact_count(), 1);
    assert_eq!(h.store.get(1).unwrap().sync, CrmSync::Pending);
}

#[tokio::test]
async fn update_contact_failure_leaves_record_fields_untouched() {
    let h = Harness::new(999);
    let record_id = h.store.seed(&octocat(), CrmSync::Synced { contact_id: 432 });
    h.crm.seed(432, octocat().fields());
    let mut fresh = octocat();
    fresh.bio = Some("changed".to_string());
    h.identity.put(fresh);
    h.crm
        .fail_update_with(CrmFailure::Auth("token revoked".to_string()));

    let err = h.run("octocat", "acme").await.unwrap_err();
    assert!(
        matches!(err, ReconcileError::UpdateContact { contact_id: 432, .. }),
        "got: {err}"
    );
    assert_eq!(h.journal.count("update_profile_fields"), 0);
    assert_eq!(h.store.get(record_id).unwrap().fields.bio, None);
}

#[tokio::test]
async fn profile_update_failure_after_contact_update_is_reported() {
    let h = Harness::new(999);
    let record_id = h.store.seed(&octocat(), CrmSync::Synced { contact_id: 432 });
    h.crm.seed(432, octocat().fields());
    let mut fresh = octocat();
    fresh.bio = Some("changed".to_string());
    h.identity.put(fresh.clone());
    h.store.fail_on(StoreOp::UpdateProfileFields);

    let err = h.run("octocat", "acme").await.unwrap_err();
    assert!(
        matches!(err, ReconcileError::UpdateProfile { record_id: 1, contact_id: 432, .. }),
        "got: {err}"
    );
    assert_eq!(h.crm.contact(432), Some(fresh.fields()));
    assert_eq!(h.store.get(record_id).unwrap().fields.bio, None);
}
