//! Scenario: a record exists but was never bound to a CRM contact.
//!
//! The run creates exactly one contact and binds it. It never inserts a
//! second record and never takes the update path.

use hubsync_reconcile::ReconcileOutcome;
use hubsync_schemas::CrmSync;
use hubsync_testkit::{octocat, Call, Harness};

#[tokio::test]
async fn pending_record_is_bound_to_a_new_contact() {
    let h = Harness::new(432);
    h.identity.put(octocat());
    let record_id = h.store.seed(&octocat(), CrmSync::Pending);

    let outcome = h.run("octocat", "acme").await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::ContactCreated {
            record_id,
            contact_id: 432
        }
    );
    assert_eq!(
        outcome.messages(),
        ["New freshdesk contact created successfully."]
    );

    assert_eq!(
        h.journal.names(),
        vec![
            "fetch",
            "find_by_username",
            "create_contact",
            "update_sync_status"
        ]
    );
    assert_eq!(
        h.store.get(record_id).unwrap().sync,
        CrmSync::Synced { contact_id: 432 }
    );
}

#[tokio::test]
async fn pending_record_never_triggers_insert_or_update() {
    let h = Harness::new(500);
    h.identity.put(octocat());
    h.store.seed(&octocat(), CrmSync::Pending);

    h.run("octocat", "acme").await.unwrap();

    assert_eq!(h.journal.count("create_contact"), 1);
    assert_eq!(h.journal.count("insert"), 0);
    assert_eq!(h.journal.count("update_contact"), 0);
    assert_eq!(h.journal.count("update_profile_fields"), 0);
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn pending_record_binding_uses_the_stored_record_id() {
    let h = Harness::new(432);
    h.identity.put(octocat());

    let mut other = octocat();
    other.username = "hubot".to_string();
    h.store.seed(&other, CrmSync::Synced { contact_id: 9 });
    let record_id = h.store.seed(&octocat(), CrmSync::Pending);
    assert_eq!(record_id, 2);

    h.run("octocat", "acme").await.unwrap();

    assert!(h.journal.calls().contains(&Call::UpdateSyncStatus {
        record_id: 2,
        contact_id: 432
    }));
    assert_eq!(
        h.store.get(1).unwrap().sync,
        CrmSync::Synced { contact_id: 9 }
    );
}
