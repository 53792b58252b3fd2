use hubsync_schemas::UserProfile;
use tracing::{error, info};

use crate::error::ReconcileError;
use crate::ports::{CrmAdapter, IdentitySource, RecordStore};
use crate::types::{ReconcileOutcome, RecordState};

fn require_non_blank(what: &str, value: &str) -> Result<(), ReconcileError> {
    if value.trim().is_empty() {
        return Err(ReconcileError::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Reconcile one username across the record store and the CRM.
///
/// Fail-fast: the first failing step aborts the transition and earlier
/// writes stay in place. Not safe against concurrent calls for the same
/// username (two Unknown classifications insert two records).
pub async fn reconcile<I, S, C>(
    identity: &I,
    store: &S,
    crm: &C,
    username: &str,
    crm_domain: &str,
) -> Result<ReconcileOutcome, ReconcileError>
where
    I: IdentitySource + ?Sized,
    S: RecordStore + ?Sized,
    C: CrmAdapter + ?Sized,
{
    require_non_blank("username", username)?;
    require_non_blank("crm domain", crm_domain)?;
    crm.validate_domain(crm_domain)
        .map_err(|e| ReconcileError::InvalidInput(e.to_string()))?;

    let profile = identity
        .fetch(username)
        .await
        .map_err(|source| ReconcileError::FetchProfile {
            username: username.to_string(),
            source,
        })?;
    info!(
        source = identity.source_name(),
        username = %profile.username,
        "profile fetched"
    );

    // Keyed by the canonical login, not the raw argument.
    let found = store
        .find_by_username(&profile.username)
        .await
        .map_err(|source| ReconcileError::Lookup {
            username: profile.username.clone(),
            source,
        })?;

    let state = RecordState::classify(found);
    info!(username = %profile.username, state = state.as_str(), "record classified");

    match state {
        RecordState::Unknown => {
            let record_id = store
                .insert(&profile.to_new_record())
                .await
                .map_err(|source| ReconcileError::InsertRecord {
                    username: profile.username.clone(),
                    source,
                })?;
            info!(username = %profile.username, record_id, "record inserted");

            let contact_id = create_and_bind_contact(store, crm, &profile, record_id, crm_domain).await?;
            Ok(ReconcileOutcome::RecordAndContactCreated {
                record_id,
                contact_id,
            })
        }

        RecordState::PendingSync(record) => {
            let record_id = record.record_id;
            let contact_id = create_and_bind_contact(store, crm, &profile, record_id, crm_domain).await?;
            Ok(ReconcileOutcome::ContactCreated {
                record_id,
                contact_id,
            })
        }

        RecordState::Synced { record, contact_id } => {
            let record_id = record.record_id;
            let fields = profile.fields();

            crm.update_contact(crm_domain, contact_id, &profile.username, &fields)
                .await
                .map_err(|source| ReconcileError::UpdateContact { contact_id, source })?;
            info!(crm = crm.crm_name(), record_id, contact_id, "contact updated");

            store
                .update_profile_fields(record_id, &fields)
                .await
                .map_err(|source| ReconcileError::UpdateProfile {
                    record_id,
                    contact_id,
                    source,
                })?;
            info!(record_id, "record profile fields updated");

            Ok(ReconcileOutcome::ContactUpdated {
                record_id,
                contact_id,
            })
        }
    }
}

/// Shared tail of the Unknown and PendingSync transitions:
/// create the contact, then record the binding.
async fn create_and_bind_contact<S, C>(
    store: &S,
    crm: &C,
    profile: &UserProfile,
    record_id: i64,
    crm_domain: &str,
) -> Result<i64, ReconcileError>
where
    S: RecordStore + ?Sized,
    C: CrmAdapter + ?Sized,
{
    let contact_id = crm
        .create_contact(crm_domain, &profile.username, &profile.fields())
        .await
        .map_err(|source| ReconcileError::CreateContact { record_id, source })?;
    info!(crm = crm.crm_name(), record_id, contact_id, "contact created");

    if let Err(source) = store.update_sync_status(record_id, contact_id).await {
        error!(
            record_id,
            contact_id,
            "contact created but sync status not recorded; re-running now would duplicate the contact"
        );
        return Err(ReconcileError::SyncStatusNotRecorded {
            record_id,
            contact_id,
            source,
        });
    }
    info!(record_id, contact_id, "record marked synced");

    Ok(contact_id)
}
