//! Optimistic create/update/delete over a [`Collection`].

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::domain::{
    merge_fields, now_timestamp, EntityKey, Record, CREATED_AT_FIELD, DEFAULT_ID_FIELD,
    UPDATED_AT_FIELD,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    collection::Collection,
    error::{MutationError, RemoteFailure},
    normalize::{normalize, FALLBACK_MESSAGE},
    notify::{deliver, Notification, Notifier, TracingNotifier},
    state::MutationState,
    temp_id::{TempIdIssuer, DEFAULT_TEMP_ID_PREFIX},
    RemoteAdapter,
};

pub const DEFAULT_ENTITY_LABEL: &str = "Item";

/// `(record, remote_result, temp_id) -> reconciled record`
pub type CreateReconciler = Arc<dyn Fn(&Record, &Value, &str) -> Record + Send + Sync>;
/// `(current record, remote_result) -> reconciled record`
pub type UpdateReconciler = Arc<dyn Fn(&Record, &Value) -> Record + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationOptions {
    /// Attribute holding the identifier.
    pub id_field: String,
    pub temp_id_prefix: String,
    /// Human name of the entity, used in notifications ("User created").
    pub entity_label: String,
}

impl Default for MutationOptions {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            temp_id_prefix: DEFAULT_TEMP_ID_PREFIX.to_string(),
            entity_label: DEFAULT_ENTITY_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    pub item: Option<Record>,
    pub remote_result: Option<Value>,
}

impl CreateOutcome {
    fn failed() -> Self {
        Self {
            item: None,
            remote_result: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.item.is_some()
    }
}

/// Default create reconciliation: remote fields win over the optimistic
/// record. An object result may carry the authoritative id; a bare string or
/// number result is taken as the id itself. Without one the temporary id stays.
pub fn default_reconcile_create(
    key: &EntityKey,
    record: &Record,
    remote_result: &Value,
    temp_id: &str,
) -> Record {
    let mut reconciled = record.clone();
    match remote_result {
        Value::Object(fields) => merge_fields(&mut reconciled, fields),
        Value::String(id) if !id.trim().is_empty() => key.set_id(&mut reconciled, id.clone()),
        Value::Number(id) => {
            reconciled.insert(key.field().to_string(), Value::Number(id.clone()));
        }
        _ => {}
    }
    if key.id_of(&reconciled).is_none() {
        key.set_id(&mut reconciled, temp_id);
    }
    reconciled
}

/// Default update reconciliation: merge an object result over the current
/// record, otherwise keep the record as optimistically patched.
pub fn default_reconcile_update(current: &Record, remote_result: &Value) -> Record {
    let mut reconciled = current.clone();
    if let Value::Object(fields) = remote_result {
        merge_fields(&mut reconciled, fields);
    }
    reconciled
}

/// Applies mutations to a [`Collection`] before the remote confirms them, then
/// reconciles or rolls back once it answers.
///
/// Methods never fail: a rejected remote call restores the collection to its
/// pre-operation state, records the normalized message in
/// [`MutationState::last_error`] and notifies the error sink.
///
/// Operations on the same id are not serialized against each other. When an
/// update and a delete of one record overlap, whichever remote call resolves
/// last decides what the collection holds for that id. Overlapping updates of
/// one id also share a single busy flag, cleared by the first to finish.
pub struct MutationController {
    collection: Collection,
    remote: Arc<dyn RemoteAdapter>,
    notifier: Arc<dyn Notifier>,
    key: EntityKey,
    label: String,
    temp_ids: TempIdIssuer,
    reconcile_create: Option<CreateReconciler>,
    reconcile_update: Option<UpdateReconciler>,
    state: watch::Sender<MutationState>,
}

impl MutationController {
    pub fn new(collection: Collection, remote: Arc<dyn RemoteAdapter>) -> Self {
        Self::new_with_options(collection, remote, MutationOptions::default())
    }

    pub fn new_with_options(
        collection: Collection,
        remote: Arc<dyn RemoteAdapter>,
        options: MutationOptions,
    ) -> Self {
        let (state, _) = watch::channel(MutationState::default());
        Self {
            collection,
            remote,
            notifier: Arc::new(TracingNotifier),
            key: EntityKey::new(options.id_field),
            label: options.entity_label,
            temp_ids: TempIdIssuer::new(options.temp_id_prefix),
            reconcile_create: None,
            reconcile_update: None,
            state,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replaces [`default_reconcile_create`]. The closure runs outside the
    /// collection lock and may read the collection; if it panics the default
    /// reconciliation is used instead.
    pub fn with_create_reconciler(
        mut self,
        reconcile: impl Fn(&Record, &Value, &str) -> Record + Send + Sync + 'static,
    ) -> Self {
        self.reconcile_create = Some(Arc::new(reconcile));
        self
    }

    /// Replaces [`default_reconcile_update`], with the same guarantees as
    /// [`MutationController::with_create_reconciler`].
    pub fn with_update_reconciler(
        mut self,
        reconcile: impl Fn(&Record, &Value) -> Record + Send + Sync + 'static,
    ) -> Self {
        self.reconcile_update = Some(Arc::new(reconcile));
        self
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }

    pub fn is_creating(&self) -> bool {
        self.state.borrow().create_busy
    }

    pub fn is_updating(&self, id: &str) -> bool {
        self.state.borrow().is_updating(id)
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.state.borrow().is_deleting(id)
    }

    pub fn last_error(&self) -> Option<MutationError> {
        self.state.borrow().last_error.clone()
    }

    /// True while `id` is the temporary id of a create awaiting the remote.
    /// A confirmed record that kept its temporary id is no longer pending.
    pub fn is_pending(&self, id: &str) -> bool {
        self.temp_ids.is_in_flight(id)
    }

    pub async fn create_item(&self, draft: Record) -> CreateOutcome {
        self.state.send_modify(|state| {
            state.last_error = None;
            state.create_busy = true;
        });

        let temp_id = self
            .temp_ids
            .issue(|candidate| self.collection.contains(&self.key, candidate));
        let now = now_timestamp();
        let mut optimistic = draft.clone();
        self.key.set_id(&mut optimistic, temp_id.clone());
        optimistic.insert(CREATED_AT_FIELD.to_string(), Value::String(now.clone()));
        optimistic.insert(UPDATED_AT_FIELD.to_string(), Value::String(now));
        self.collection.push_front(optimistic.clone());
        debug!(temp_id = %temp_id, entity = %self.label, "mutation: optimistic create applied");

        let answer = self.remote.create(&draft).await;
        self.temp_ids.settle(&temp_id);
        let outcome = match answer {
            Ok(remote_result) => {
                let item = self.settle_created(&optimistic, &remote_result, &temp_id);
                info!(
                    temp_id = %temp_id,
                    id = %self.key.id_of(&item).unwrap_or_default(),
                    entity = %self.label,
                    "mutation: create confirmed"
                );
                self.notify(Notification::Success(format!("{} created", self.label)));
                CreateOutcome {
                    item: Some(item),
                    remote_result: Some(remote_result),
                }
            }
            Err(failure) => {
                let removed = self.collection.remove_all(&self.key, &temp_id);
                warn!(
                    temp_id = %temp_id,
                    removed,
                    entity = %self.label,
                    "mutation: create rejected; optimistic record rolled back"
                );
                self.fail(MutationError::RemoteCreate {
                    message: self.describe(&failure),
                });
                CreateOutcome::failed()
            }
        };

        self.state.send_modify(|state| state.create_busy = false);
        outcome
    }

    pub async fn update_item(&self, id: &str, patch: Record) -> Option<Record> {
        self.state.send_modify(|state| {
            state.last_error = None;
            state.update_busy.insert(id.to_string(), true);
        });

        let updated = self.apply_update(id, &patch).await;

        self.state.send_modify(|state| {
            state.update_busy.remove(id);
        });
        updated
    }

    pub async fn delete_item(&self, id: &str) -> bool {
        self.state.send_modify(|state| {
            state.last_error = None;
            state.delete_busy.insert(id.to_string(), true);
        });

        let deleted = self.apply_delete(id).await;

        self.state.send_modify(|state| {
            state.delete_busy.remove(id);
        });
        deleted
    }

    async fn apply_update(&self, id: &str, patch: &Record) -> Option<Record> {
        let now = now_timestamp();
        let id_field = self.key.field();
        let applied = self.collection.update_with(&self.key, id, |current| {
            let snapshot = current.clone();
            merge_fields(current, patch);
            current.insert(UPDATED_AT_FIELD.to_string(), Value::String(now));
            // The identity of a confirmed record is not patchable locally.
            if let Some(stable) = snapshot.get(id_field) {
                current.insert(id_field.to_string(), stable.clone());
            }
            (snapshot, current.clone())
        });
        let Some((snapshot, optimistic)) = applied else {
            self.fail(self.not_found(id));
            return None;
        };
        debug!(id, entity = %self.label, "mutation: optimistic update applied");

        match self.remote.update(id, patch).await {
            Ok(remote_result) => {
                let current = self.collection.get(&self.key, id);
                let reconciled =
                    self.reconcile_updated(current.as_ref().unwrap_or(&optimistic), &remote_result);
                let replacement = reconciled.clone();
                let replaced = current.is_some()
                    && self
                        .collection
                        .update_with(&self.key, id, |entry| *entry = replacement)
                        .is_some();
                if !replaced {
                    debug!(id, "mutation: record removed before update resolved; not re-inserting");
                }
                info!(id, entity = %self.label, "mutation: update confirmed");
                self.notify(Notification::Success(format!("{} updated", self.label)));
                Some(reconciled)
            }
            Err(failure) => {
                let restored = self
                    .collection
                    .update_with(&self.key, id, |current| *current = snapshot)
                    .is_some();
                warn!(
                    id,
                    restored,
                    entity = %self.label,
                    "mutation: update rejected; snapshot restored"
                );
                self.fail(MutationError::RemoteUpdate {
                    id: id.to_string(),
                    message: self.describe(&failure),
                });
                None
            }
        }
    }

    async fn apply_delete(&self, id: &str) -> bool {
        let Some((index, snapshot)) = self.collection.remove(&self.key, id) else {
            self.fail(self.not_found(id));
            return false;
        };
        debug!(id, index, entity = %self.label, "mutation: optimistic delete applied");

        match self.remote.delete(id).await {
            Ok(()) => {
                info!(id, entity = %self.label, "mutation: delete confirmed");
                self.notify(Notification::Success(format!("{} deleted", self.label)));
                true
            }
            Err(failure) => {
                let restored_at = self.collection.insert_at(index, snapshot);
                warn!(
                    id,
                    index,
                    restored_at,
                    entity = %self.label,
                    "mutation: delete rejected; record re-inserted"
                );
                self.fail(MutationError::RemoteDelete {
                    id: id.to_string(),
                    message: self.describe(&failure),
                });
                false
            }
        }
    }

    /// Swaps the optimistic record for its reconciled form. Falls back to
    /// re-inserting at the front when the caller removed it in the meantime.
    fn settle_created(&self, optimistic: &Record, remote_result: &Value, temp_id: &str) -> Record {
        let current = self.collection.get(&self.key, temp_id);
        let reconciled =
            self.reconcile_created(current.as_ref().unwrap_or(optimistic), remote_result, temp_id);
        let replacement = reconciled.clone();
        let reinserted = self.collection.modify(|records| {
            let (index, reinserted) = match self.key.position(records, temp_id) {
                Some(index) => {
                    records[index] = replacement;
                    (index, false)
                }
                None => {
                    records.insert(0, replacement);
                    (0, true)
                }
            };
            self.drop_duplicates(records, index);
            Some(reinserted)
        });
        if reinserted == Some(true) {
            debug!(temp_id, "mutation: optimistic record gone before create resolved; re-inserted");
        }
        reconciled
    }

    /// Removes every record sharing the id of `records[keep]`, except `keep`.
    fn drop_duplicates(&self, records: &mut Vec<Record>, keep: usize) {
        let Some(id) = self.key.id_of(&records[keep]) else {
            return;
        };
        let mut index = 0;
        records.retain(|record| {
            let retain = index == keep || !self.key.matches(record, &id);
            index += 1;
            retain
        });
    }

    // Caller-supplied reconcilers run outside the collection lock; a panic
    // falls back to the default reconciliation.
    fn reconcile_created(&self, record: &Record, remote_result: &Value, temp_id: &str) -> Record {
        if let Some(reconcile) = &self.reconcile_create {
            match panic::catch_unwind(AssertUnwindSafe(|| reconcile(record, remote_result, temp_id))) {
                Ok(reconciled) => return reconciled,
                Err(_) => error!(
                    temp_id,
                    entity = %self.label,
                    "mutation: create reconciler panicked; using default reconciliation"
                ),
            }
        }
        default_reconcile_create(&self.key, record, remote_result, temp_id)
    }

    fn reconcile_updated(&self, current: &Record, remote_result: &Value) -> Record {
        if let Some(reconcile) = &self.reconcile_update {
            match panic::catch_unwind(AssertUnwindSafe(|| reconcile(current, remote_result))) {
                Ok(reconciled) => return reconciled,
                Err(_) => error!(
                    entity = %self.label,
                    "mutation: update reconciler panicked; using default reconciliation"
                ),
            }
        }
        default_reconcile_update(current, remote_result)
    }

    fn not_found(&self, id: &str) -> MutationError {
        debug!(id, entity = %self.label, "mutation: target not in collection; remote not called");
        MutationError::NotFound {
            label: self.label.clone(),
            id: id.to_string(),
        }
    }

    fn describe(&self, failure: &RemoteFailure) -> String {
        let message = normalize(failure);
        if message == FALLBACK_MESSAGE {
            warn!(?failure, entity = %self.label, "mutation: unrecognised failure shape");
        }
        message
    }

    fn fail(&self, error: MutationError) {
        let message = error.to_string();
        self.state.send_modify(|state| state.last_error = Some(error));
        self.notify(Notification::Error(message));
    }

    fn notify(&self, notification: Notification) {
        deliver(self.notifier.as_ref(), &notification);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
