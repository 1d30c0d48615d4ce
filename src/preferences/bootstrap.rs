use anyhow::Result;
use tracing::info;

use super::models::{AccountRole, PreferenceRecord};
use super::store::PreferenceStore;

/// First-touch preference initializer.
///
/// Writes the role's default record (everything enabled) if the (user, role)
/// pair has none yet; a no-op otherwise. Callers invoke this at first
/// successful authentication under a role, so a record exists before any
/// delivery filtering runs for that pair.
pub fn ensure_preferences<S: PreferenceStore + ?Sized>(
    store: &S,
    user_id: usize,
    role: AccountRole,
) -> Result<()> {
    if store.get_preferences(user_id, role)?.is_some() {
        return Ok(());
    }

    info!(
        "Creating default {} notification preferences for user {}",
        role.as_str(),
        user_id
    );
    store.upsert_preferences(&PreferenceRecord::defaults(user_id, role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        records: Mutex<HashMap<(usize, AccountRole), PreferenceRecord>>,
        upserts: Mutex<usize>,
    }

    impl PreferenceStore for RecordingStore {
        fn get_preferences(
            &self,
            user_id: usize,
            role: AccountRole,
        ) -> Result<Option<PreferenceRecord>> {
            Ok(self.records.lock().unwrap().get(&(user_id, role)).cloned())
        }

        fn upsert_preferences(&self, record: &PreferenceRecord) -> Result<()> {
            *self.upserts.lock().unwrap() += 1;
            self.records
                .lock()
                .unwrap()
                .insert((record.user_id, record.role), record.clone());
            Ok(())
        }
    }

    #[test]
    fn creates_defaults_when_absent() {
        let store = RecordingStore::default();

        ensure_preferences(&store, 5, AccountRole::Company).unwrap();

        let record = store
            .get_preferences(5, AccountRole::Company)
            .unwrap()
            .unwrap();
        assert_eq!(record, PreferenceRecord::defaults(5, AccountRole::Company));
    }

    #[test]
    fn is_idempotent() {
        let store = RecordingStore::default();

        ensure_preferences(&store, 5, AccountRole::Member).unwrap();
        ensure_preferences(&store, 5, AccountRole::Member).unwrap();

        assert_eq!(*store.upserts.lock().unwrap(), 1);
    }

    #[test]
    fn does_not_clobber_user_changes() {
        let store = RecordingStore::default();
        let mut record = PreferenceRecord::defaults(5, AccountRole::Member);
        record.all_notifications = false;
        store.upsert_preferences(&record).unwrap();

        ensure_preferences(&store, 5, AccountRole::Member).unwrap();

        let stored = store
            .get_preferences(5, AccountRole::Member)
            .unwrap()
            .unwrap();
        assert!(!stored.all_notifications);
    }
}
