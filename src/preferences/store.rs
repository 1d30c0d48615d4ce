use anyhow::Result;

use crate::notifications::NotificationType;

use super::models::{AccountRole, PreferenceRecord};

pub trait PreferenceStore: Send + Sync {
    /// Returns the preference record for a (user, role) pair.
    /// Returns Ok(None) if the pair has never been bootstrapped.
    fn get_preferences(
        &self,
        user_id: usize,
        role: AccountRole,
    ) -> Result<Option<PreferenceRecord>>;

    /// Full replace of a (user, role) record. Idempotent.
    fn upsert_preferences(&self, record: &PreferenceRecord) -> Result<()>;

    /// Whether a notification of this type may be delivered to the user
    /// under the given role.
    ///
    /// No record means deny: filtering never creates state, and a user who
    /// has not been bootstrapped yet has not consented to anything. The
    /// master switch suppresses every type. Types without a toggle category
    /// are allowed, so system types added after the category table was last
    /// touched are not silently dropped.
    fn is_allowed(
        &self,
        user_id: usize,
        role: AccountRole,
        kind: NotificationType,
    ) -> Result<bool> {
        let record = match self.get_preferences(user_id, role)? {
            Some(record) => record,
            None => return Ok(false),
        };

        if !record.all_notifications {
            return Ok(false);
        }

        Ok(match kind.preference_category() {
            Some(category) => record.category_enabled(category),
            None => true,
        })
    }
}
