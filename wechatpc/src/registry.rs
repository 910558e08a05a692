//! Account registry: identifier → shared account state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::account::AccountState;
use crate::lock;

/// At most one entry per live identifier.
#[derive(Debug, Default)]
pub struct Registry {
    /// Current identifier to session state.
    accounts: Mutex<HashMap<String, Arc<AccountState>>>,
}

impl Registry {
    /// Returns the state registered under `id`, creating it if absent.
    pub(crate) fn get_or_insert(&self, id: &str) -> Arc<AccountState> {
        let mut map = lock(&self.accounts);
        Arc::clone(
            map.entry(id.to_owned())
                .or_insert_with(|| Arc::new(AccountState::new(id.to_owned()))),
        )
    }

    /// State registered under `id`.
    pub(crate) fn get(&self, id: &str) -> Option<Arc<AccountState>> {
        lock(&self.accounts).get(id).cloned()
    }

    /// Registered identifiers, sorted.
    pub(crate) fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock(&self.accounts).keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Moves the state keyed by `placeholder` to `real` and updates its id.
    ///
    /// Returns `None` if `placeholder` is not registered. An existing entry
    /// under `real` is replaced and its handlers are dropped.
    pub(crate) fn rebind(&self, placeholder: &str, real: &str) -> Option<Arc<AccountState>> {
        let mut map = lock(&self.accounts);
        let state = map.remove(placeholder)?;
        state.set_id(real.to_owned());
        if let Some(prev) = map.insert(real.to_owned(), Arc::clone(&state)) {
            if !Arc::ptr_eq(&prev, &state) {
                tracing::warn!(account = real, "rebind replaced an existing account");
            }
        }
        Some(state)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn get_or_insert_is_idempotent() {
        let reg = Registry::default();
        let a = reg.get_or_insert("A1");
        let b = reg.get_or_insert("A1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.ids(), vec!["A1".to_owned()]);
    }

    #[test]
    fn rebind_moves_the_same_state() {
        let reg = Registry::default();
        let placeholder = reg.get_or_insert("P1");
        let moved = reg.rebind("P1", "wxid_real").unwrap();
        assert!(Arc::ptr_eq(&placeholder, &moved));
        assert_eq!(moved.id(), "wxid_real");
        assert!(reg.get("P1").is_none());
        assert!(reg.get("wxid_real").is_some());
        assert_eq!(reg.ids(), vec!["wxid_real".to_owned()]);
    }

    #[test]
    fn rebind_unknown_placeholder() {
        let reg = Registry::default();
        reg.get_or_insert("A1");
        assert!(reg.rebind("P9", "wxid_real").is_none());
        assert_eq!(reg.ids(), vec!["A1".to_owned()]);
    }

    #[test]
    fn rebind_to_same_id() {
        let reg = Registry::default();
        reg.get_or_insert("P1");
        assert!(reg.rebind("P1", "P1").is_some());
        assert_eq!(reg.ids(), vec!["P1".to_owned()]);
    }
}
