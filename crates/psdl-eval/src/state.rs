//! Per-patient state persistence
//!
//! The engine itself is stateless per call. A [`StateStore`] carries the
//! state machine position between evaluations when the caller does not.

use crate::error::EvalResult;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Storage for the current state of each (scenario, patient) pair
pub trait StateStore: Send + Sync {
    /// Last saved state, if any
    fn load(&self, scenario: &str, patient_id: &str) -> EvalResult<Option<String>>;

    fn save(&self, scenario: &str, patient_id: &str, state: &str) -> EvalResult<()>;

    /// Forget the saved state
    fn clear(&self, scenario: &str, patient_id: &str) -> EvalResult<()>;
}

/// Thread-safe in-process state store
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    states: RwLock<HashMap<(String, String), String>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self, scenario: &str, patient_id: &str) -> EvalResult<Option<String>> {
        Ok(self
            .states
            .read()
            .get(&(scenario.to_string(), patient_id.to_string()))
            .cloned())
    }

    fn save(&self, scenario: &str, patient_id: &str, state: &str) -> EvalResult<()> {
        self.states
            .write()
            .insert((scenario.to_string(), patient_id.to_string()), state.to_string());
        Ok(())
    }

    fn clear(&self, scenario: &str, patient_id: &str) -> EvalResult<()> {
        self.states
            .write()
            .remove(&(scenario.to_string(), patient_id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_clear() {
        let store = InMemoryStateStore::new();
        assert_eq!(store.load("AKI", "p1").unwrap(), None);

        store.save("AKI", "p1", "stage1").unwrap();
        store.save("Sepsis", "p1", "screening").unwrap();
        assert_eq!(store.load("AKI", "p1").unwrap().as_deref(), Some("stage1"));
        assert_eq!(store.len(), 2);

        store.clear("AKI", "p1").unwrap();
        assert_eq!(store.load("AKI", "p1").unwrap(), None);
        assert_eq!(store.load("Sepsis", "p1").unwrap().as_deref(), Some("screening"));
    }
}
