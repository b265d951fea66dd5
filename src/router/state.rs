//! Application state
//!
//! Owned by the navigator and mutated only through it, one user action or
//! navigation at a time.

use crate::model::UserProfile;

/// Cross-navigation scratch space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    pending_patient_ids: Option<Vec<i64>>,
    patient_token: Option<String>,
}

impl Store {
    /// Stage patients for a later "add to study". Replaces any earlier
    /// staging.
    pub fn stage_patients(&mut self, ids: Vec<i64>) {
        self.pending_patient_ids = Some(ids);
    }

    pub fn pending_patients(&self) -> Option<&[i64]> {
        self.pending_patient_ids.as_deref()
    }

    pub fn clear_patients(&mut self) {
        self.pending_patient_ids = None;
    }

    /// Access token obtained for a patient from the debug view
    pub fn patient_token(&self) -> Option<&str> {
        self.patient_token.as_deref()
    }

    pub fn set_patient_token(&mut self, token: Option<String>) {
        self.patient_token = token;
    }
}

/// Everything the portal remembers between navigations
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub store: Store,
    /// Profile of the signed-in user, fetched once per session
    pub profile: Option<UserProfile>,
    /// Set while signing out; history events are ignored
    pub signing_out: bool,
}
