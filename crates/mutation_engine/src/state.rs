use std::collections::HashMap;

use crate::error::MutationError;

/// In-flight flags and the most recent failure of a [`crate::MutationController`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationState {
    pub create_busy: bool,
    pub update_busy: HashMap<String, bool>,
    pub delete_busy: HashMap<String, bool>,
    pub last_error: Option<MutationError>,
}

impl MutationState {
    pub fn is_updating(&self, id: &str) -> bool {
        self.update_busy.get(id).copied().unwrap_or(false)
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.delete_busy.get(id).copied().unwrap_or(false)
    }

    /// True while any create, update or delete is awaiting the remote.
    pub fn is_busy(&self) -> bool {
        self.create_busy
            || self.update_busy.values().any(|busy| *busy)
            || self.delete_busy.values().any(|busy| *busy)
    }

    pub fn last_error_message(&self) -> Option<String> {
        self.last_error.as_ref().map(ToString::to_string)
    }
}
