use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

pub const DEFAULT_TEMP_ID_PREFIX: &str = "temp";

/// Issues placeholder identifiers for records that the remote has not yet
/// confirmed, and tracks which of them are still awaiting an answer.
///
/// An issued id is never handed out twice for the lifetime of the issuer.
#[derive(Debug)]
pub struct TempIdIssuer {
    prefix: String,
    ledger: Mutex<Ledger>,
}

#[derive(Debug, Default)]
struct Ledger {
    issued: HashSet<String>,
    in_flight: HashSet<String>,
}

impl Default for TempIdIssuer {
    fn default() -> Self {
        Self::new(DEFAULT_TEMP_ID_PREFIX)
    }
}

impl TempIdIssuer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Draws ids until one is neither previously issued nor `is_taken`, and
    /// marks it in flight.
    pub fn issue(&self, is_taken: impl Fn(&str) -> bool) -> String {
        let mut ledger = self.ledger();
        loop {
            let candidate = format!("{}-{}", self.prefix, Uuid::new_v4().simple());
            if !ledger.issued.contains(&candidate) && !is_taken(&candidate) {
                ledger.issued.insert(candidate.clone());
                ledger.in_flight.insert(candidate.clone());
                return candidate;
            }
        }
    }

    /// Marks `id` as answered by the remote, whether confirmed or rejected.
    pub fn settle(&self, id: &str) -> bool {
        self.ledger().in_flight.remove(id)
    }

    pub fn was_issued(&self, id: &str) -> bool {
        self.ledger().issued.contains(id)
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.ledger().in_flight.contains(id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.ledger().in_flight.len()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
