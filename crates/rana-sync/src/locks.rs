use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-schematisation exclusion for reconciliation runs
///
/// Two runs for the same schematisation id never overlap; runs for
/// different ids proceed independently. Clones share the same locks.
#[derive(Debug, Clone, Default)]
pub struct SchematisationLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>,
}

impl SchematisationLocks {
    /// Wait for exclusive access to `schematisation_id`
    pub async fn lock(&self, schematisation_id: i64) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Held or awaited slots have a clone outside the map
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(schematisation_id).or_default().clone()
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
