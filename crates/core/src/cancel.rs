//! Process-local cancellation registry.
//!
//! Maps a distillation id to a cancellation flag, a wakeup signal and an
//! abort handle for the in-flight external call. Entries are owned by the
//! orchestrator invocation that registered them and removed at the end of
//! that invocation, whatever the outcome. A stop request arriving before the
//! executor has registered leaves behind a flagged entry, so the executor
//! observes the cancellation the moment it registers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio::task::AbortHandle;

/// One registry entry: cancellation flag plus abort plumbing.
pub struct CancelEntry {
    flag: AtomicBool,
    notify: Notify,
    abort: Mutex<Option<AbortHandle>>,
}

impl CancelEntry {
    fn new(flagged: bool) -> Self {
        Self {
            flag: AtomicBool::new(flagged),
            notify: Notify::new(),
            abort: Mutex::new(None),
        }
    }

    /// Returns true if a stop has been requested.
    pub fn is_flagged(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Mark the entry cancelled: set the flag, wake any waiter, and abort the
    /// in-flight call if one is registered.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        if let Some(handle) = self.abort.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Wait until the entry is cancelled. Returns immediately if the flag is
    /// already set.
    pub async fn cancelled(&self) {
        if self.is_flagged() {
            return;
        }
        let notified = self.notify.notified();
        // The flag may have been set between the check and registration.
        if self.is_flagged() {
            return;
        }
        notified.await;
    }

    /// Attach the abort handle of the currently executing external call.
    /// If the entry is already flagged, the call is aborted right away.
    pub fn set_abort_handle(&self, handle: AbortHandle) {
        if self.is_flagged() {
            handle.abort();
            return;
        }
        *self.abort.lock().unwrap() = Some(handle);
    }

    /// Detach the abort handle once the call has finished.
    pub fn clear_abort_handle(&self) {
        self.abort.lock().unwrap().take();
    }
}

/// Owned table of cancellation entries, keyed by distillation id.
///
/// Not a global: an `Arc<CancellationRegistry>` is threaded through to the
/// orchestrator and the stop path explicitly.
#[derive(Default)]
pub struct CancellationRegistry {
    entries: Mutex<HashMap<String, Arc<CancelEntry>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor for the given id and return its entry.
    ///
    /// If a flagged-but-empty entry already exists (stop requested before the
    /// slot was granted), that entry is returned so the caller sees the flag.
    pub fn register(&self, id: &str) -> Arc<CancelEntry> {
        let mut entries = self.entries.lock().unwrap();
        Arc::clone(
            entries
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(CancelEntry::new(false))),
        )
    }

    /// Flag the entry for `id`, waking the executor and aborting its
    /// in-flight call. If no entry exists yet, a flagged one is created for
    /// the executor to find on registration. Returns true if an executor was
    /// already registered.
    pub fn request_stop(&self, id: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(id) {
            Some(entry) => {
                entry.cancel();
                true
            }
            None => {
                entries.insert(id.to_string(), Arc::new(CancelEntry::new(true)));
                false
            }
        }
    }

    /// Remove the entry for `id`. Called by the owning executor at the end of
    /// its invocation, on success, failure or cancellation.
    pub fn unregister(&self, id: &str) {
        self.entries.lock().unwrap().remove(id);
    }

    /// Returns true if a stop has been requested for `id`.
    pub fn is_flagged(&self, id: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get(id)
            .map(|e| e.is_flagged())
            .unwrap_or(false)
    }

    /// Returns true if an entry exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().unwrap().contains_key(id)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns true if no entries are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}
