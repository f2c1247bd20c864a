//! Serialized access to a non-reentrant kernel with "latest request wins"
//! cancellation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::types::KernelError;

/// Token issued per conversion request. Becomes stale as soon as a newer
/// request is started on the same session.
#[derive(Debug, Clone)]
pub struct ConversionTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl ConversionTicket {
    /// Ticket that never goes stale, for one-shot callers without a session.
    pub fn detached() -> Self {
        Self {
            generation: 0,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::Acquire) == self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        !self.is_current()
    }
}

/// Single-owner kernel behind a mutex, plus the slot holding the most recent
/// published result.
pub struct KernelSession<K, T> {
    kernel: Mutex<K>,
    generation: Arc<AtomicU64>,
    latest: Mutex<Option<Arc<T>>>,
}

impl<K, T> KernelSession<K, T> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel: Mutex::new(kernel),
            generation: Arc::new(AtomicU64::new(0)),
            latest: Mutex::new(None),
        }
    }

    /// Start a request. Every earlier ticket becomes stale.
    pub fn begin(&self) -> ConversionTicket {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(generation, "conversion requested");
        ConversionTicket {
            generation,
            latest: Arc::clone(&self.generation),
        }
    }

    /// Exclusive kernel access for the duration of the guard.
    pub fn lock(&self) -> Result<MutexGuard<'_, K>, KernelError> {
        self.kernel.lock().map_err(|_| KernelError::KernelUnavailable {
            reason: "kernel poisoned by a panicked conversion".to_string(),
        })
    }

    /// Run `f` with exclusive kernel access.
    pub fn with_kernel<R>(&self, f: impl FnOnce(&mut K) -> R) -> Result<R, KernelError> {
        let mut kernel = self.lock()?;
        Ok(f(&mut kernel))
    }

    /// Store `result` as the latest one if `ticket` is still current.
    /// Returns `None` when the result is stale and was discarded.
    pub fn publish(&self, ticket: &ConversionTicket, result: T) -> Option<Arc<T>> {
        let mut slot = self.latest.lock().ok()?;
        if !ticket.is_current() {
            debug!(generation = ticket.generation, "stale result discarded");
            return None;
        }
        let result = Arc::new(result);
        *slot = Some(Arc::clone(&result));
        Some(result)
    }

    pub fn latest(&self) -> Option<Arc<T>> {
        self.latest.lock().ok().and_then(|slot| slot.clone())
    }

    pub fn into_kernel(self) -> Result<K, KernelError> {
        self.kernel
            .into_inner()
            .map_err(|_| KernelError::KernelUnavailable {
                reason: "kernel poisoned by a panicked conversion".to_string(),
            })
    }
}
