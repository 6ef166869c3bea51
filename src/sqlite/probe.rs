use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counts who holds the connection and how often it was handed out.
#[derive(Debug, Default)]
pub(crate) struct AccessProbe {
    active: AtomicUsize,
    max_active: AtomicUsize,
    acquisitions: AtomicU64,
}

impl AccessProbe {
    pub(crate) fn enter(self: &Arc<Self>) -> ProbeHold {
        let now = self.active.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_active.fetch_max(now, Ordering::AcqRel);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        ProbeHold(Arc::clone(self))
    }

    #[cfg(test)]
    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

/// Marks one holder of the connection until dropped.
#[derive(Debug)]
pub(crate) struct ProbeHold(Arc<AccessProbe>);

impl Drop for ProbeHold {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::AcqRel);
    }
}
