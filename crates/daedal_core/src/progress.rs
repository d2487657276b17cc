use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Progress/cancellation channel consumed by heavy Tree Functions and by
/// schema-conversion routines. Implementations must be safe to poll from a
/// worker thread while the document thread owns the other end.
pub trait ProgressChannel: Send + Sync {
    fn report_progress(&self, percent: u8);
    fn is_cancelled(&self) -> bool;
}

/// Channel that ignores progress and never cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressChannel for NullProgress {
    fn report_progress(&self, _percent: u8) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Shared cancellation flag with a last-reported-progress cell. The document
/// thread keeps one clone to request cancellation; the worker polls its own.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    progress: AtomicU8,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn last_progress(&self) -> u8 {
        self.inner.progress.load(Ordering::SeqCst)
    }
}

impl ProgressChannel for CancelFlag {
    fn report_progress(&self, percent: u8) {
        self.inner.progress.store(percent.min(100), Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_is_visible_through_clones() {
        let flag = CancelFlag::new();
        let worker_view = flag.clone();
        assert!(!worker_view.is_cancelled());
        flag.cancel();
        assert!(worker_view.is_cancelled());
    }

    #[test]
    fn progress_is_clamped_to_100() {
        let flag = CancelFlag::new();
        flag.report_progress(250);
        assert_eq!(flag.last_progress(), 100);
    }
}
