//! Sync state and progress observation.
//!
//! One [`SyncContext`] owns the training state, the cancellation token, and
//! the running error list for a single sync invocation. The UI never reads a
//! global: it observes state transitions through [`SyncObserver`], and
//! requests cancellation through the context. Transitions are strictly
//! linear per sync (`idle → fetching_data → loading* → idle`), with
//! `cancel_requested` settable from `loading` and honored cooperatively.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

/// Process-visible state of the active sync, driving UI feedback.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingState {
    Idle,
    FetchingData,
    Loading {
        progress: u64,
        total: u64,
        filename: String,
    },
    CancelRequested,
    Complete { errors: Vec<String> },
}

/// Observes one sync from the outside. Implementations must be cheap:
/// callbacks fire from inside the concurrency window.
pub trait SyncObserver: Send + Sync {
    /// The training state changed. Called after every transition.
    fn state_changed(&self, _state: &TrainingState) {}

    /// One candidate item finished processing (successfully or not).
    /// Fired exactly once per item that reached content resolution.
    fn file_processed(&self) {}

    /// A source-level failure was recorded.
    fn error(&self, _message: &str) {}
}

/// No-op observer for callers that only want the final report.
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// Human-friendly progress on stderr: "loading 12 / 40  README.md".
/// Progress goes to stderr so stdout remains parseable for scripts.
pub struct StderrObserver;

impl SyncObserver for StderrObserver {
    fn state_changed(&self, state: &TrainingState) {
        let line = match state {
            TrainingState::Idle => return,
            TrainingState::FetchingData => "fetching data...\n".to_string(),
            TrainingState::Loading {
                progress,
                total,
                filename,
            } => format!("loading {} / {}  {}\n", progress, total, filename),
            TrainingState::CancelRequested => "cancel requested\n".to_string(),
            TrainingState::Complete { errors } => {
                format!("complete ({} errors)\n", errors.len())
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }

    fn error(&self, message: &str) {
        let _ = writeln!(std::io::stderr().lock(), "error: {}", message);
    }
}

/// Per-sync context passed down the pipeline. Single writer at a time:
/// exactly one active sync owns this value.
pub struct SyncContext {
    observer: Arc<dyn SyncObserver>,
    cancel: CancellationToken,
    state: Mutex<TrainingState>,
    errors: Mutex<Vec<String>>,
}

impl SyncContext {
    pub fn new(observer: Arc<dyn SyncObserver>) -> Self {
        Self {
            observer,
            cancel: CancellationToken::new(),
            state: Mutex::new(TrainingState::Idle),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Transition `idle → fetching_data`. Returns false if a sync is already
    /// underway, so two syncs never run against the same project.
    pub fn try_begin(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if !matches!(*state, TrainingState::Idle) {
            return false;
        }
        *state = TrainingState::FetchingData;
        let snapshot = state.clone();
        drop(state);
        self.observer.state_changed(&snapshot);
        true
    }

    /// Move to the given state and notify the observer.
    pub fn set_state(&self, next: TrainingState) {
        let mut state = self.state.lock().unwrap();
        *state = next;
        let snapshot = state.clone();
        drop(state);
        self.observer.state_changed(&snapshot);
    }

    /// Report per-file loading progress before any expensive work, so UI
    /// feedback stays monotonic even when later steps are skipped. Declined
    /// once cancellation is requested: an item racing past its dispatch
    /// check must not move the state back to `loading`.
    pub fn loading(&self, progress: u64, total: u64, filename: &str) {
        let mut state = self.state.lock().unwrap();
        if matches!(*state, TrainingState::CancelRequested) {
            return;
        }
        *state = TrainingState::Loading {
            progress,
            total,
            filename: filename.to_string(),
        };
        let snapshot = state.clone();
        drop(state);
        self.observer.state_changed(&snapshot);
    }

    /// Request cooperative cancellation. Items not yet dispatched return
    /// without side effects; in-flight items run to completion.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
        self.set_state(TrainingState::CancelRequested);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Append to the running error list and notify the observer.
    pub fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.errors.lock().unwrap().push(message.clone());
        self.observer.error(&message);
    }

    pub fn file_processed(&self) {
        self.observer.file_processed();
    }

    pub fn state(&self) -> TrainingState {
        self.state.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    /// Terminal transition: publish the aggregate error list, then return
    /// the state to idle for the next sync.
    pub fn complete(&self) {
        let errors = self.errors();
        self.set_state(TrainingState::Complete { errors });
        self.set_state(TrainingState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingObserver {
        transitions: AtomicUsize,
        errors: AtomicUsize,
    }

    impl SyncObserver for CountingObserver {
        fn state_changed(&self, _state: &TrainingState) {
            self.transitions.fetch_add(1, Ordering::SeqCst);
        }

        fn error(&self, _message: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn begin_is_exclusive() {
        let ctx = SyncContext::new(Arc::new(NoopObserver));
        assert!(ctx.try_begin());
        assert!(!ctx.try_begin(), "second sync must not start while active");
        ctx.complete();
        assert!(ctx.try_begin(), "idle again after completion");
    }

    #[test]
    fn complete_publishes_errors_then_idles() {
        let observer = Arc::new(CountingObserver::default());
        let ctx = SyncContext::new(observer.clone());
        ctx.try_begin();
        ctx.record_error("boom");
        ctx.complete();
        assert_eq!(ctx.state(), TrainingState::Idle);
        assert_eq!(ctx.errors(), vec!["boom".to_string()]);
        assert_eq!(observer.errors.load(Ordering::SeqCst), 1);
        // fetching_data + complete + idle
        assert_eq!(observer.transitions.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cancel_sets_flag_and_state() {
        let ctx = SyncContext::new(Arc::new(NoopObserver));
        ctx.try_begin();
        ctx.loading(1, 3, "a.md");
        ctx.request_cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.state(), TrainingState::CancelRequested);
    }

    #[test]
    fn loading_does_not_override_cancel() {
        let observer = Arc::new(CountingObserver::default());
        let ctx = SyncContext::new(observer.clone());
        ctx.try_begin();
        ctx.request_cancel();
        let transitions_before = observer.transitions.load(Ordering::SeqCst);

        // An in-flight item reporting progress after cancellation must not
        // move the state machine backwards.
        ctx.loading(2, 3, "b.md");

        assert_eq!(ctx.state(), TrainingState::CancelRequested);
        assert_eq!(observer.transitions.load(Ordering::SeqCst), transitions_before);
    }
}
