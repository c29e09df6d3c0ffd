use log::debug;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use repotree_common::TreeError;
use repotree_domain::{BuildStatus, ProgressState};

pub type ProgressCb = Box<dyn Fn(&ProgressState) + Send + Sync>;

/// 构建进度
///
/// Owned by exactly one build. Holds the build's cancellation token, so cancelling through the
/// reporter (or a clone of its token) aborts that build.
///
/// Single use: a cancelled token stays cancelled, and any later build handed this reporter is
/// rejected with [`TreeError::Cancelled`] before it issues a call. Create a new reporter per build.
pub struct ProgressReporter {
    state: watch::Sender<ProgressState>,
    cancel: CancellationToken,
    observer: Option<ProgressCb>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl ProgressReporter {
    pub fn new(cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(ProgressState::default());
        Self {
            state,
            cancel,
            observer: None,
        }
    }

    /// Calls `cb` with the new state after every change.
    pub fn with_observer(mut self, cb: ProgressCb) -> Self {
        self.observer = Some(cb);
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn snapshot(&self) -> ProgressState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.state.subscribe()
    }

    fn update(&self, f: impl FnOnce(&mut ProgressState)) {
        self.state.send_modify(f);
        if let Some(cb) = &self.observer {
            cb(&*self.state.borrow());
        }
    }

    pub(crate) fn begin(&self) {
        self.update(|s| *s = ProgressState {
            status: BuildStatus::Processing,
            ..ProgressState::default()
        });
    }

    /// Sets the estimate; never below what is already processed.
    pub(crate) fn set_total(&self, total: u64) {
        self.update(|s| s.total = total.max(s.processed));
    }

    pub(crate) fn add_to_total(&self, n: u64) {
        if n > 0 {
            self.update(|s| s.total += n);
        }
    }

    pub(crate) fn file_done(&self) {
        self.update(|s| {
            s.processed += 1;
            // the source grew since it was counted
            if s.processed > s.total {
                s.total = s.processed;
            }
        });
    }

    pub(crate) fn note_retry(&self) {
        self.update(|s| s.retries += 1);
    }

    pub(crate) fn finish<T>(&self, result: &Result<T, TreeError>) {
        let (status, error) = match result {
            Ok(_) => (BuildStatus::Complete, None),
            Err(TreeError::Cancelled) => (BuildStatus::Cancelled, None),
            Err(e @ TreeError::Timeout(_)) => (BuildStatus::Timeout, Some(e.to_string())),
            Err(e) => (BuildStatus::Error, Some(e.to_string())),
        };
        debug_assert!(status.is_terminal());
        debug!("build finished with status {:?}", status);
        self.update(|s| {
            s.status = status;
            s.error = error;
        });
    }
}
