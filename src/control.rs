// src/control.rs

//! Deadline and cancellation for a single run.
//!
//! A [`RunControl`] is created once per `execute` call and borrowed by every
//! stage that waits on a subprocess (dependency install, worker). The same
//! deadline covers both stages: time spent installing is time the worker
//! does not get.
//!
//! Cancellation is driven by a [`CancelHandle`] held by the caller; the
//! matching [`CancelToken`] travels inside the control.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Furthest a deadline is ever placed in the future (about 30 years).
pub const MAX_DEADLINE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Why a supervised wait stopped before the process exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// The run's time budget elapsed.
    TimedOut(Duration),
    /// The caller cancelled the run.
    Cancelled,
}

/// Time budget and cancellation signal for one run.
#[derive(Debug, Clone)]
pub struct RunControl {
    budget: Option<(Duration, Instant)>,
    cancel: Option<CancelToken>,
}

impl RunControl {
    /// Bound the run to `timeout`, starting now.
    ///
    /// Deadlines past what the clock can represent are clamped to
    /// [`MAX_DEADLINE`] from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout.min(MAX_DEADLINE))
            .unwrap_or(now);
        Self {
            budget: Some((timeout, deadline)),
            cancel: None,
        }
    }

    /// No deadline. Only cancellation (if attached) can stop the run early.
    pub fn unbounded() -> Self {
        Self {
            budget: None,
            cancel: None,
        }
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The full budget this control was created with.
    pub fn timeout(&self) -> Option<Duration> {
        self.budget.map(|(timeout, _)| timeout)
    }

    /// Time left before the deadline, if there is one.
    pub fn remaining(&self) -> Option<Duration> {
        self.budget
            .map(|(_, deadline)| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Resolves once the deadline passes or the run is cancelled, whichever
    /// comes first. Never resolves for an unbounded, uncancellable control.
    pub async fn interrupted(&self) -> Interruption {
        let deadline = async {
            match self.budget {
                Some((timeout, deadline)) => {
                    tokio::time::sleep_until(deadline).await;
                    timeout
                }
                None => std::future::pending().await,
            }
        };

        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            // Prefer reporting an explicit cancel over a coincident timeout.
            biased;
            _ = cancelled => Interruption::Cancelled,
            timeout = deadline => Interruption::TimedOut(timeout),
        }
    }

    /// Interruption that has already happened, without waiting.
    pub fn check(&self) -> Option<Interruption> {
        if self.is_cancelled() {
            return Some(Interruption::Cancelled);
        }
        match (self.budget, self.remaining()) {
            (Some((timeout, _)), Some(left)) if left.is_zero() => {
                Some(Interruption::TimedOut(timeout))
            }
            _ => None,
        }
    }
}

/// Caller side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Run side of a cancellation pair. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

impl CancelHandle {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. If the handle is dropped
    /// without cancelling, this never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_fires_after_budget() {
        let control = RunControl::with_timeout(Duration::from_millis(20));
        let got = tokio::time::timeout(Duration::from_secs(2), control.interrupted())
            .await
            .expect("deadline should fire");
        assert_eq!(got, Interruption::TimedOut(Duration::from_millis(20)));
        assert_eq!(control.check(), Some(Interruption::TimedOut(Duration::from_millis(20))));
    }

    #[tokio::test]
    async fn cancel_fires_before_deadline() {
        let (handle, token) = cancel_pair();
        let control = RunControl::with_timeout(Duration::from_secs(60)).with_cancel(token);
        assert!(!control.is_cancelled());

        handle.cancel();
        let got = tokio::time::timeout(Duration::from_secs(2), control.interrupted())
            .await
            .expect("cancel should fire");
        assert_eq!(got, Interruption::Cancelled);
        assert_eq!(control.check(), Some(Interruption::Cancelled));
    }

    #[tokio::test]
    async fn huge_timeouts_are_clamped() {
        for timeout in [Duration::MAX, Duration::from_secs(u64::MAX)] {
            let control = RunControl::with_timeout(timeout);
            assert_eq!(control.timeout(), Some(timeout));
            assert!(control.remaining().unwrap() > Duration::from_secs(60 * 60 * 24 * 365));
            assert_eq!(control.check(), None);

            let res =
                tokio::time::timeout(Duration::from_millis(20), control.interrupted()).await;
            assert!(res.is_err());
        }
    }

    #[tokio::test]
    async fn dropped_handle_never_cancels() {
        let (handle, token) = cancel_pair();
        drop(handle);
        let control = RunControl::unbounded().with_cancel(token);
        let res = tokio::time::timeout(Duration::from_millis(50), control.interrupted()).await;
        assert!(res.is_err());
        assert_eq!(control.check(), None);
        assert_eq!(control.remaining(), None);
    }
}
