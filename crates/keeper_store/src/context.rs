//! Per-request cancellation and deadline.
//!
//! Every store operation takes a `&Context`, checks it before doing any work
//! and runs backend round-trips under it. Clones share the same cancellation
//! state, so a caller can keep one clone and cancel the in-flight request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Arc<watch::Sender<bool>>,
}

impl Context {
    /// No deadline, not cancelled.
    pub fn background() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            deadline: None,
            cancel: Arc::new(cancel),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline_at(Instant::now() + timeout)
    }

    /// Same cancellation state, new deadline. An earlier existing deadline
    /// wins.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Fail fast if the request is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(StoreError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drive `fut` until it completes, the context is cancelled, or the
    /// deadline passes, whichever comes first. The future is dropped on
    /// cancellation or timeout.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, StoreError> {
        self.check()?;
        let mut cancelled = self.cancel.subscribe();
        let deadline = self.deadline;

        tokio::select! {
            out = fut => Ok(out),
            _ = cancelled.wait_for(|c| *c) => Err(StoreError::Cancelled),
            _ = sleep_until(deadline) => Err(StoreError::DeadlineExceeded),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
