//! Handles for in-flight HTTP calls.
//!
//! A [`CallHandle`] is a future the caller awaits on its own scheduler. The
//! request itself runs as a Tokio task, so the handle can be cancelled from
//! the caller's side without polling it.

use crate::error::{Result, SimpleGithubError};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tracing::debug;

/// An in-flight call owned by the caller.
///
/// Once [`cancel`](CallHandle::cancel) has returned, awaiting the handle
/// always yields [`SimpleGithubError::Cancelled`], even if the request had
/// already finished in the background. Dropping the handle aborts the call.
#[must_use = "a call is aborted when its handle is dropped"]
pub struct CallHandle<T> {
    task: JoinHandle<Result<T>>,
    cancelled: AtomicBool,
}

impl<T: Send + 'static> CallHandle<T> {
    /// Start `call` on the current Tokio runtime.
    pub(crate) fn spawn<F>(call: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        CallHandle {
            task: tokio::spawn(call),
            cancelled: AtomicBool::new(false),
        }
    }
}

impl<T> CallHandle<T> {
    /// Cancel the call. Calling this more than once is a no-op.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.task.abort();
            debug!("in-flight call cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the request has stopped running, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn is_running(&self) -> bool {
        !self.is_cancelled() && !self.is_finished()
    }
}

impl<T> Future for CallHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.is_cancelled() {
            return Poll::Ready(Err(SimpleGithubError::Cancelled));
        }

        match futures::ready!(Pin::new(&mut this.task).poll(cx)) {
            Ok(outcome) => Poll::Ready(outcome),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Poll::Ready(Err(SimpleGithubError::Cancelled)),
        }
    }
}

impl<T> Drop for CallHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
