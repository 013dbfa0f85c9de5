//! Cancellation-aware channel operations shared by every stage.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// Result of waiting for the next task.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Next<T> {
    Task(T),
    /// Every sender is gone and the queue is drained.
    Closed,
    Cancelled,
}

/// Result of handing a task to the next stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    Sent,
    Cancelled,
    /// The receiving stage has gone away.
    Closed,
}

/// Receiver shared by every worker of one pool.
pub(crate) struct SharedReceiver<T> {
    inner: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedReceiver<T> {
    pub(crate) fn new(receiver: mpsc::Receiver<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Waits for the next task, racing against cancellation.
    pub(crate) async fn recv_or_cancel(&self, cancel: &CancellationToken) -> Next<T> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Next::Cancelled,
            item = async { self.inner.lock().await.recv().await } => match item {
                Some(task) => Next::Task(task),
                None => Next::Closed,
            },
        }
    }
}

/// Sends `item`, racing against cancellation.
pub(crate) async fn send_or_cancel<T>(
    sender: &mpsc::Sender<T>,
    item: T,
    cancel: &CancellationToken,
) -> Dispatch {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Dispatch::Cancelled,
        result = sender.send(item) => match result {
            Ok(()) => Dispatch::Sent,
            Err(_) => Dispatch::Closed,
        },
    }
}
