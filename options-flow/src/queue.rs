use crate::{alert::Alert, error::FlowError};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

#[derive(Debug, Default)]
struct QueueMetrics {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    completed: AtomicU64,
}

/// Construct a bounded FIFO queue of alerts awaiting outcome evaluation.
pub fn alert_queue(capacity: usize) -> (AlertQueue, AlertReceiver) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    let metrics = Arc::new(QueueMetrics::default());

    (
        AlertQueue {
            tx,
            capacity,
            metrics: metrics.clone(),
        },
        AlertReceiver { rx, metrics },
    )
}

/// Producer half. Pushing never waits on the consumer.
#[derive(Debug, Clone)]
pub struct AlertQueue {
    tx: mpsc::Sender<Alert>,
    capacity: usize,
    metrics: Arc<QueueMetrics>,
}

impl AlertQueue {
    /// Enqueue an alert, or drop it with a warning if the queue is full.
    pub fn push(&self, alert: Alert) -> Result<(), FlowError> {
        match self.tx.try_send(alert) {
            Ok(()) => {
                self.metrics.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(alert)) => {
                let dropped = self.metrics.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    contract = %alert.contract,
                    timeframe = %alert.timeframe,
                    capacity = self.capacity,
                    dropped,
                    "pending alert queue full, dropping alert"
                );
                Err(FlowError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Closed(_)) => Err(FlowError::QueueClosed),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Alerts accepted but not yet finished by the consumer, including one it may be holding.
    pub fn pending(&self) -> u64 {
        let enqueued = self.metrics.enqueued.load(Ordering::Acquire);
        let completed = self.metrics.completed.load(Ordering::Acquire);
        enqueued.saturating_sub(completed)
    }

    pub fn enqueued(&self) -> u64 {
        self.metrics.enqueued.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.metrics.dropped.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.metrics.completed.load(Ordering::Relaxed)
    }
}

/// Consumer half, owned by the outcome worker.
#[derive(Debug)]
pub struct AlertReceiver {
    rx: mpsc::Receiver<Alert>,
    metrics: Arc<QueueMetrics>,
}

impl AlertReceiver {
    /// Wait for the next alert. `None` once every [`AlertQueue`] is dropped and the queue is
    /// drained.
    pub async fn recv(&mut self) -> Option<Alert> {
        self.rx.recv().await
    }

    /// Mark a received alert as finished, whether evaluated or discarded.
    pub fn complete(&self) {
        self.metrics.completed.fetch_add(1, Ordering::Release);
    }
}
