use crate::error::{IndexError, Result};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A FIFO queue drained by a single worker task: at most one job runs at a
/// time, in submission order. This is the only thing standing between two
/// concurrent indexing passes and a lost postings update, so every mutating
/// pass must go through it.
pub struct WriteQueue {
    tx: Option<mpsc::UnboundedSender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl WriteQueue {
    /// Spawn the worker task. Must be called within a tokio runtime.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
        });
        Self { tx: Some(tx), worker: Some(worker) }
    }

    /// Enqueue a unit of work and wait for it to run to completion. Jobs
    /// submitted earlier finish before this one starts. Dropping the returned
    /// future does not cancel the job once queued; the worker still runs it.
    pub async fn run<F, T>(&self, work: F) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let tx = self.tx.as_ref().ok_or(IndexError::QueueClosed)?;
        let (done_tx, done_rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let _ = done_tx.send(work.await);
        });
        tx.send(job).map_err(|_| IndexError::QueueClosed)?;
        done_rx.await.map_err(|_| IndexError::QueueClosed)
    }

    /// Stop accepting new work, finish everything already queued, and join
    /// the worker. Idempotent.
    pub async fn shutdown(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::new()
    }
}
