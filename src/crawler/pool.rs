//! Fixed-size worker pool
//!
//! A pool owns `size` long-lived tokio tasks that drain one shared queue.
//! At most `size` jobs run at a time; the rest wait in the queue.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

type SharedReceiver<J> = Arc<tokio::sync::Mutex<UnboundedReceiver<J>>>;

/// A bounded pool of workers running one kind of job
///
/// Shutdown follows a drain policy: new submissions are refused, while jobs
/// already queued or running are allowed to finish. Workers exit once the
/// queue is empty.
pub struct WorkerPool<J> {
    name: &'static str,
    sender: Mutex<Option<UnboundedSender<J>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<J: Send + 'static> WorkerPool<J> {
    /// Spawns `size` workers that run `handler` on each submitted job
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<H, Fut>(name: &'static str, size: usize, handler: H) -> Self
    where
        H: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver: SharedReceiver<J> = Arc::new(tokio::sync::Mutex::new(receiver));
        let handler = Arc::new(handler);

        let workers = (0..size)
            .map(|id| {
                tokio::spawn(worker_loop(
                    name,
                    id,
                    Arc::clone(&receiver),
                    Arc::clone(&handler),
                ))
            })
            .collect();

        tracing::debug!("Started {} pool with {} workers", name, size);

        Self {
            name,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Queues a job
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The job will run
    /// * `Err(job)` - The pool is shut down; the job is handed back
    pub fn submit(&self, job: J) -> Result<(), J> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(tx) => tx.send(job).map_err(|e| e.0),
            None => Err(job),
        }
    }

    /// Stops accepting jobs; queued and running jobs still complete
    ///
    /// Returns true if this call performed the shutdown.
    pub fn shutdown(&self) -> bool {
        let closed = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if closed {
            tracing::debug!("Shut down {} pool", self.name);
        }
        closed
    }

    /// Returns true once `shutdown` has been called
    pub fn is_shut_down(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Waits for all workers to exit
    ///
    /// Only returns after `shutdown` and once the queue has drained.
    pub async fn join(&self) {
        let workers =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for worker in workers {
            let _ = worker.await;
        }
    }
}

async fn worker_loop<J, H, Fut>(
    name: &'static str,
    id: usize,
    receiver: SharedReceiver<J>,
    handler: Arc<H>,
) where
    J: Send + 'static,
    H: Fn(J) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        // Each job runs in its own task so a panic only loses that job
        if let Err(e) = tokio::spawn((*handler)(job)).await {
            if e.is_panic() {
                tracing::error!("{} worker {} job panicked: {}", name, id, e);
            }
        }
    }

    tracing::trace!("{} worker {} stopped", name, id);
}
