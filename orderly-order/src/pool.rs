//! Bounded worker pool for batch jobs.
//!
//! A pool moves through `Created -> Running -> Draining -> Stopped`. Workers
//! share one job queue and one result queue. Cancellation is cooperative:
//! a worker notices it before taking the next job or while handing over a
//! result, never in the middle of a job.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Created,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool is {0:?} and does not accept jobs")]
    Closed(PoolState),

    #[error("worker pool can only be started once")]
    AlreadyStarted,
}

pub struct WorkerPool<J, R> {
    workers: usize,
    state: PoolState,
    job_tx: Option<mpsc::Sender<J>>,
    job_rx: Arc<Mutex<mpsc::Receiver<J>>>,
    result_tx: Option<mpsc::Sender<R>>,
    result_rx: mpsc::Receiver<R>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl<J, R> WorkerPool<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    /// `capacity` bounds both queues; `submit` waits once the job queue is full.
    pub fn new(workers: usize, capacity: usize) -> Self {
        let (job_tx, job_rx) = mpsc::channel(capacity.max(1));
        let (result_tx, result_rx) = mpsc::channel(capacity.max(1));
        Self {
            workers: workers.max(1),
            state: PoolState::Created,
            job_tx: Some(job_tx),
            job_rx: Arc::new(Mutex::new(job_rx)),
            result_tx: Some(result_tx),
            result_rx,
            cancel: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Spawn the workers. Each applies `process` to jobs until the queue is
    /// closed or the pool is cancelled.
    pub fn start<F, Fut>(&mut self, process: F) -> Result<(), PoolError>
    where
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let results = match (self.state, self.result_tx.take()) {
            (PoolState::Created, Some(tx)) => tx,
            _ => return Err(PoolError::AlreadyStarted),
        };

        let process = Arc::new(process);
        for id in 0..self.workers {
            let jobs = self.job_rx.clone();
            let results = results.clone();
            let cancel = self.cancel.clone();
            let process = process.clone();
            self.handles
                .push(tokio::spawn(run_worker(id, jobs, results, cancel, process)));
        }
        // Workers hold the only senders, so the result queue closes once
        // they have all exited.
        drop(results);

        self.state = PoolState::Running;
        tracing::debug!(workers = self.workers, "Worker pool started");
        Ok(())
    }

    pub async fn submit(&self, job: J) -> Result<(), PoolError> {
        match (&self.job_tx, self.state) {
            (Some(tx), PoolState::Created | PoolState::Running) => {
                tx.send(job).await.map_err(|_| PoolError::Closed(self.state))
            }
            _ => Err(PoolError::Closed(self.state)),
        }
    }

    pub fn results(&mut self) -> &mut mpsc::Receiver<R> {
        &mut self.result_rx
    }

    /// Stop accepting jobs; queued jobs are still processed.
    pub fn close(&mut self) {
        self.job_tx = None;
        if self.state != PoolState::Stopped {
            self.state = PoolState::Draining;
        }
    }

    /// Signal cancellation without waiting for the workers.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel, close the job queue and wait for every worker to exit.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        self.close();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
            }
        }
        self.state = PoolState::Stopped;
        tracing::debug!("Worker pool stopped");
    }
}

async fn run_worker<J, R, F, Fut>(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<J>>>,
    results: mpsc::Sender<R>,
    cancel: CancellationToken,
    process: Arc<F>,
) where
    F: Fn(J) -> Fut,
    Fut: Future<Output = R>,
{
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = async { jobs.lock().await.recv().await } => job,
        };
        let Some(job) = job else { break };

        let result = process(job).await;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = results.send(result) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    tracing::trace!(worker = id, "Worker exited");
}

/// Run `jobs` on a fresh pool of `workers` and collect results until all
/// arrived or `timeout` elapsed.
///
/// On timeout the pool is cancelled and stopped in the background, so this
/// returns promptly even if a job is still running. Results that did not
/// arrive in time are omitted; results arrive in completion order.
pub async fn process_batch<J, R, F, Fut>(
    jobs: Vec<J>,
    workers: usize,
    timeout: Duration,
    process: F,
) -> Vec<R>
where
    J: Send + 'static,
    R: Send + 'static,
    F: Fn(J) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let expected = jobs.len();
    if expected == 0 {
        return Vec::new();
    }

    let deadline = Instant::now() + timeout;
    let mut pool = WorkerPool::new(workers.min(expected), expected);
    if let Err(e) = pool.start(process) {
        tracing::error!("Failed to start worker pool: {}", e);
        return Vec::new();
    }

    for job in jobs {
        if let Err(e) = pool.submit(job).await {
            tracing::error!("Failed to submit batch job: {}", e);
            break;
        }
    }
    pool.close();

    let mut results = Vec::with_capacity(expected);
    let sleep = tokio::time::sleep_until(deadline);
    tokio::pin!(sleep);

    while results.len() < expected {
        tokio::select! {
            _ = &mut sleep => {
                tracing::warn!(
                    collected = results.len(),
                    expected,
                    "Batch timed out before all results arrived"
                );
                break;
            }
            result = pool.results().recv() => match result {
                Some(result) => results.push(result),
                None => break,
            },
        }
    }

    if results.len() < expected {
        pool.cancel();
        tokio::spawn(async move { pool.stop().await });
    } else {
        pool.stop().await;
    }
    results
}
