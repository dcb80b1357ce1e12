use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::sync::WaitGroup;
use log::{debug, error};

use crate::job::{Job, JobResult};
use crate::{PoolError, Result};

mod worker;

use self::worker::{Envelope, LiveGuard, Worker};

/// Lifecycle state of a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    /// The queue exists but no workers are running yet.
    Idle,
    /// Workers are consuming the queue.
    Running,
    /// The queue is closed and workers are finishing the buffered jobs.
    Draining,
    /// The pool was shut down for good.
    Closed,
}

/// Construction options for a [`Pool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Number of jobs buffered while every worker is busy. Zero makes every
    /// submission a direct handoff to a free worker.
    pub max_queue_size: usize,
    /// Launch the workers during construction.
    pub auto_start: bool,
    /// Publish the results of `queue`d jobs on a shared stream.
    pub result_stream: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let workers = num_cpus::get();
        PoolConfig {
            workers,
            max_queue_size: workers * 20,
            auto_start: false,
            result_stream: false,
        }
    }
}

impl PoolConfig {
    /// Creates a config with the given sizes and everything else off.
    pub fn new(workers: usize, max_queue_size: usize) -> Self {
        PoolConfig {
            workers,
            max_queue_size,
            auto_start: false,
            result_stream: false,
        }
    }

    /// Sets whether workers start during construction.
    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Sets whether the pool owns a shared result stream.
    pub fn result_stream(mut self, result_stream: bool) -> Self {
        self.result_stream = result_stream;
        self
    }
}

struct State<T> {
    status: PoolStatus,
    tx: Option<Sender<Envelope<T>>>,
    rx: Receiver<Envelope<T>>,
    wg: Option<WaitGroup>,
    results_tx: Option<Sender<JobResult<T>>>,
}

/// A bounded pool of worker threads.
///
/// Jobs are buffered in a queue of `max_queue_size` envelopes and executed
/// by a fixed number of workers, each job exactly once. Producers block once
/// the queue is full.
///
/// The pool is shared by reference: every operation takes `&self`, so an
/// `Arc<Pool<T>>` can be handed to any number of producer threads.
///
/// Dropping the pool closes it, waiting for the queued jobs to finish.
pub struct Pool<T: Send + 'static = ()> {
    worker_count: usize,
    max_queue_size: usize,
    state: Mutex<State<T>>,
    live: Arc<AtomicUsize>,
    results_rx: Option<Receiver<JobResult<T>>>,
}

impl<T: Send + 'static> Pool<T> {
    /// Creates an idle pool. Call [`Pool::init`] before queueing jobs.
    pub fn new(worker_count: usize, max_queue_size: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(worker_count, max_queue_size))
    }

    /// Creates a pool whose workers are already running.
    pub fn start(worker_count: usize, max_queue_size: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(worker_count, max_queue_size).auto_start(true))
    }

    /// Creates an idle pool that publishes the result of every `queue`d job
    /// on [`Pool::result_stream`].
    pub fn with_result_stream(worker_count: usize, max_queue_size: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(worker_count, max_queue_size).result_stream(true))
    }

    /// Creates a pool from a [`PoolConfig`].
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(PoolError::InvalidWorkerCount);
        }

        let (tx, rx) = channel::bounded(config.max_queue_size);
        let (results_tx, results_rx) = if config.result_stream {
            let (tx, rx) = channel::bounded(config.max_queue_size);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let pool = Pool {
            worker_count: config.workers,
            max_queue_size: config.max_queue_size,
            state: Mutex::new(State {
                status: PoolStatus::Idle,
                tx: Some(tx),
                rx,
                wg: None,
                results_tx,
            }),
            live: Arc::new(AtomicUsize::new(0)),
            results_rx,
        };

        if config.auto_start {
            pool.init()?;
        }
        Ok(pool)
    }

    /// Number of workers the pool runs.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Capacity of the job queue.
    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    /// Current lifecycle state.
    pub fn status(&self) -> PoolStatus {
        self.state().status
    }

    /// Number of worker threads currently alive.
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Number of jobs buffered and not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.state().rx.len()
    }

    /// Returns the shared result stream, if the pool was built with one.
    ///
    /// Every job submitted with [`Pool::queue`] pushes its result here. The
    /// stream is bounded to `max_queue_size`: once it is full the workers
    /// block until somebody reads, so a reader must run concurrently with
    /// submission or the pool stops making progress. Iteration ends after
    /// [`Pool::close`] has returned.
    pub fn result_stream(&self) -> Option<Receiver<JobResult<T>>> {
        self.results_rx.clone()
    }

    /// Launches the workers.
    ///
    /// Calling it on a running pool does nothing.
    pub fn init(&self) -> Result<()> {
        let mut state = self.state();
        match state.status {
            PoolStatus::Idle => self.launch(&mut state),
            PoolStatus::Running => Ok(()),
            PoolStatus::Draining => Err(PoolError::Draining),
            PoolStatus::Closed => Err(PoolError::Closed),
        }
    }

    /// Queues a job without waiting for it to run.
    ///
    /// Blocks while the queue is full. The job's result goes to the shared
    /// result stream if there is one and is dropped otherwise.
    pub fn queue<J>(&self, job: J) -> Result<()>
    where
        J: Job<Output = T>,
    {
        self.submit(Envelope::new(job, None))
    }

    /// Queues a job and blocks until a worker has executed it, returning
    /// its result.
    ///
    /// The result is delivered only to this caller, never to the shared
    /// result stream.
    pub fn queue_and_wait<J>(&self, job: J) -> Result<JobResult<T>>
    where
        J: Job<Output = T>,
    {
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.submit(Envelope::new(job, Some(reply_tx)))?;
        reply_rx.recv().map_err(|_| PoolError::Disconnected)
    }

    /// Shuts the pool down for good.
    ///
    /// Closes the queue, then blocks until the workers have executed every
    /// buffered job and exited. The shared result stream is closed last.
    /// Closing a closed pool does nothing.
    pub fn close(&self) -> Result<()> {
        match self.drain(true) {
            Ok(()) => {}
            Err(PoolError::Closed) => return Ok(()),
            Err(e) => return Err(e),
        }

        let mut state = self.state();
        state.results_tx.take();
        state.status = PoolStatus::Closed;
        debug!("Pool closed");
        Ok(())
    }

    /// Blocks until every queued job has run, then starts a fresh queue and
    /// a fresh set of workers so the pool can take another batch.
    pub fn wait(&self) -> Result<()> {
        self.drain(false)?;

        let mut state = self.state();
        let (tx, rx) = channel::bounded(self.max_queue_size);
        state.tx = Some(tx);
        state.rx = rx;
        state.status = PoolStatus::Idle;
        self.launch(&mut state)
    }

    fn submit(&self, envelope: Envelope<T>) -> Result<()> {
        let tx = {
            let state = self.state();
            match (state.status, &state.tx) {
                (PoolStatus::Running, Some(tx)) => tx.clone(),
                (PoolStatus::Idle, _) => return Err(PoolError::NotStarted),
                (PoolStatus::Draining, _) => return Err(PoolError::Draining),
                _ => return Err(PoolError::Closed),
            }
        };
        // Blocking happens outside the lock so `close` can proceed meanwhile.
        tx.send(envelope).map_err(|_| PoolError::Closed)
    }

    /// Closes the current queue and waits for its workers to exit.
    fn drain(&self, closing: bool) -> Result<()> {
        let (tx, wg) = {
            let mut state = self.state();
            match state.status {
                PoolStatus::Idle | PoolStatus::Running => {}
                PoolStatus::Draining => return Err(PoolError::Draining),
                PoolStatus::Closed => return Err(PoolError::Closed),
            }
            state.status = PoolStatus::Draining;
            (state.tx.take(), state.wg.take())
        };

        debug!(
            "Draining pool ({})",
            if closing { "close" } else { "wait" }
        );
        drop(tx);
        if let Some(wg) = wg {
            wg.wait();
        }
        Ok(())
    }

    fn launch(&self, state: &mut State<T>) -> Result<()> {
        let wg = WaitGroup::new();

        for id in 0..self.worker_count {
            let worker = Worker {
                id,
                rx: state.rx.clone(),
                results: state.results_tx.clone(),
                guard: LiveGuard::new(self.live.clone(), wg.clone()),
            };
            if let Err(e) = worker::spawn(worker) {
                error!("Failed to spawn worker {id}: {e}");
                // Stop the workers that did start by swapping in a fresh queue.
                let (tx, rx) = channel::bounded(self.max_queue_size);
                drop(state.tx.replace(tx));
                state.rx = rx;
                wg.wait();
                return Err(e.into());
            }
        }

        state.wg = Some(wg);
        state.status = PoolStatus::Running;
        debug!("Pool started with {} workers", self.worker_count);
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send + 'static> Drop for Pool<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Failed to close pool: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_rejected() {
        assert!(matches!(
            Pool::<()>::new(0, 4),
            Err(PoolError::InvalidWorkerCount)
        ));
    }

    #[test]
    fn lifecycle_transitions() {
        let pool: Pool<u32> = Pool::new(2, 2).unwrap();
        assert_eq!(pool.status(), PoolStatus::Idle);
        assert_eq!(pool.live_workers(), 0);

        pool.init().unwrap();
        pool.init().unwrap();
        assert_eq!(pool.status(), PoolStatus::Running);
        assert_eq!(pool.live_workers(), 2);

        pool.wait().unwrap();
        assert_eq!(pool.status(), PoolStatus::Running);
        assert_eq!(pool.live_workers(), 2);

        pool.close().unwrap();
        assert_eq!(pool.status(), PoolStatus::Closed);
        assert_eq!(pool.live_workers(), 0);

        pool.close().unwrap();
        assert!(matches!(pool.init(), Err(PoolError::Closed)));
        assert!(matches!(pool.wait(), Err(PoolError::Closed)));
    }

    #[test]
    fn submissions_rejected_outside_running() {
        let pool: Pool<u32> = Pool::new(1, 0).unwrap();
        assert!(matches!(
            pool.queue(|| JobResult::ok(1)),
            Err(PoolError::NotStarted)
        ));
        assert!(matches!(
            pool.queue_and_wait(|| JobResult::ok(1)),
            Err(PoolError::NotStarted)
        ));

        pool.close().unwrap();
        assert!(matches!(
            pool.queue(|| JobResult::ok(1)),
            Err(PoolError::Closed)
        ));
    }

    #[test]
    fn default_config_uses_cpus() {
        let config = PoolConfig::default();
        assert_eq!(config.workers, num_cpus::get());
        assert_eq!(config.max_queue_size, config.workers * 20);
        assert!(!config.auto_start);
    }
}
