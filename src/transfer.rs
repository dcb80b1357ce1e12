//! Copying the rows of one `sled` tree into another through a [`Pool`].
//!
//! [`copy_tree`] queues one fire-and-forget insert per row and closes the
//! pool to know that every insert has landed. [`copy_tree_batched`] does the
//! same into one shared `sled::Batch` applied after the pool closes, so the
//! destination sees all rows or none. [`transfer_tree`] uses
//! result-producing inserts collected from the pool's result stream, then
//! calls [`Pool::wait`] so the pool can be reused.

use std::mem;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crossbeam::channel::{self, Receiver};
use crossbeam::select;
use log::{debug, error, info};
use sled::{Batch, IVec, Tree};

use crate::job::{Job, JobResult};
use crate::pool::Pool;
use crate::{PoolError, Result};

/// Fills `tree` with `n` rows whose key and value are both the row index.
pub fn seed_tree(tree: &Tree, n: usize) -> Result<()> {
    for i in 0..n {
        let s = i.to_string();
        tree.insert(s.as_bytes(), s.as_bytes())?;
    }
    tree.flush()?;
    Ok(())
}

/// Inserts one row and keeps failures to itself.
struct InsertJob {
    dst: Tree,
    key: IVec,
    value: IVec,
}

impl Job for InsertJob {
    type Output = ();

    fn execute(self) -> JobResult<()> {
        if let Err(e) = self.dst.insert(self.key, self.value) {
            error!("Insert failed: {}", e);
        }
        JobResult::empty()
    }
}

/// Stages one row in a batch shared by every job of a copy.
struct BatchInsertJob {
    batch: Arc<Mutex<Batch>>,
    key: IVec,
    value: IVec,
}

impl Job for BatchInsertJob {
    type Output = ();

    fn execute(self) -> JobResult<()> {
        self.batch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.key, self.value);
        JobResult::empty()
    }
}

/// Inserts one row and reports the number of rows written.
struct TransferJob {
    dst: Tree,
    key: IVec,
    value: IVec,
}

impl Job for TransferJob {
    type Output = usize;

    fn execute(self) -> JobResult<usize> {
        self.dst.insert(self.key, self.value).map(|_| 1).into()
    }
}

/// Copies every row of `src` into `dst` and closes the pool.
///
/// Starts the pool if it is idle. Returns the number of rows queued once
/// all of them have been written.
pub fn copy_tree(pool: &Pool, src: &Tree, dst: &Tree) -> Result<usize> {
    pool.init()?;

    let mut queued = 0;
    for row in src.iter() {
        let (key, value) = row?;
        pool.queue(InsertJob {
            dst: dst.clone(),
            key,
            value,
        })?;
        queued += 1;
    }
    debug!("Queued {} inserts", queued);

    pool.close()?;
    dst.flush()?;
    info!("Copied {} rows", queued);
    Ok(queued)
}

/// Copies every row of `src` into `dst` as one atomic batch.
///
/// The jobs only stage their row. The batch is applied once the pool has
/// closed, so `dst` is untouched until every job has run. Starts the pool if
/// it is idle and returns the number of rows applied.
pub fn copy_tree_batched(pool: &Pool, src: &Tree, dst: &Tree) -> Result<usize> {
    pool.init()?;

    let batch = Arc::new(Mutex::new(Batch::default()));
    let mut queued = 0;
    for row in src.iter() {
        let (key, value) = row?;
        pool.queue(BatchInsertJob {
            batch: batch.clone(),
            key,
            value,
        })?;
        queued += 1;
    }
    debug!("Queued {} staged inserts", queued);

    pool.close()?;
    let batch = mem::take(&mut *batch.lock().unwrap_or_else(PoisonError::into_inner));
    dst.apply_batch(batch)?;
    dst.flush()?;
    info!("Copied {} rows in one batch", queued);
    Ok(queued)
}

/// Outcome of [`transfer_tree`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    /// Rows written to the destination.
    pub inserted: usize,
    /// Inserts that reported an error.
    pub failed: usize,
}

impl TransferReport {
    fn record(&mut self, res: JobResult<usize>) {
        match res.into_result() {
            Ok(n) => self.inserted += n.unwrap_or(0),
            Err(e) => {
                debug!("Transfer job failed: {}", e);
                self.failed += 1;
            }
        }
    }
}

/// Copies every row of `src` into `dst`, counting the outcome of each
/// insert from the pool's result stream.
///
/// The pool must have been built with a result stream. It is started if
/// idle and left running afterwards, ready for another batch.
pub fn transfer_tree(pool: &Pool<usize>, src: &Tree, dst: &Tree) -> Result<TransferReport> {
    let stream = pool
        .result_stream()
        .ok_or_else(|| PoolError::StringError("pool has no result stream".to_owned()))?;
    pool.init()?;

    let (done_tx, done_rx) = channel::bounded::<()>(0);

    thread::scope(|s| {
        let reader = s.spawn(move || collect(stream, done_rx));

        let queued = queue_transfers(pool, src, dst);
        let drained = pool.wait();
        // Every result of this batch is in the stream once `wait` returns.
        drop(done_tx);

        let report = reader
            .join()
            .map_err(|_| PoolError::StringError("result reader panicked".to_owned()))?;
        let queued = queued?;
        drained?;

        info!(
            "Transferred {} of {} rows ({} failed)",
            report.inserted, queued, report.failed
        );
        Ok(report)
    })
}

fn queue_transfers(pool: &Pool<usize>, src: &Tree, dst: &Tree) -> Result<usize> {
    let mut queued = 0;
    for row in src.iter() {
        let (key, value) = row?;
        pool.queue(TransferJob {
            dst: dst.clone(),
            key,
            value,
        })?;
        queued += 1;
    }
    Ok(queued)
}

fn collect(stream: Receiver<JobResult<usize>>, done: Receiver<()>) -> TransferReport {
    let mut report = TransferReport::default();
    loop {
        select! {
            recv(stream) -> res => match res {
                Ok(res) => report.record(res),
                Err(_) => break,
            },
            recv(done) -> _ => {
                for res in stream.try_iter() {
                    report.record(res);
                }
                break;
            }
        }
    }
    report
}
