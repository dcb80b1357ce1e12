use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{Receiver, Sender};
use crossbeam::sync::WaitGroup;
use log::{debug, error};

use crate::job::{Job, JobResult};

type Task<T> = Box<dyn FnOnce() -> JobResult<T> + Send + 'static>;

/// A queued job, paired with the reply channel of a `queue_and_wait` caller.
pub(crate) struct Envelope<T> {
    task: Task<T>,
    reply: Option<Sender<JobResult<T>>>,
}

impl<T: Send + 'static> Envelope<T> {
    pub(crate) fn new<J>(job: J, reply: Option<Sender<JobResult<T>>>) -> Self
    where
        J: Job<Output = T>,
    {
        Envelope {
            task: Box::new(move || job.execute()),
            reply,
        }
    }
}

/// Counts a worker as live for as long as it exists.
///
/// The live counter is decremented before the wait group is released, so a
/// drained pool always reports zero live workers.
pub(crate) struct LiveGuard {
    live: Arc<AtomicUsize>,
    _wg: WaitGroup,
}

impl LiveGuard {
    pub(crate) fn new(live: Arc<AtomicUsize>, wg: WaitGroup) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        LiveGuard { live, _wg: wg }
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Everything one worker thread owns.
pub(crate) struct Worker<T> {
    pub(crate) id: usize,
    pub(crate) rx: Receiver<Envelope<T>>,
    pub(crate) results: Option<Sender<JobResult<T>>>,
    pub(crate) guard: LiveGuard,
}

/// Spawns a worker thread that pulls envelopes until the queue is closed
/// and empty.
pub(crate) fn spawn<T: Send + 'static>(worker: Worker<T>) -> io::Result<()> {
    thread::Builder::new()
        .name(format!("simpool-worker-{}", worker.id))
        .spawn(move || worker.run())?;
    Ok(())
}

impl<T: Send + 'static> Worker<T> {
    fn run(self) {
        let Worker {
            id,
            rx,
            results,
            guard,
        } = self;
        debug!("Worker {id} started");

        for envelope in rx.iter() {
            let Envelope { task, reply } = envelope;
            let result = execute(id, task);

            match reply {
                Some(reply) => {
                    // The caller may have given up on the reply; nothing to do then.
                    let _ = reply.send(result);
                }
                None => {
                    if let Some(results) = &results {
                        // Blocks while the stream is full. The pool owns a
                        // receiver for its whole life, so this never fails.
                        let _ = results.send(result);
                    }
                }
            }
        }

        debug!("Worker {id}: queue closed, shutting down");
        // Release the result stream before reporting this worker as exited.
        drop(results);
        drop(guard);
    }
}

/// Runs one task, turning a panic into a failed result so the worker loop
/// continues.
fn execute<T>(id: usize, task: Task<T>) -> JobResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(result) => result,
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            error!("Worker {id} job panicked: {msg}");
            JobResult::err(format!("job panicked: {msg}"))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
