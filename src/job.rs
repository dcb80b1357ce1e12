/// Error produced by a failing job.
///
/// Any `std::error::Error + Send + Sync` converts into it with `?` or
/// `.into()`, and so does a `String` or `&str` message.
pub type JobError = Box<dyn std::error::Error + Send + Sync>;

/// The outcome of executing one job.
///
/// A fire-and-forget job returns [`JobResult::empty`]; a result-producing job
/// fills `value`, `error`, or both.
#[derive(Debug)]
pub struct JobResult<T> {
    /// The value produced by the job, if any.
    pub value: Option<T>,
    /// The failure reported by the job, if any.
    pub error: Option<JobError>,
}

impl<T> JobResult<T> {
    /// A successful result carrying `value`.
    pub fn ok(value: T) -> Self {
        JobResult {
            value: Some(value),
            error: None,
        }
    }

    /// A successful result with no value.
    pub fn empty() -> Self {
        JobResult {
            value: None,
            error: None,
        }
    }

    /// A failed result.
    pub fn err(error: impl Into<JobError>) -> Self {
        JobResult {
            value: None,
            error: Some(error.into()),
        }
    }

    /// Returns `true` if the job reported an error.
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// Converts into a `Result`, the error taking precedence over the value.
    pub fn into_result(self) -> Result<Option<T>, JobError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.value),
        }
    }
}

impl<T> Default for JobResult<T> {
    fn default() -> Self {
        JobResult::empty()
    }
}

impl<T, E: Into<JobError>> From<Result<T, E>> for JobResult<T> {
    fn from(res: Result<T, E>) -> Self {
        match res {
            Ok(value) => JobResult::ok(value),
            Err(e) => JobResult::err(e),
        }
    }
}

/// A unit of work executed by exactly one pool worker.
///
/// Every job yields a [`JobResult`]. Jobs whose outcome nobody reads return
/// [`JobResult::empty`] and keep any side effects to themselves.
///
/// Closures returning a `JobResult` are jobs too:
///
/// ```
/// use simpool::{Job, JobResult};
///
/// let job = || JobResult::ok(21 * 2);
/// assert_eq!(job.execute().value, Some(42));
/// ```
pub trait Job: Send + 'static {
    /// The value type carried by this job's result.
    type Output: Send + 'static;

    /// Runs the job to completion.
    fn execute(self) -> JobResult<Self::Output>;
}

impl<F, T> Job for F
where
    F: FnOnce() -> JobResult<T> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn execute(self) -> JobResult<T> {
        self()
    }
}
