#![deny(missing_docs)]

//! A simple bounded worker pool.
//!
//! A [`Pool`] runs a fixed number of worker threads that consume jobs from a
//! bounded queue. Jobs can be queued fire-and-forget with [`Pool::queue`] or
//! submitted with [`Pool::queue_and_wait`], which blocks until the job's
//! [`JobResult`] is available. [`Pool::close`] drains the queue and stops the
//! workers; [`Pool::wait`] drains it and starts over with fresh workers.
//!
//! The crate also ships the small collaborators that drive a pool: a TCP
//! echo server that runs every request as a job, and helpers that copy
//! `sled` trees row by row.

mod client;
mod common;
mod error;
mod job;
mod pool;
mod server;
/// Row-copy helpers for `sled` trees built on the pool.
pub mod transfer;

pub use client::EchoClient;
pub use common::{Request, Response};
pub use error::{PoolError, Result};
pub use job::{Job, JobError, JobResult};
pub use pool::{Pool, PoolConfig, PoolStatus};
pub use server::{EchoHandler, EchoServer};
