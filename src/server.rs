use std::io::{BufWriter, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info};
use serde_json::Deserializer;

use crate::common::{Request, Response};
use crate::job::{Job, JobResult};
use crate::pool::Pool;
use crate::Result;

/// Turns a request body into the result of its job.
pub type EchoHandler = Arc<dyn Fn(String) -> JobResult<String> + Send + Sync>;

/// Runs the server's handler on one request body.
struct EchoJob {
    body: String,
    handler: EchoHandler,
}

impl Job for EchoJob {
    type Output = String;

    fn execute(self) -> JobResult<String> {
        debug!("Executing echo job ({} bytes)", self.body.len());
        (self.handler)(self.body)
    }
}

/// A server that runs every request as a job on a shared pool.
///
/// The jobs are bounded by the pool: at most `worker_count` of them execute
/// at once and the rest wait in the queue. Connections are not bounded.
/// Every accepted connection gets its own thread, which spends most of its
/// time blocked in `queue_and_wait`, so the thread count grows with the
/// number of open connections.
#[derive(Clone)]
pub struct EchoServer {
    pool: Arc<Pool<String>>,
    handler: EchoHandler,
}

impl EchoServer {
    /// Creates an `EchoServer` on a running pool. Every job sleeps for
    /// `delay`, then hands the body back.
    pub fn new(pool: Arc<Pool<String>>, delay: Duration) -> Self {
        Self::with_handler(
            pool,
            Arc::new(move |body: String| {
                thread::sleep(delay);
                JobResult::ok(body)
            }),
        )
    }

    /// Creates an `EchoServer` whose jobs run `handler` on each body.
    pub fn with_handler(pool: Arc<Pool<String>>, handler: EchoHandler) -> Self {
        Self { pool, handler }
    }

    /// Runs the server, listening for connections on the given address.
    pub fn run(&self, addr: impl ToSocketAddrs) -> Result<()> {
        self.serve(TcpListener::bind(addr)?)
    }

    /// Runs the server on an already bound listener.
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("Serving on {}", listener.local_addr()?);

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let server = self.clone();
                    let spawned = thread::Builder::new()
                        .name("simpool-conn".to_owned())
                        .spawn(move || {
                            if let Err(e) = server.handle_connection(stream) {
                                error!("Error handling connection: {}", e);
                            }
                        });
                    if let Err(e) = spawned {
                        error!("Failed to spawn connection thread: {}", e);
                    }
                }
                Err(e) => error!("Connection failed: {}", e),
            }
        }

        Ok(())
    }

    /// Handles a single client connection.
    fn handle_connection(&self, stream: TcpStream) -> Result<()> {
        let peer_addr = stream.peer_addr()?;
        debug!("Accepted connection from {}", peer_addr);

        let reader = &stream;
        let mut writer = BufWriter::new(&stream);
        let requests = Deserializer::from_reader(reader).into_iter::<Request>();

        for request in requests {
            let request = request?;
            debug!("Received request from {}: {:?}", peer_addr, request);

            let response = match request {
                Request::Echo { body } => self.echo(body),
            };

            serde_json::to_writer(&mut writer, &response)?;
            writer.flush()?;
        }

        Ok(())
    }

    fn echo(&self, body: String) -> Response {
        let job = EchoJob {
            body,
            handler: self.handler.clone(),
        };
        match self.pool.queue_and_wait(job) {
            Ok(res) => match res.into_result() {
                Ok(Some(body)) => Response::Ok(body),
                Ok(None) => Response::Ok(String::new()),
                Err(e) => Response::Err(e.to_string()),
            },
            Err(e) => Response::Err(e.to_string()),
        }
    }
}
