use std::net::SocketAddr;
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info};

use simpool::{EchoServer, Pool, Result};

const DEFAULT_ADDR: &str = "127.0.0.1:8888";

#[derive(Parser)]
#[command(name = "simpool-server", version, about = "A long-job echo server backed by a worker pool")]
struct Cli {
    /// Server listening address
    #[arg(long, default_value = DEFAULT_ADDR, value_name = "IP-PORT")]
    addr: SocketAddr,

    /// Number of workers
    #[arg(short, long, default_value_t = 16)]
    workers: usize,

    /// Maximum queue size
    #[arg(short, long = "queue-size", default_value_t = 320)]
    queue_size: usize,

    /// How long every job takes, in milliseconds
    #[arg(long = "delay-ms", default_value_t = 6000)]
    delay_ms: u64,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    info!("simpool-server {}", env!("CARGO_PKG_VERSION"));
    info!("Workers: {}, queue size: {}", cli.workers, cli.queue_size);
    info!("Listening on {}", cli.addr);

    let pool: Arc<Pool<String>> = Arc::new(Pool::start(cli.workers, cli.queue_size)?);
    let server = EchoServer::new(pool.clone(), Duration::from_millis(cli.delay_ms));
    server.run(cli.addr)?;
    pool.close()
}
