use std::process::exit;
use std::time::Instant;

use clap::Parser;
use log::{error, info};

use simpool::{JobResult, Pool, Result};

#[derive(Parser)]
#[command(name = "simpool-print", version, about = "Print numbers from a worker pool")]
struct Cli {
    /// Number of workers
    #[arg(short, long, default_value_t = 32)]
    workers: usize,

    /// Maximum queue size
    #[arg(short, long = "queue-size", default_value_t = 100)]
    queue_size: usize,

    /// Number of jobs to run
    #[arg(short = 'n', long, default_value_t = 200_000)]
    jobs: usize,
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
    info!(
        "workers: {}, queue size: {}, cpus: {}",
        cli.workers,
        cli.queue_size,
        num_cpus::get()
    );

    let start = Instant::now();
    let pool: Pool = Pool::start(cli.workers, cli.queue_size)?;

    for i in 0..cli.jobs {
        pool.queue(move || {
            println!("{}", i);
            JobResult::empty()
        })?;
    }
    info!("Finished queueing");
    pool.close()?;

    info!("Finished {} jobs ({:?})", cli.jobs, start.elapsed());
    Ok(())
}
