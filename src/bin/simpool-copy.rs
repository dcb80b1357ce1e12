use std::path::PathBuf;
use std::process::exit;
use std::time::Instant;

use clap::Parser;
use log::{error, info};

use simpool::transfer::{copy_tree, copy_tree_batched, seed_tree, transfer_tree};
use simpool::{Pool, Result};

#[derive(Parser)]
#[command(name = "simpool-copy", version, about = "Copy a sled tree through a worker pool")]
struct Cli {
    /// Database directory
    #[arg(long, value_name = "DIR")]
    path: PathBuf,

    /// Number of workers
    #[arg(short, long, default_value_t = 16)]
    workers: usize,

    /// Maximum queue size
    #[arg(short, long = "queue-size", default_value_t = 320)]
    queue_size: usize,

    /// Number of rows to seed the source tree with
    #[arg(short = 'n', long, default_value_t = 10_000)]
    rows: usize,

    /// Keep the existing source rows instead of reseeding
    #[arg(long = "no-cleanup")]
    no_cleanup: bool,
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

    let db = sled::open(&cli.path)?;
    let src = db.open_tree("src")?;
    let dst = db.open_tree("dst")?;

    if !cli.no_cleanup {
        src.clear()?;
        let start = Instant::now();
        seed_tree(&src, cli.rows)?;
        info!("Finished creating {} rows ({:?})", cli.rows, start.elapsed());
    }

    dst.clear()?;
    let start = Instant::now();
    let pool: Pool = Pool::new(cli.workers, cli.queue_size)?;
    let copied = copy_tree(&pool, &src, &dst)?;
    info!("Finished {} inserts ({:?})", copied, start.elapsed());
    println!("copied {}", copied);

    dst.clear()?;
    let start = Instant::now();
    let pool: Pool = Pool::new(cli.workers, cli.queue_size)?;
    let copied = copy_tree_batched(&pool, &src, &dst)?;
    info!("Finished {} batched inserts ({:?})", copied, start.elapsed());
    println!("batched {}", copied);

    dst.clear()?;
    let start = Instant::now();
    let pool: Pool<usize> = Pool::with_result_stream(cli.workers, cli.queue_size)?;
    let report = transfer_tree(&pool, &src, &dst)?;
    pool.close()?;
    info!("Finished transfer ({:?})", start.elapsed());
    println!("transferred {}, failed {}", report.inserted, report.failed);

    Ok(())
}
