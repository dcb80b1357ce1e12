use std::net::SocketAddr;
use std::process::exit;

use clap::{Parser, Subcommand};

use simpool::EchoClient;

const DEFAULT_ADDR: &str = "127.0.0.1:8888";

#[derive(Parser)]
#[command(name = "simpool-client", version, about = "A client for simpool-server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a body and print what the server's job hands back
    Echo {
        /// The body
        body: String,
        /// Server address
        #[arg(long, default_value = DEFAULT_ADDR, value_name = "IP-PORT")]
        addr: SocketAddr,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Echo { body, addr } => {
            let mut client = EchoClient::connect(addr).unwrap_or_else(|e| {
                eprintln!("Failed to connect to server: {}", e);
                exit(1);
            });
            match client.echo(body) {
                Ok(body) => println!("{}", body),
                Err(e) => {
                    eprintln!("{}", e);
                    exit(1);
                }
            }
        }
    }
}
