//! Process entry point: parse arguments, initialize logging, bind the
//! socket, and run the tick loop to completion (which, barring a fatal I/O
//! error, is forever).

use clap::Parser;
use log::info;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Authoritative light-cycle arena server")]
struct Args {
    /// Address to bind the UDP socket to.
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[clap(short, long, default_value = "8080")]
    port: u16,

    /// Ticks per second the simulation runs at.
    #[clap(short, long, default_value_t = shared::TICK_RATE)]
    tick_rate: u32,

    /// Maximum number of concurrently bound sessions; further `Join`
    /// attempts are rejected once this many are connected.
    #[clap(short, long, default_value = "8")]
    max_players: usize,
}

#[tokio::main]
async fn main() -> Result<(), server::error::EngineError> {
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("RUST_LOG not set; try RUST_LOG=info cargo run to see server activity");
    }

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f64(1.0 / args.tick_rate as f64);

    info!("starting arena server on {}", addr);
    info!("tick rate: {} Hz ({:?} per tick), max_players {}", args.tick_rate, tick_duration, args.max_players);

    let mut server = Server::new(&addr, tick_duration, args.max_players).await?;
    server.run().await
}
