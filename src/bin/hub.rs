use anyhow::Result;
use clap::Parser;

use hypermesh::Hub;

/// Coordinating hub for a hypermesh cohort.
#[derive(Parser, Debug)]
#[command(name = "hub", about = "Coordinating hub for a hypermesh node cohort")]
struct Args {
    /// TCP port to listen on.
    port: u16,
    /// Number of nodes expected to register before collectives/barriers can release.
    expected_node_count: i64,
    /// Force debug-level logging regardless of RUST_LOG.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let hub = Hub::new(args.expected_node_count);
    hub.run(args.port).await
}
