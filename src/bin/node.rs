use anyhow::Result;
use clap::Parser;

use hypermesh::collective;
use hypermesh::Node;

/// A hypermesh worker process: connects to a hub, registers, then runs a
/// short demo sequence so the crate has something to show for `cargo run`.
#[derive(Parser, Debug)]
#[command(name = "node", about = "Hypermesh cohort worker")]
struct Args {
    /// Hostname or address of the hub.
    hub_host: String,
    /// TCP port the hub is listening on.
    hub_port: u16,
    /// This node's id, assigned by the launcher. Must be unique within the
    /// cohort and, for the collectives to work, the cohort size must be a
    /// power of two.
    node_id: i64,
    /// Force debug-level logging regardless of RUST_LOG.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let node = Node::connect(&args.hub_host, args.hub_port, args.node_id).await?;

    // Every node enters together, whatever order they reached registration.
    node.barrier(1).await?;

    let sum = collective::reduce_all(&node, node.id(), |a: i64, b: i64| a + b).await?;
    node.print(format!("reduce_all(id) = {sum}"))?;

    let root = 0;
    let seeded = if node.id() == root { Some(42i64) } else { None };
    let broadcasted = collective::broadcast(&node, root, seeded).await?;
    node.print(format!("broadcast from {root} = {broadcasted}"))?;

    node.terminate("demo sequence complete")?;
    Ok(())
}
