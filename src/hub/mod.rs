//! The coordinating hub: a TCP listener plus one worker task pair per
//! connected node, a shared registry for point-to-point routing, and a
//! shared barrier table for the collective/control-plane rendezvous.

mod barrier;
mod registry;
mod worker;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use self::barrier::{new_barrier_table, BarrierTable};
use self::registry::{new_registry, Registry};

/// Shared hub state, handed to every connection's worker task as an `Arc`.
pub struct Hub {
    registry: Registry,
    barrier_table: BarrierTable,
    expected_nodes: i64,
}

impl Hub {
    pub fn new(expected_nodes: i64) -> Arc<Hub> {
        Arc::new(Hub {
            registry: new_registry(),
            barrier_table: new_barrier_table(),
            expected_nodes,
        })
    }

    /// Bind `port` and accept connections until the process is killed.
    ///
    /// Each accepted socket gets its own reader/writer task pair; this
    /// function does not return under normal operation.
    pub async fn run(self: Arc<Self>, port: u16) -> Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("binding hub listener on port {port}"))?;
        log::info!("hub listening on port {port}, expecting {} nodes", self.expected_nodes);
        self.run_on(listener).await
    }

    /// Accept connections on an already-bound listener. Split out from
    /// [`Hub::run`] so tests can bind port `0`, read back the ephemeral
    /// port the OS chose, and only then hand the listener off.
    pub async fn run_on(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await.context("accepting connection")?;
            log::debug!("accepted connection from {peer}");
            let hub = self.clone();
            tokio::spawn(async move {
                worker::run_connection(hub, stream).await;
            });
        }
    }
}
