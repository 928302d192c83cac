//! A single worker process's view of the cohort: one TCP connection to the
//! hub, a FIFO of outbound traffic, a selective inbound mailbox, and the
//! handshake/barrier/print/broadcast service calls layered over them.

mod connection;
mod control;
mod queues;

use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub(crate) use control::COMPLETION_TAG;
use control::{BarrierLatches, INIT_BARRIER_TAG};
use queues::InboundBuffer;

use crate::error::RuntimeError;
use crate::message::{service, Message};

/// A connected node. Cheap to clone via `Arc`; every public method takes
/// `&self` so the handle can be shared across the tasks driving a node's
/// own application logic and its collective calls.
pub struct Node {
    id: i64,
    node_count: Mutex<i64>,
    outbound_tx: mpsc::UnboundedSender<Message>,
    inbound: InboundBuffer,
    barriers: BarrierLatches,
    tasks: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl Node {
    /// Connect to the hub at `hub_host:hub_port`, register as node `id`, and
    /// block until the registration barrier releases (i.e. until every
    /// expected node in the cohort has also connected and registered).
    pub async fn connect(hub_host: &str, hub_port: u16, id: i64) -> Result<std::sync::Arc<Node>> {
        let stream = TcpStream::connect((hub_host, hub_port))
            .await
            .with_context(|| format!("connecting to hub at {hub_host}:{hub_port}"))?;
        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let node = std::sync::Arc::new(Node {
            id,
            node_count: Mutex::new(0),
            outbound_tx,
            inbound: InboundBuffer::new(),
            barriers: BarrierLatches::new(),
            tasks: Mutex::new(None),
        });

        let writer_handle = tokio::spawn(connection::writer_loop(write_half, outbound_rx));
        let reader_handle = tokio::spawn(connection::reader_loop(node.clone(), BufReader::new(read_half)));
        *node.tasks.lock().expect("tasks lock poisoned") = Some((reader_handle, writer_handle));

        node.send_service(service::INIT, id, Value::Null)?;
        node.await_barrier(INIT_BARRIER_TAG)
            .await
            .context("waiting for the registration barrier")?;
        let cohort_size = node.node_count();
        debug_assert!(cohort_size > 0, "hub replied with a non-positive cohort size");
        if !(cohort_size as u64).is_power_of_two() {
            return Err(RuntimeError::ProtocolMisuse(format!(
                "cohort size {cohort_size} is not a power of two; collectives will not work"
            ))
            .into());
        }
        log::info!("node {id} registered, cohort size {cohort_size}");
        Ok(node)
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// The cohort size the hub reported at registration. Zero before
    /// `connect` completes; collective operations rely on this being set.
    pub fn node_count(&self) -> i64 {
        *self.node_count.lock().expect("node_count lock poisoned")
    }

    /// Enqueue a point-to-point message for delivery via the hub. Returns as
    /// soon as it's queued; delivery is not acknowledged.
    pub fn send<T: Serialize>(&self, sink: i64, payload: &T, tag: i64) -> Result<()> {
        let message = Message::new(self.id, sink, tag, payload)?;
        self.outbound_tx.send(message).map_err(|_| anyhow!("node outbound channel closed"))
    }

    /// Block until a message arrives, optionally filtered to `source`.
    pub async fn recv(&self, source: Option<i64>) -> Message {
        match source {
            Some(s) => self.inbound.dequeue_source(s).await,
            None => self.inbound.dequeue_any().await,
        }
    }

    /// Like [`Node::recv`] but decodes the payload to `T`.
    pub async fn recv_as<T: DeserializeOwned>(&self, source: Option<i64>) -> Result<T> {
        self.recv(source).await.payload_as()
    }

    /// Block until every node in the cohort has called `barrier` with the
    /// same application-chosen `tag`. Tags must be positive; negative and
    /// zero tags are reserved for the runtime's own handshake and
    /// collective completion rendezvous.
    pub async fn barrier(&self, tag: i64) -> Result<()> {
        if tag <= 0 {
            return Err(RuntimeError::ProtocolMisuse(format!(
                "application barrier tags must be positive, got {tag}"
            ))
            .into());
        }
        self.await_barrier(tag).await
    }

    /// Used by the collective engine to rendezvous on the shared completion
    /// tag after a reduce/gather/scatter/broadcast finishes.
    pub(crate) async fn collective_barrier(&self) -> Result<()> {
        self.await_barrier(COMPLETION_TAG).await
    }

    async fn await_barrier(&self, tag: i64) -> Result<()> {
        let notify = self.barriers.register(tag);
        let notified = notify.notified();
        self.send_service(service::BARRIER, tag, Value::Null)?;
        notified.await;
        Ok(())
    }

    /// Print `obj` on the hub's console, tagged with this node's id.
    pub fn print(&self, obj: impl std::fmt::Display) -> Result<()> {
        self.send_service(service::PRINT, 0, Value::String(obj.to_string()))
    }

    /// Ask the hub to fan `payload` out to every registered node, bypassing
    /// the point-to-point collective engine. Set `exclude_originator` to
    /// skip delivering a copy back to this node.
    pub fn broadcast_raw<T: Serialize>(&self, payload: &T, exclude_originator: bool) -> Result<()> {
        let value = serde_json::to_value(payload).context("encoding broadcast payload")?;
        let tag = i64::from(exclude_originator);
        self.send_service(service::BROADCAST, tag, value)
    }

    /// Notify the hub this node is leaving the cohort and tear down its
    /// reader/writer tasks. `cause` is logged locally, not sent to the hub.
    pub fn terminate(&self, cause: &str) -> Result<()> {
        self.send_service(service::TERMINATE, self.id, Value::Null)?;
        log::info!("node {} terminating: {cause}", self.id);
        if let Some((reader, writer)) = self.tasks.lock().expect("tasks lock poisoned").take() {
            reader.abort();
            writer.abort();
        }
        Ok(())
    }

    fn send_service(&self, sink: i64, tag: i64, payload: Value) -> Result<()> {
        let message = Message { source: self.id, sink, tag, payload };
        self.outbound_tx.send(message).map_err(|_| anyhow!("node outbound channel closed"))
    }
}
