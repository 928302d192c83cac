//! The node's two long-running tasks: one decoding frames off the hub
//! socket and dispatching them, one draining the outbound queue onto the
//! wire. Kept as free functions so [`super::Node`] can spawn them against
//! itself without a circular constructor.

use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

use crate::error::RuntimeError;
use crate::message::{read_message, service, write_message, Message};
use crate::node::Node;

pub(super) async fn reader_loop(node: Arc<Node>, mut reader: BufReader<OwnedReadHalf>) {
    loop {
        match read_message(&mut reader).await {
            Ok(Some(message)) => dispatch(&node, message),
            Ok(None) => break,
            Err(err) => {
                if err.downcast_ref::<RuntimeError>().is_some_and(|e| matches!(e, RuntimeError::Decode(_))) {
                    log::error!("node {}: malformed frame from hub, disconnecting: {err:#}", node.id());
                } else {
                    log::warn!("node {}: transport error from hub, disconnecting: {err:#}", node.id());
                }
                break;
            }
        }
    }
}

fn dispatch(node: &Arc<Node>, message: Message) {
    if message.source >= 0 {
        node.inbound.push(message);
        return;
    }
    match message.source {
        service::INIT => {
            *node.node_count.lock().expect("node_count lock poisoned") = message.tag;
        }
        service::BARRIER => node.barriers.release(message.tag),
        other => log::warn!("node {}: unexpected service reply source={other}", node.id()),
    }
}

pub(super) async fn writer_loop(
    mut write_half: OwnedWriteHalf,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = outbound_rx.recv().await {
        if let Err(err) = write_message(&mut write_half, &message).await {
            log::warn!("node: write to hub failed: {err:#}");
            break;
        }
    }
}
