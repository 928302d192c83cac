//! Per-connection plumbing: one reader task, one writer task, sharing only
//! the outbound mailbox. Mirrors the split used for every other socket
//! worker in this codebase — decoding and dispatch never block on writes,
//! and a slow peer can't stall routing to everyone else.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::error::RuntimeError;
use crate::hub::barrier::arrive;
use crate::hub::registry::{insert, lookup, remove, snapshot, ClientHandle};
use crate::hub::Hub;
use crate::message::{read_message, service, write_message, Message};

/// Take ownership of a freshly accepted connection: split it, spawn its
/// reader and writer tasks, and return once both have exited.
pub async fn run_connection(hub: Arc<Hub>, stream: TcpStream) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    let node_id: Arc<Mutex<Option<i64>>> = Arc::new(Mutex::new(None));

    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if let Err(err) = write_message(&mut write_half, &message).await {
                log::warn!("hub: write to node failed: {err:#}");
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    let reader_node_id = node_id.clone();
    let reader_hub = hub.clone();
    let reader_tx = outbound_tx.clone();
    let reader_task = tokio::spawn(async move {
        loop {
            match read_message(&mut reader).await {
                Ok(Some(message)) => {
                    route_or_dispatch(&reader_hub, message, &reader_tx, &reader_node_id).await;
                }
                Ok(None) => break,
                Err(err) => {
                    if err.downcast_ref::<RuntimeError>().is_some_and(|e| matches!(e, RuntimeError::Decode(_))) {
                        log::error!("hub: malformed frame from peer, dropping connection: {err:#}");
                    } else {
                        log::warn!("hub: transport error from peer, dropping connection: {err:#}");
                    }
                    break;
                }
            }
        }
    });

    let _ = reader_task.await;
    if let Some(id) = *node_id.lock().expect("node_id lock poisoned") {
        remove(&hub.registry, id);
        log::info!("node {id} disconnected");
    }
    drop(outbound_tx);
    let _ = writer_task.await;
}

async fn route_or_dispatch(
    hub: &Arc<Hub>,
    message: Message,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    node_id: &Arc<Mutex<Option<i64>>>,
) {
    if message.sink < 0 {
        dispatch_control(hub, message, outbound_tx, node_id).await;
        return;
    }
    match lookup(&hub.registry, message.sink) {
        Some(handle) => {
            if handle.outbound.send(message).is_err() {
                log::debug!("hub: target node disconnected before delivery");
            }
        }
        None => log::debug!("hub: {}", RuntimeError::LookupMiss(message.sink)),
    }
}

async fn dispatch_control(
    hub: &Arc<Hub>,
    message: Message,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    node_id: &Arc<Mutex<Option<i64>>>,
) {
    match message.sink {
        service::INIT => {
            let id = message.tag;
            *node_id.lock().expect("node_id lock poisoned") = Some(id);
            insert(
                &hub.registry,
                ClientHandle { id, outbound: outbound_tx.clone() },
            );
            let reply = Message { source: service::INIT, sink: id, tag: hub.expected_nodes, payload: Value::Null };
            let _ = outbound_tx.send(reply);
            log::info!("node {id} registered (cohort size {})", hub.expected_nodes);
        }
        service::TERMINATE => {
            log::info!("node {} is terminating", message.source);
        }
        service::BARRIER => {
            let tag = message.tag;
            if arrive(&hub.barrier_table, tag, hub.expected_nodes as usize) {
                for handle in snapshot(&hub.registry) {
                    let release = Message { source: service::BARRIER, sink: handle.id, tag, payload: Value::Null };
                    let _ = handle.outbound.send(release);
                }
                log::debug!("barrier {tag} released");
            }
        }
        service::PRINT => {
            let text = message
                .payload
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|| message.payload.to_string());
            // Spec-mandated program output, distinct from `log::`
            // diagnostics: this goes to stdout, not wherever the logger
            // is pointed.
            println!("[{}]: {text}", message.source);
        }
        service::BROADCAST => {
            let originator = message.source;
            let exclude_originator = message.tag != 0;
            for handle in snapshot(&hub.registry) {
                if exclude_originator && handle.id == originator {
                    continue;
                }
                let copy = Message {
                    source: originator,
                    sink: handle.id,
                    tag: message.tag,
                    payload: message.payload.clone(),
                };
                let _ = handle.outbound.send(copy);
            }
        }
        other => log::warn!("hub: unrecognized service call sink={other}"),
    }
}
