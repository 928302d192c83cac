//! Process-wide table of connected nodes, keyed by node id.
//!
//! Reads (routing a point-to-point message, fanning out a broadcast) vastly
//! outnumber writes (a node joining or dropping), so the table sits behind a
//! [`RwLock`] rather than a [`Mutex`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::message::Message;
use tokio::sync::mpsc::UnboundedSender;

/// A connected node's outbound mailbox. Cloning is cheap; every reader task
/// that needs to route to this node holds its own clone.
#[derive(Clone)]
pub struct ClientHandle {
    pub id: i64,
    pub outbound: UnboundedSender<Message>,
}

pub type Registry = Arc<RwLock<HashMap<i64, ClientHandle>>>;

pub fn new_registry() -> Registry {
    Arc::new(RwLock::new(HashMap::new()))
}

pub fn insert(registry: &Registry, handle: ClientHandle) {
    registry
        .write()
        .expect("registry lock poisoned")
        .insert(handle.id, handle);
}

pub fn remove(registry: &Registry, id: i64) {
    registry.write().expect("registry lock poisoned").remove(&id);
}

pub fn lookup(registry: &Registry, id: i64) -> Option<ClientHandle> {
    registry.read().expect("registry lock poisoned").get(&id).cloned()
}

/// A point-in-time copy of every connected node's handle, used for fanout
/// operations (barrier release, broadcast) that must not hold the lock
/// across a send.
pub fn snapshot(registry: &Registry) -> Vec<ClientHandle> {
    registry
        .read()
        .expect("registry lock poisoned")
        .values()
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle(id: i64) -> ClientHandle {
        let (tx, _rx) = mpsc::unbounded_channel();
        ClientHandle { id, outbound: tx }
    }

    #[test]
    fn insert_then_lookup_finds_the_handle() {
        let registry = new_registry();
        insert(&registry, handle(3));
        assert!(lookup(&registry, 3).is_some());
        assert!(lookup(&registry, 4).is_none());
    }

    #[test]
    fn remove_drops_the_entry() {
        let registry = new_registry();
        insert(&registry, handle(1));
        remove(&registry, 1);
        assert!(lookup(&registry, 1).is_none());
    }

    #[test]
    fn snapshot_reflects_all_current_entries() {
        let registry = new_registry();
        insert(&registry, handle(0));
        insert(&registry, handle(1));
        let snap = snapshot(&registry);
        assert_eq!(snap.len(), 2);
    }
}
