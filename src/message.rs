//! Wire protocol for the hub/node runtime.
//!
//! Records are newline-delimited JSON objects, one [`Message`] per line.
//! Payloads are opaque `serde_json::Value`s; callers decode them to a
//! concrete type at receive time via [`Message::payload_as`].

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::RuntimeError;

/// Out-of-band service call codes carried in a negative `source`/`sink` field.
///
/// These are the only values the control dispatcher (hub) and control handler
/// (node) recognize; any other negative value is logged and ignored.
pub mod service {
    /// Node registration: node->hub carries the node id in `tag`; the hub's
    /// reply carries the cohort size in `tag`.
    pub const INIT: i64 = -1;
    /// Node->hub: this node is shutting down.
    pub const TERMINATE: i64 = -2;
    /// Both directions: barrier post (node->hub) and release (hub->node).
    pub const BARRIER: i64 = -3;
    /// Node->hub: print `payload` on the hub's console.
    pub const PRINT: i64 = -4;
    /// Node->hub: fan out `payload` to every registered node. `tag` is a
    /// flag, not an application tag: zero includes the originator, nonzero
    /// excludes it.
    pub const BROADCAST: i64 = -5;
}

/// A single routed message: point-to-point payload or out-of-band service call.
///
/// A negative `sink` marks a service call from a node to the hub; a negative
/// `source` marks a service reply from the hub to a node. Everything else is
/// an ordinary point-to-point delivery between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sending node id, or a negative service code on a hub->node reply.
    pub source: i64,
    /// Destination node id, or a negative service code on a node->hub call.
    pub sink: i64,
    /// Application tag (positive, application-chosen) or an engine-reserved
    /// value (`tag <= 0`) for internal barriers and service-call metadata.
    pub tag: i64,
    /// Opaque payload, decoded to a concrete type at receive time.
    pub payload: serde_json::Value,
}

impl Message {
    /// Build a message, serializing `payload` into a `serde_json::Value`.
    pub fn new(source: i64, sink: i64, tag: i64, payload: &impl Serialize) -> Result<Self> {
        Ok(Self {
            source,
            sink,
            tag,
            payload: serde_json::to_value(payload).context("encoding message payload")?,
        })
    }

    /// Decode the payload to the caller's expected type.
    ///
    /// Mismatches between the declared type and the wire payload surface as
    /// an error here rather than killing the reader loop that delivered it.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.payload.clone())
            .map_err(|err| RuntimeError::Decode(format!("decoding message payload: {err}")).into())
    }

    fn encode_line(&self) -> Result<String> {
        serde_json::to_string(self).context("encoding message to JSON")
    }
}

/// Read one framed [`Message`] from `reader`, or `None` on clean EOF.
///
/// Blank lines (possible after a partial write on a misbehaving peer) are
/// skipped rather than treated as malformed frames.
pub async fn read_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<Message>> {
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.map_err(|err| {
            RuntimeError::Transport(format!("reading a framed line from the socket: {err}"))
        })?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            continue;
        }
        let message: Message = serde_json::from_str(trimmed).map_err(|err| {
            RuntimeError::Decode(format!("malformed frame {trimmed:?}: {err}"))
        })?;
        return Ok(Some(message));
    }
}

/// Encode and write one framed [`Message`] to `writer`.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &Message) -> Result<()> {
    let mut line = message.encode_line()?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await.map_err(|err| {
        RuntimeError::Transport(format!("writing a framed line to the socket: {err}")).into()
    })
}
