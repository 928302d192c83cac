//! The small set of error *kinds* callers might want to match on.
//!
//! Everything else propagates as a plain `anyhow::Error` with `.context(...)`
//! attached at the point of failure; this enum exists only for the cases
//! worth naming as distinct failure modes, not as a general replacement for
//! `anyhow`.
use std::fmt;

#[derive(Debug)]
pub enum RuntimeError {
    /// The underlying socket closed or a read/write failed.
    Transport(String),
    /// A frame decoded as JSON but not into the caller's expected type, or
    /// didn't decode as JSON at all.
    Decode(String),
    /// A reserved tag or non-power-of-two cohort size was used where the
    /// protocol requires otherwise.
    ProtocolMisuse(String),
    /// A message targeted a sink the hub has no registry entry for.
    LookupMiss(i64),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Transport(msg) => write!(f, "transport failure: {msg}"),
            RuntimeError::Decode(msg) => write!(f, "decode failure: {msg}"),
            RuntimeError::ProtocolMisuse(msg) => write!(f, "protocol misuse: {msg}"),
            RuntimeError::LookupMiss(sink) => write!(f, "no registered node for sink {sink}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_failure_kind() {
        assert_eq!(RuntimeError::LookupMiss(7).to_string(), "no registered node for sink 7");
        assert!(RuntimeError::ProtocolMisuse("bad".into()).to_string().contains("protocol misuse"));
    }
}
