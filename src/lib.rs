//! A minimal MPI-style message-passing runtime: a coordinating hub process
//! and a cohort of node processes, connected over TCP and speaking
//! newline-delimited JSON. See [`hub::Hub`] and [`node::Node`] for the two
//! entry points, and [`collective`] for the hypercube collectives built on
//! top of them.

pub mod collective;
pub mod error;
pub mod hub;
pub mod message;
pub mod node;

pub use error::RuntimeError;
pub use hub::Hub;
pub use message::Message;
pub use node::Node;
