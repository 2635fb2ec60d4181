//! # Ports
//!
//! - `Connector` (outbound): opens a secured connection to the gateway peer.
//! - `Connection` (outbound): the four transaction calls over that connection.

pub mod connection;

pub use connection::*;
