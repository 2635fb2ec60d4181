//! # Ports
//!
//! - `ChaincodeStub` (inbound to the contract): transactional view of state.
//! - `WorldState` (outbound): versioned key-value storage the peers share.

pub mod stub;
pub mod world_state;

pub use stub::*;
pub use world_state::*;
