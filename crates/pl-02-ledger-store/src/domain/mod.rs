//! Domain layer: keys, requests, errors and read/write sets.

pub mod errors;
pub mod keys;
pub mod requests;
pub mod rwset;

pub use errors::*;
pub use keys::*;
pub use requests::*;
pub use rwset::*;
