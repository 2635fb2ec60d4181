//! Domain layer: proposals, envelopes, blocks and validation codes.

pub mod block;
pub mod errors;
pub mod proposal;
pub mod status;

pub use block::*;
pub use errors::*;
pub use proposal::*;
pub use status::*;
