//! Domain layer: typed inputs, commands and the service error taxonomy.

pub mod commands;
pub mod errors;
pub mod inputs;

pub use commands::*;
pub use errors::*;
pub use inputs::*;
