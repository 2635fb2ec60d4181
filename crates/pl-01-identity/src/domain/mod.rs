pub mod certificate;
pub mod credential;
pub mod errors;
pub mod identity;
pub mod keys;

pub use certificate::*;
pub use credential::*;
pub use errors::*;
pub use identity::*;
pub use keys::*;
