//! # Services
//!
//! | Service | Role |
//! |---------|------|
//! | `MembershipRegistry` | MSP id → CA key; certificate and signature checks |
//! | `EndorsingPeer` | Simulates proposals and signs the results |
//! | `OrderingService` | Batches envelopes into hash-linked blocks |
//! | `Committer` | Validates and applies blocks, answers commit-status queries |
//! | `GatewayService` | Client entry point: evaluate, endorse, submit, commit status |

pub mod committer;
pub mod gateway_service;
pub mod membership;
pub mod notifier;
pub mod orderer;
pub mod peer;

pub use committer::Committer;
pub use gateway_service::GatewayService;
pub use membership::{EndorsementPolicy, MembershipRegistry};
pub use notifier::CommitNotifier;
pub use orderer::{OrdererConfig, OrderingService};
pub use peer::EndorsingPeer;
