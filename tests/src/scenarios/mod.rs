//! End-to-end scenarios over the in-process network.

pub mod concurrency;
pub mod enrollment;
pub mod harness;
pub mod provenance_flows;
