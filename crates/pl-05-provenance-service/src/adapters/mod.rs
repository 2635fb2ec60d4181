//! # Adapters

pub mod gateway_client;
