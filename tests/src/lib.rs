//! # Provenance Ledger Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── ledger_benchmarks.rs   # Composite keys, simulation, world state scans
//! └── src/scenarios/
//!     ├── harness.rs             # In-process deployment per test
//!     ├── provenance_flows.rs    # Store, read, query, commit status
//!     ├── concurrency.rs         # Racing writers
//!     └── enrollment.rs          # CA enrollment and session identity
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pl-tests
//! cargo test -p pl-tests scenarios::concurrency::
//! cargo bench -p pl-tests
//! ```

pub mod scenarios;
