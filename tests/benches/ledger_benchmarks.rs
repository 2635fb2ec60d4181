//! # Provenance Ledger Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Composite keys | build and split index keys |
//! | Contract | simulate a store against a populated world state |
//! | Queries | partial-key range query as the ledger grows |

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pl_02_ledger_store::{
    create_composite_key, split_composite_key, InMemoryWorldState, ProvenanceContract,
    StoreProgressUpdateRequest, TxContext, TxSimulator, UpdateBatch, Version, WorldState,
    PROJECT_PROPERTY_PROGRESS_INDEX,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn context(tx_id: &str) -> TxContext {
    TxContext {
        channel_id: "mychannel".to_string(),
        chaincode_name: "provenance".to_string(),
        tx_id: tx_id.to_string(),
        creator_msp_id: "Org1MSP".to_string(),
        timestamp: Utc::now(),
    }
}

fn store_args(progress_id: &str, property_id: &str) -> Vec<String> {
    StoreProgressUpdateRequest {
        progress_id: progress_id.to_string(),
        project_id: "proj-1".to_string(),
        property_id: property_id.to_string(),
        milestone_id: None,
        content_hash: format!("Qm{progress_id}"),
        description: "bench".to_string(),
        uploaded_by: "alice".to_string(),
        timestamp: "2024-03-01T10:00:00Z".to_string(),
        metadata: json!({}),
    }
    .to_args()
}

/// World state holding `count` progress updates spread over ten properties,
/// committed one transaction per record.
fn populated_state(count: u64) -> Arc<dyn WorldState> {
    let state: Arc<dyn WorldState> = Arc::new(InMemoryWorldState::new());
    let contract = ProvenanceContract::new();
    for i in 0..count {
        let sim = TxSimulator::new(state.clone(), context(&format!("tx-{i}")));
        let args = store_args(&format!("pg-{i}"), &format!("unit-{}", i % 10));
        contract
            .invoke(&sim, "StoreProgressUpdate", &args)
            .expect("store succeeds");
        let version = Version::new(i + 1, 0);
        let mut batch = UpdateBatch::new();
        for write in sim.into_results().rwset.writes {
            batch.put(write.key, write.value, version);
        }
        state.apply(batch, version).expect("batch applies");
    }
    state
}

// ============================================================================
// Composite keys
// ============================================================================

fn bench_composite_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite-keys");

    group.bench_function("create", |b| {
        b.iter(|| {
            create_composite_key(
                black_box(PROJECT_PROPERTY_PROGRESS_INDEX),
                black_box(&["proj-1", "unit-5", "pg-1"]),
            )
        })
    });

    let key = create_composite_key(PROJECT_PROPERTY_PROGRESS_INDEX, &["proj-1", "unit-5", "pg-1"])
        .expect("valid key");
    group.bench_function("split", |b| b.iter(|| split_composite_key(black_box(&key))));

    group.finish();
}

// ============================================================================
// Contract simulation
// ============================================================================

fn bench_store_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("store-simulation");
    group.measurement_time(Duration::from_secs(5));
    let contract = ProvenanceContract::new();

    for size in [0u64, 1_000, 10_000] {
        let state = populated_state(size);
        let args = store_args("pg-new", "unit-5");
        group.bench_with_input(BenchmarkId::new("store_progress_update", size), &size, |b, _| {
            b.iter(|| {
                let sim = TxSimulator::new(state.clone(), context("tx-bench"));
                let payload = contract.invoke(&sim, "StoreProgressUpdate", black_box(&args));
                black_box((payload, sim.into_results()))
            })
        });
    }

    group.finish();
}

// ============================================================================
// Range queries
// ============================================================================

fn bench_property_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("property-query");
    group.measurement_time(Duration::from_secs(5));
    let contract = ProvenanceContract::new();
    let args = vec!["unit-5".to_string()];

    for size in [100u64, 1_000, 10_000] {
        let state = populated_state(size);
        // One property in ten matches.
        group.throughput(Throughput::Elements(size / 10));
        group.bench_with_input(BenchmarkId::new("by_property", size), &size, |b, _| {
            b.iter(|| {
                let sim = TxSimulator::new(state.clone(), context("tx-query"));
                black_box(contract.invoke(&sim, "QueryProgressUpdatesByProperty", &args))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_composite_keys,
    bench_store_simulation,
    bench_property_query
);
criterion_main!(benches);
