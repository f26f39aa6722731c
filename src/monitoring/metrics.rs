//! Prometheus metrics for the ingestion, walk, search, and reasoning paths.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, GaugeVec,
    HistogramVec,
};

lazy_static! {
    // ------------------------------------------------------------------
    // Ingestion / Merkle-DAG writer
    // ------------------------------------------------------------------

    /// Records flushed per record kind (physicality/relation/relation_sequence/rating/evidence).
    pub static ref INGEST_RECORDS_FLUSHED: CounterVec = register_counter_vec!(
        "substrate_ingest_records_flushed_total",
        "Records flushed to the persistence adapter, by record kind",
        &["kind"]
    ).unwrap();

    /// Flush duration, by source (text/model).
    pub static ref INGEST_FLUSH_DURATION: HistogramVec = register_histogram_vec!(
        "substrate_ingest_flush_duration_seconds",
        "Merkle-DAG writer flush duration",
        &["source"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    ).unwrap();

    /// Relation identities dropped because they were already seen this session.
    pub static ref INGEST_DEDUP_DROPPED: CounterVec = register_counter_vec!(
        "substrate_ingest_dedup_dropped_total",
        "Relation records dropped by session-wide dedup",
        &["kind"]
    ).unwrap();

    // ------------------------------------------------------------------
    // Model extractor
    // ------------------------------------------------------------------

    pub static ref EXTRACTOR_LAYERS_PROCESSED: CounterVec = register_counter_vec!(
        "substrate_extractor_layers_total",
        "Layers processed by the model extractor, by outcome",
        &["kind", "outcome"]  // outcome: accepted/collapsed/empty
    ).unwrap();

    pub static ref EXTRACTOR_EDGES_EMITTED: CounterVec = register_counter_vec!(
        "substrate_extractor_edges_total",
        "Candidate edges emitted by the blocked GEMM extraction",
        &["kind"]
    ).unwrap();

    pub static ref EXTRACTOR_LAYER_QUALITY: HistogramVec = register_histogram_vec!(
        "substrate_extractor_layer_quality",
        "Mean max-cosine-similarity layer quality score",
        &["kind"],
        vec![0.0, 0.05, 0.1, 0.2, 0.3, 0.5, 0.7, 0.9, 1.0]
    ).unwrap();

    // ------------------------------------------------------------------
    // Walk engine
    // ------------------------------------------------------------------

    pub static ref WALK_STEPS_TOTAL: CounterVec = register_counter_vec!(
        "substrate_walk_steps_total",
        "Walk steps taken, by terminal reason once terminated",
        &["terminal_reason"]
    ).unwrap();

    pub static ref WALK_ENERGY_REMAINING: GaugeVec = register_gauge_vec!(
        "substrate_walk_energy_remaining",
        "Energy remaining at walk termination",
        &["terminal_reason"]
    ).unwrap();

    // ------------------------------------------------------------------
    // A* search
    // ------------------------------------------------------------------

    pub static ref SEARCH_EXPANSIONS: HistogramVec = register_histogram_vec!(
        "substrate_search_expansions",
        "Nodes expanded per A* search call",
        &["outcome"],  // found/exhausted_budget
        vec![1.0, 10.0, 100.0, 1000.0, 5000.0, 10000.0]
    ).unwrap();

    pub static ref SEARCH_PATH_COST: HistogramVec = register_histogram_vec!(
        "substrate_search_path_cost",
        "Total edge cost of reconstructed A* paths",
        &["outcome"],
        vec![0.5, 1.0, 2.0, 5.0, 10.0, 50.0]
    ).unwrap();

    // ------------------------------------------------------------------
    // Reasoning orchestrator
    // ------------------------------------------------------------------

    pub static ref REASONING_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "substrate_reasoning_requests_total",
        "Reasoning requests, by outcome",
        &["outcome"]  // resolved/degraded
    ).unwrap();

    pub static ref REASONING_QUALITY: HistogramVec = register_histogram_vec!(
        "substrate_reasoning_quality",
        "Best hypothesis quality score Q",
        &["phase"],  // initial/post_reflexion
        vec![0.0, 0.1, 0.2, 0.3, 0.5, 0.7, 0.9, 1.0]
    ).unwrap();

    pub static ref REASONING_REFLEXION_ROUNDS: HistogramVec = register_histogram_vec!(
        "substrate_reasoning_reflexion_rounds",
        "Reflexion rounds executed before acceptance",
        &["outcome"],
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_can_be_incremented() {
        INGEST_RECORDS_FLUSHED.with_label_values(&["relation"]).inc();
        EXTRACTOR_LAYERS_PROCESSED.with_label_values(&["embedding", "accepted"]).inc();
        WALK_STEPS_TOTAL.with_label_values(&["OutOfEnergy"]).inc();
        REASONING_REQUESTS_TOTAL.with_label_values(&["resolved"]).inc();
    }
}
