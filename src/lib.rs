//! The semantic substrate: a content-addressed Merkle DAG of atoms,
//! compositions, and relations placed on the 3-sphere S³, with ingestion,
//! generative walk, A* search, Voronoi gap analysis, and an OODA-style
//! reasoning orchestrator built on top.

pub mod config;
pub mod error;
pub mod extractor;
pub mod geometry;
pub mod hash;
pub mod ingest;
pub mod model;
pub mod monitoring;
pub mod reasoning;
pub mod search;
pub mod storage;
pub mod voronoi;
pub mod walk;

pub use error::{Result, SubstrateError};
