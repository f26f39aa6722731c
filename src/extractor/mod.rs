//! The model extractor: turns a neural network's weight matrices into
//! relation-graph edges (§4.5). [`tensors`] parses the on-disk container,
//! [`quality`] gates and scores a projected layer, [`gemm`] does the actual
//! blocked neighbor search, and [`extractor`] ties the three together per
//! layer.

pub mod extractor;
pub mod gemm;
pub mod quality;
pub mod tensors;

pub use extractor::{extract_layer, ExtractStats, VocabEntry};
pub use gemm::{blocked_neighbors, Candidate};
pub use quality::{relu_inplace, row_normalize, score_layer_quality, LayerKind};
pub use tensors::{DType, TensorContainer, TensorInfo};
