//! Ingestion: turns raw input (text, model weights, Unicode codepoints) into
//! [`crate::model`] records via a [`writer::MerkleDagWriter`].

pub mod seed;
pub mod text;
pub mod writer;

pub use seed::{atom_from_codepoint, project};
pub use text::{ingest_text, resolve_text_composition};
pub use writer::{FlushStats, MerkleDagWriter, ThreadLocalRecords};
