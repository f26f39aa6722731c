//! S³ arithmetic and the Hilbert-curve spatial index built on top of it.

pub mod hilbert;
pub mod sphere;

pub use hilbert::{hilbert4d_encode, hilbert4d_encode_s3};
pub use sphere::{centroid, geodesic, is_unit, normalize, sample_near, S3Point};
