//! Tensor container parsing: an 8-byte little-endian header length, a JSON
//! header describing each tensor's dtype/shape/byte range, followed by
//! concatenated raw tensor bytes. Sharded models add an index JSON mapping
//! tensor names to shard files; shard resolution is left to the caller
//! (the extractor is handed one container's bytes at a time).

use crate::error::{Result, SubstrateError};
use ndarray::Array2;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DType {
    F32,
    F16,
    BF16,
    F64,
    I32,
    I64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TensorInfo {
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub data_offsets: [usize; 2],
}

/// A parsed container: the header plus a reference to the raw data segment
/// it describes. Tensors are materialized into `Array2<f32>` lazily via
/// [`TensorContainer::tensor_f32`], converting non-f32 dtypes on read.
pub struct TensorContainer {
    header: HashMap<String, TensorInfo>,
    data: Vec<u8>,
}

impl TensorContainer {
    /// Parse a container's bytes: `[8-byte LE header length][JSON header][raw data]`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 {
            return Err(SubstrateError::Corruption("tensor container shorter than header length prefix".into()));
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&bytes[..8]);
        let header_len = u64::from_le_bytes(len_bytes) as usize;
        let header_end = 8usize
            .checked_add(header_len)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| SubstrateError::Corruption("tensor container header length out of bounds".into()))?;

        let header_json = &bytes[8..header_end];
        let raw_header: HashMap<String, serde_json::Value> = serde_json::from_slice(header_json)?;
        let mut header = HashMap::with_capacity(raw_header.len());
        for (name, value) in raw_header {
            // A sharded index may list non-tensor metadata keys (e.g.
            // `__metadata__`); skip anything that doesn't parse as a tensor
            // descriptor rather than failing the whole container.
            if let Ok(info) = serde_json::from_value::<TensorInfo>(value) {
                header.insert(name, info);
            }
        }

        Ok(Self { header, data: bytes[header_end..].to_vec() })
    }

    pub fn tensor_names(&self) -> impl Iterator<Item = &str> {
        self.header.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.header.contains_key(name)
    }

    /// Read a tensor as a row-major `Array2<f32>`, converting from its
    /// stored dtype. Returns `None` if the name is absent or the shape isn't
    /// rank 2 (both treated by callers as "skip this tensor").
    pub fn tensor_f32(&self, name: &str) -> Option<Array2<f32>> {
        let info = self.header.get(name)?;
        if info.shape.len() != 2 {
            return None;
        }
        let (rows, cols) = (info.shape[0], info.shape[1]);
        let [start, end] = info.data_offsets;
        let bytes = self.data.get(start..end)?;
        let values = decode_values(bytes, info.dtype)?;
        if values.len() != rows * cols {
            return None;
        }
        Array2::from_shape_vec((rows, cols), values).ok()
    }
}

fn decode_values(bytes: &[u8], dtype: DType) -> Option<Vec<f32>> {
    match dtype {
        DType::F32 => Some(bytes.chunks_exact(4).map(|c| f32::from_le_bytes(c.try_into().ok()?)).collect::<Option<Vec<_>>>()?),
        DType::F64 => Some(bytes.chunks_exact(8).map(|c| f64::from_le_bytes(c.try_into().ok()?) as f32).collect::<Option<Vec<_>>>()?),
        DType::F16 => Some(bytes.chunks_exact(2).map(|c| half_to_f32(u16::from_le_bytes([c[0], c[1]]))).collect()),
        DType::BF16 => Some(bytes.chunks_exact(2).map(|c| bf16_to_f32(u16::from_le_bytes([c[0], c[1]]))).collect()),
        DType::I32 => Some(bytes.chunks_exact(4).map(|c| i32::from_le_bytes(c.try_into().ok()?) as f32).collect::<Option<Vec<_>>>()?),
        DType::I64 => Some(bytes.chunks_exact(8).map(|c| i64::from_le_bytes(c.try_into().ok()?) as f32).collect::<Option<Vec<_>>>()?),
    }
}

/// IEEE 754 binary16 to f32, no dependency on the `half` crate.
fn half_to_f32(bits: u16) -> f32 {
    let sign = (bits >> 15) & 1;
    let exponent = (bits >> 10) & 0x1f;
    let mantissa = bits & 0x3ff;
    let value = if exponent == 0 {
        (mantissa as f32) * 2f32.powi(-24)
    } else if exponent == 0x1f {
        if mantissa == 0 { f32::INFINITY } else { f32::NAN }
    } else {
        (1.0 + mantissa as f32 / 1024.0) * 2f32.powi(exponent as i32 - 15)
    };
    if sign == 1 { -value } else { value }
}

/// bfloat16 to f32: top 16 bits of an f32, zero-extended.
fn bf16_to_f32(bits: u16) -> f32 {
    f32::from_bits((bits as u32) << 16)
}
