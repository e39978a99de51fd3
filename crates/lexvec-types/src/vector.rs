//! Stored vector records.
//!
//! Vectors use a fixed little-endian binary layout rather than JSON so that
//! non-finite values survive storage and can be detected by the audit:
//!
//! ```text
//! version:u8 | model_len:u16 | model:utf8 | updated_at_ms:i64 | dimension:u32 | values:f32*dimension
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::LexvecError;
use crate::model::ModelId;

/// Current binary layout version
pub const VECTOR_CODEC_VERSION: u8 = 1;

/// An embedding as persisted for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Model that produced the vector
    pub model: ModelId,
    /// Write time in milliseconds since epoch
    pub updated_at_ms: i64,
    /// Coordinates in embedding space
    pub values: Vec<f32>,
}

impl VectorRecord {
    /// Create a record stamped with the current time
    pub fn new(model: ModelId, values: Vec<f32>) -> Self {
        Self {
            model,
            updated_at_ms: Utc::now().timestamp_millis(),
            values,
        }
    }

    /// Dimensionality of the stored vector
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Encode to the binary storage layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let model = self.model.as_str().as_bytes();
        let mut out = Vec::with_capacity(1 + 2 + model.len() + 8 + 4 + self.values.len() * 4);
        out.push(VECTOR_CODEC_VERSION);
        // Registry identifiers are short ASCII strings
        out.extend_from_slice(&(model.len() as u16).to_le_bytes());
        out.extend_from_slice(model);
        out.extend_from_slice(&self.updated_at_ms.to_le_bytes());
        out.extend_from_slice(&(self.values.len() as u32).to_le_bytes());
        for value in &self.values {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Decode from the binary storage layout
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LexvecError> {
        let mut reader = ByteReader::new(bytes);

        let version = reader.take::<1>()?[0];
        if version != VECTOR_CODEC_VERSION {
            return Err(LexvecError::Codec(format!(
                "unsupported vector codec version {}",
                version
            )));
        }

        let model_len = u16::from_le_bytes(reader.take::<2>()?) as usize;
        let model_bytes = reader.take_slice(model_len)?;
        let model = std::str::from_utf8(model_bytes)
            .map_err(|e| LexvecError::Codec(format!("model id is not UTF-8: {}", e)))?
            .parse::<ModelId>()
            .map_err(|e| LexvecError::Codec(e.to_string()))?;

        let updated_at_ms = i64::from_le_bytes(reader.take::<8>()?);
        let dimension = u32::from_le_bytes(reader.take::<4>()?) as usize;

        let mut values = Vec::with_capacity(dimension.min(reader.remaining() / 4));
        for _ in 0..dimension {
            values.push(f32::from_le_bytes(reader.take::<4>()?));
        }

        if reader.remaining() != 0 {
            return Err(LexvecError::Codec(format!(
                "{} trailing bytes after {} values",
                reader.remaining(),
                dimension
            )));
        }

        Ok(Self {
            model,
            updated_at_ms,
            values,
        })
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], LexvecError> {
        if self.remaining() < len {
            return Err(LexvecError::Codec(format!(
                "truncated record: needed {} bytes at offset {}, {} left",
                len,
                self.offset,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], LexvecError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take_slice(N)?);
        Ok(buf)
    }
}

/// The dimensionality established for a store's vector column.
///
/// Written atomically with the first committed batch and removed only when
/// every vector is wiped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDimension {
    /// Vector length every stored vector must have
    pub dimension: usize,
    /// Model whose first write established the dimension
    pub model: ModelId,
    /// When the dimension was established (milliseconds since epoch)
    pub established_at_ms: i64,
}

impl StoreDimension {
    pub fn new(dimension: usize, model: ModelId) -> Self {
        Self {
            dimension,
            model,
            established_at_ms: Utc::now().timestamp_millis(),
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
