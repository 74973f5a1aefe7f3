//! Payload codec for cached student collections.
//!
//! The remote store only holds text, so every collection is written as a
//! JSON array. The empty array is a legitimate payload: it records that the
//! source had no results for the query (negative caching).

use thiserror::Error;

use crate::entity::Student;

/// Errors produced while encoding or decoding a cache payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload could not be decoded into a student collection.
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    /// The collection could not be encoded.
    #[error("failed to encode payload: {0}")]
    Encode(String),
}

impl CodecError {
    /// Creates a malformed payload error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }
}

/// Encodes and decodes student collections to the store's text form.
pub trait PayloadCodec: Send + Sync {
    /// Encodes the ordered collection.
    fn encode(&self, students: &[Student]) -> Result<String, CodecError>;

    /// Decodes a payload back into the ordered collection.
    fn decode(&self, payload: &str) -> Result<Vec<Student>, CodecError>;
}

/// JSON array codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn encode(&self, students: &[Student]) -> Result<String, CodecError> {
        serde_json::to_string(students).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, payload: &str) -> Result<Vec<Student>, CodecError> {
        if payload.trim().is_empty() {
            return Err(CodecError::malformed("empty payload"));
        }

        serde_json::from_str(payload).map_err(|e| CodecError::malformed(e.to_string()))
    }
}
