// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter over the canonical linked-data codec.
//!
//! Commit bodies are encoded in DAG-CBOR, the deterministic CBOR subset the
//! CID codec code 0x71 advertises. The codec itself is an external,
//! reusable library; this module pins its contract for the rest of the
//! engine: same value in, same bytes out, and decode failures are fatal to
//! the operation rather than coerced.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Serializes a value into canonical DAG-CBOR bytes.
pub fn encode_dag_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_ipld_dagcbor::to_vec(value).map_err(|err| CodecError::Encode(err.to_string()))
}

/// Deserializes a value from canonical DAG-CBOR bytes.
pub fn decode_dag_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_ipld_dagcbor::from_slice(bytes).map_err(|err| CodecError::Decode(err.to_string()))
}

/// An error occurred in the linked-data codec.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The value cannot be represented in canonical DAG-CBOR.
    #[error("linked-data encoding failed: {0}")]
    Encode(String),

    /// The bytes are not valid canonical DAG-CBOR for the expected shape.
    #[error("linked-data decoding failed: {0}")]
    Decode(String),
}
