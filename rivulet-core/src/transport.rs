// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interface boundary towards the commit transport.
//!
//! The engine never speaks HTTP itself; it consumes an ordered commit list
//! from, and hands finished request bodies to, whatever implements
//! [`StreamTransport`]. Retry and timeout policy belong to the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commit::{GenesisRequest, UpdateRequest};

/// One element of the ordered commit list a transport returns.
///
/// A commit without a linked content block is an anchor commit: it carries
/// no document data and replay skips it.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitEntry {
    /// Text form CID of the commit.
    pub cid: String,

    /// Base64-wrapped DAG-CBOR body, absent for anchor commits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
}

impl CommitEntry {
    pub fn new(cid: impl Into<String>, block: impl Into<String>) -> Self {
        Self {
            cid: cid.into(),
            block: Some(block.into()),
        }
    }

    /// An anchor commit: a CID with no content block.
    pub fn anchor(cid: impl Into<String>) -> Self {
        Self {
            cid: cid.into(),
            block: None,
        }
    }
}

/// Reading and writing commits for a stream.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Fetch the ordered commit list of a stream.
    async fn load_stream(&self, stream_id: &str) -> Result<Vec<CommitEntry>, TransportError>;

    /// Create a new stream from a genesis commit, returning its stream id.
    async fn create_stream(&self, request: GenesisRequest) -> Result<String, TransportError>;

    /// Append an update commit to an existing stream.
    async fn apply_commit(&self, request: UpdateRequest) -> Result<(), TransportError>;
}

/// Error types surfaced by transport implementations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The transport answered with a non-success status.
    #[error("transport request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be read or parsed.
    #[error("unreadable transport response: {0}")]
    InvalidResponse(String),

    /// The request never completed.
    #[error("transport unreachable: {0}")]
    Unreachable(String),
}
