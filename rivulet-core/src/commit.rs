// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building signed stream commits.
//!
//! A genesis commit opens a new stream and optionally carries base document
//! content; an update commit carries a JSON-Patch diff against the previous
//! document value plus links to the genesis and previous commits. Both wrap
//! the same signed, content-addressed envelope: the DAG-CBOR encoded body
//! becomes the linked content block, its CID becomes the JWS payload, and
//! the writer's key signs the CID bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use crate::cbor::{CodecError, encode_dag_cbor};
use crate::cid::{Cid, CidError};
use crate::encoding::encode_block;
use crate::identity::{Did, PrivateKey};
use crate::jws::{Jws, SignError, sign_payload};

/// Length of the random uniqueness token in a genesis header.
const UNIQUE_LEN: usize = 12;

/// A signed commit as it travels to the transport: the JWS over the body's
/// CID plus the base64-wrapped linked content block.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitEnvelope {
    pub jws: Jws,
    pub linked_block: String,
}

impl CommitEnvelope {
    /// The commit's own CID, recovered from the link field.
    pub fn cid(&self) -> Result<Cid, CidError> {
        self.jws.link.parse()
    }
}

/// Request body for creating a new stream from a genesis commit.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisRequest {
    pub genesis: CommitEnvelope,
    pub opts: StreamOptions,
}

/// Request body for appending an update commit to an existing stream.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub stream_id: String,
    pub commit: CommitEnvelope,
    pub opts: StreamOptions,
}

/// Per-request stream options.
///
/// Defaults request anchoring, publication and a durable pin, without
/// waiting for sync.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOptions {
    pub anchor: bool,
    pub publish: bool,
    pub pin: bool,
    pub sync_on_write: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            anchor: true,
            publish: true,
            pin: true,
            sync_on_write: false,
        }
    }
}

/// Build a genesis commit request for a new stream.
///
/// The header carries the controlling identity, a random uniqueness token
/// and any extra metadata (schema references and the like). The token is
/// what keeps two writers of identical initial content from colliding on
/// the same CID. Extra metadata may shadow the built-in header fields.
pub fn build_genesis(
    did: &Did,
    key: &PrivateKey,
    content: Option<Value>,
    extra: Map<String, Value>,
) -> Result<GenesisRequest, CommitError> {
    let mut header = Map::new();
    header.insert("controllers".to_string(), json!([did.as_str()]));
    header.insert("unique".to_string(), Value::String(unique_token()));
    for (field, value) in extra {
        header.insert(field, value);
    }

    let mut body = Map::new();
    body.insert("header".to_string(), Value::Object(header));
    if let Some(content) = content {
        body.insert("data".to_string(), content);
    }

    let genesis = seal(Value::Object(body), did, key)?;
    debug!(cid = %genesis.jws.link, "built genesis commit");

    Ok(GenesisRequest {
        genesis,
        opts: StreamOptions::default(),
    })
}

/// Build an update commit request against an existing stream.
///
/// The commit data is the RFC 6902 diff from `previous` to `next`. An empty
/// diff is valid and still produces a well-formed, signed commit; whether
/// it is worth sending is the caller's call.
pub fn build_update(
    did: &Did,
    key: &PrivateKey,
    stream_id: &str,
    previous: &Value,
    next: &Value,
    genesis_cid: &str,
    prev_cid: &str,
) -> Result<UpdateRequest, CommitError> {
    let patch = json_patch::diff(previous, next);
    let data =
        serde_json::to_value(&patch).map_err(|err| CommitError::Diff(err.to_string()))?;

    let mut body = Map::new();
    body.insert("header".to_string(), json!({}));
    body.insert("data".to_string(), data);
    body.insert("id".to_string(), Value::String(genesis_cid.to_string()));
    body.insert("prev".to_string(), Value::String(prev_cid.to_string()));

    let commit = seal(Value::Object(body), did, key)?;
    debug!(cid = %commit.jws.link, stream_id, "built update commit");

    Ok(UpdateRequest {
        stream_id: stream_id.to_string(),
        commit,
        opts: StreamOptions::default(),
    })
}

/// Encode, address and sign a commit body.
fn seal(body: Value, did: &Did, key: &PrivateKey) -> Result<CommitEnvelope, CommitError> {
    let encoded = encode_dag_cbor(&body)?;
    let cid = Cid::from_dag_cbor(&encoded);

    let payload = cid.to_payload();
    let signature = sign_payload(&payload, did, key)?;

    Ok(CommitEnvelope {
        jws: Jws {
            payload,
            signatures: vec![signature],
            link: cid.to_string(),
        },
        linked_block: encode_block(&encoded),
    })
}

fn unique_token() -> String {
    let mut bytes = [0u8; UNIQUE_LEN];
    OsRng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Error types for commit construction.
#[derive(Error, Debug)]
pub enum CommitError {
    /// The commit body could not be canonically encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Signing the body's CID failed.
    #[error(transparent)]
    Sign(#[from] SignError),

    /// The patch operations could not be represented as a JSON value.
    #[error("patch serialization failed: {0}")]
    Diff(String),
}
