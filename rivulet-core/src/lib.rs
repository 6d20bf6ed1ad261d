// SPDX-License-Identifier: MIT OR Apache-2.0

//! Protocol engine for rivulet document streams.
//!
//! Independent, mutually-untrusting writers maintain a single logical
//! document as an append-only sequence of signed, content-addressed
//! commits. This crate builds those commits: it addresses DAG-CBOR encoded
//! bodies with CIDv1 content identifiers, signs the CID bytes with a
//! per-writer ed25519 key in detached JWS form, and assembles the
//! transport-facing genesis and update requests. Replaying a commit list
//! back into the current document value lives in `rivulet-stream`.
//!
//! Everything here is a pure transform over its inputs; the only
//! side effect is drawing the random uniqueness token for genesis commits.

pub mod cbor;
pub mod cid;
pub mod commit;
pub mod encoding;
pub mod identity;
pub mod jws;
pub mod transport;

pub use cbor::{CodecError, decode_dag_cbor, encode_dag_cbor};
pub use cid::{Cid, CidError, Multihash};
pub use commit::{
    CommitEnvelope, CommitError, GenesisRequest, StreamOptions, UpdateRequest, build_genesis,
    build_update,
};
pub use identity::{Did, IdentityError, PrivateKey};
pub use jws::{Jws, JwsSignature, SignError, sign_payload};
pub use transport::{CommitEntry, StreamTransport, TransportError};
