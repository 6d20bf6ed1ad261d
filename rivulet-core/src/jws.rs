// SPDX-License-Identifier: MIT OR Apache-2.0

//! Detached EdDSA signatures over commit CIDs, in JWS compact form.
//!
//! The payload segment of the JWS is the base64url (no padding) encoding
//! of the raw CID bytes. Signing covers the decoded CID bytes, not the
//! base64url text; the payload segment itself is supplied by the caller
//! and is never re-derived here.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{Did, IdentityError, PrivateKey};

/// JWS envelope carried in transport request bodies.
///
/// `link` is the multibase text form of the same CID the payload segment
/// encodes in binary.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Jws {
    pub payload: String,
    pub signatures: Vec<JwsSignature>,
    pub link: String,
}

/// One protected-header/signature pair of a JWS.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct JwsSignature {
    pub protected: String,
    pub signature: String,
}

#[derive(Serialize, Deserialize)]
struct ProtectedHeader {
    alg: String,
    kid: String,
}

/// Sign a base64url CID payload segment with the writer's key.
///
/// Builds the protected header `{"alg": "EdDSA", "kid": "<did>#<fragment>"}`
/// and signs the decoded CID bytes. Fails fast on a malformed payload
/// segment or an identity without a key fragment; no fallback key is ever
/// substituted.
pub fn sign_payload(
    payload: &str,
    did: &Did,
    key: &PrivateKey,
) -> Result<JwsSignature, SignError> {
    let cid_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(SignError::InvalidPayload)?;

    let header = ProtectedHeader {
        alg: "EdDSA".to_string(),
        kid: did.kid()?,
    };
    let header_bytes =
        serde_json::to_vec(&header).map_err(|err| SignError::Header(err.to_string()))?;

    let signature = key.sign(&cid_bytes);

    Ok(JwsSignature {
        protected: URL_SAFE_NO_PAD.encode(header_bytes),
        signature: URL_SAFE_NO_PAD.encode(signature.to_bytes()),
    })
}

/// Error types for payload signing.
#[derive(Error, Debug)]
pub enum SignError {
    /// The payload segment is not valid base64url.
    #[error("payload segment is not valid base64url: {0}")]
    InvalidPayload(base64::DecodeError),

    /// The signing identity is malformed.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The protected header could not be serialized.
    #[error("protected header serialization failed: {0}")]
    Header(String),
}
