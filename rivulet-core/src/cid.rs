// SPDX-License-Identifier: MIT OR Apache-2.0

//! Self-describing content identifiers for commit payloads.
//!
//! Every commit body is addressed by a CIDv1 over the DAG-CBOR encoding of
//! the body: `version (1 byte) || codec (1 byte) || multihash`, where the
//! multihash is `hash code (1 byte) || digest length (1 byte) || digest`.
//!
//! A CID has two renderings which are both required and never
//! interchangeable: the multibase base32 text form used as a human-readable
//! stream/commit link, and the base64url (no padding) encoding of the raw
//! CID bytes used verbatim as a JWS payload segment.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest as _, Sha256};
use thiserror::Error;

/// Multicodec code for SHA2-256 hashes.
pub const SHA2_256_CODE: u8 = 0x12;

/// Multicodec code for the DAG-CBOR linked-data codec.
pub const DAG_CBOR_CODE: u8 = 0x71;

/// CID version used throughout the protocol.
pub const CID_VERSION: u8 = 1;

/// Size of SHA2-256 digests.
pub const DIGEST_LEN: usize = 32;

/// Self-describing hash value: function code, digest length, digest bytes.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Multihash(Vec<u8>);

impl Multihash {
    /// Wrap a raw SHA2-256 digest into multihash framing.
    ///
    /// The digest length is stored in a single byte, so digests over 255
    /// bytes (or empty ones) are rejected rather than silently truncated.
    pub fn from_digest(digest: &[u8]) -> Result<Self, CidError> {
        if digest.is_empty() {
            return Err(CidError::EmptyDigest);
        }
        if digest.len() > u8::MAX as usize {
            return Err(CidError::DigestTooLong(digest.len()));
        }

        let mut bytes = Vec::with_capacity(2 + digest.len());
        bytes.push(SHA2_256_CODE);
        bytes.push(digest.len() as u8);
        bytes.extend_from_slice(digest);
        Ok(Self(bytes))
    }

    /// Parse multihash framing, checking that the length byte matches the
    /// digest that follows it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CidError> {
        if bytes.len() < 3 {
            return Err(CidError::Truncated(bytes.len()));
        }
        let expected = bytes[1] as usize;
        let actual = bytes.len() - 2;
        if expected != actual {
            return Err(CidError::LengthMismatch(expected, actual));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Hash function code.
    pub fn code(&self) -> u8 {
        self.0[0]
    }

    /// The raw digest without framing.
    pub fn digest(&self) -> &[u8] {
        &self.0[2..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Multihash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Versioned content identifier over a multihash.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Cid(Vec<u8>);

impl Cid {
    /// Assemble a CID from its parts.
    pub fn new(multihash: &Multihash, codec: u8, version: u8) -> Self {
        let mut bytes = Vec::with_capacity(2 + multihash.as_bytes().len());
        bytes.push(version);
        bytes.push(codec);
        bytes.extend_from_slice(multihash.as_bytes());
        Self(bytes)
    }

    /// Address a DAG-CBOR encoded commit body: SHA2-256 digest, multihash
    /// framing, CIDv1 with the DAG-CBOR codec code.
    pub fn from_dag_cbor(encoded: &[u8]) -> Self {
        let digest = Sha256::digest(encoded);
        let mut bytes = Vec::with_capacity(4 + DIGEST_LEN);
        bytes.push(CID_VERSION);
        bytes.push(DAG_CBOR_CODE);
        bytes.push(SHA2_256_CODE);
        bytes.push(DIGEST_LEN as u8);
        bytes.extend_from_slice(&digest);
        Self(bytes)
    }

    /// Parse raw CID bytes, validating the embedded multihash framing.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CidError> {
        if bytes.len() < 4 {
            return Err(CidError::Truncated(bytes.len()));
        }
        if bytes[0] != CID_VERSION {
            return Err(CidError::UnsupportedVersion(bytes[0]));
        }
        Multihash::from_bytes(&bytes[2..])?;
        Ok(Self(bytes.to_vec()))
    }

    pub fn version(&self) -> u8 {
        self.0[0]
    }

    pub fn codec(&self) -> u8 {
        self.0[1]
    }

    pub fn multihash(&self) -> Multihash {
        Multihash(self.0[2..].to_vec())
    }

    /// The exact byte sequence the JWS payload segment encodes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// JWS payload segment: base64url without padding over the raw CID
    /// bytes. Not the same string as the multibase text form.
    pub fn to_payload(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    /// Self-describing text form in the given multibase. `Display` uses
    /// base32lower, the form link fields carry.
    pub fn to_text(&self, base: multibase::Base) -> String {
        multibase::encode(base, &self.0)
    }
}

impl AsRef<[u8]> for Cid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text(multibase::Base::Base32Lower))
    }
}

impl FromStr for Cid {
    type Err = CidError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (_, bytes) = multibase::decode(value)?;
        Self::from_bytes(&bytes)
    }
}

/// Error types for multihash and CID construction.
#[derive(Error, Debug)]
pub enum CidError {
    /// An empty digest cannot be framed.
    #[error("cannot build a multihash over an empty digest")]
    EmptyDigest,

    /// The digest length must fit into the single length byte.
    #[error("digest of {0} bytes does not fit the one-byte multihash length")]
    DigestTooLong(usize),

    /// Too few bytes for the fixed framing.
    #[error("truncated bytes, got {0}")]
    Truncated(usize),

    /// The length byte disagrees with the digest that follows.
    #[error("multihash length byte says {0} bytes but digest has {1}")]
    LengthMismatch(usize, usize),

    /// Only CIDv1 is produced or consumed here.
    #[error("unsupported CID version {0}")]
    UnsupportedVersion(u8),

    /// The text form is not valid multibase.
    #[error("invalid multibase encoding in CID string")]
    InvalidMultibase(#[from] multibase::Error),
}
