// SPDX-License-Identifier: MIT OR Apache-2.0

//! Writer identities: a DID string plus an ed25519 signing key.
//!
//! Key provisioning and storage live outside the engine; every signing
//! operation receives the key material as an argument and nothing is
//! cached beyond that call.

use std::fmt;

use ed25519_dalek::{SECRET_KEY_LENGTH, Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

/// String identifier naming a writer's cryptographic identity.
///
/// The last colon-delimited segment is the key fragment used in JWS `kid`
/// headers, e.g. `did:key:z6Mk…` carries the fragment `z6Mk…`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Did(String);

impl Did {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last colon-delimited segment of the identifier.
    pub fn fragment(&self) -> Result<&str, IdentityError> {
        match self.0.rsplit_once(':') {
            Some((_, fragment)) if !fragment.is_empty() => Ok(fragment),
            _ => Err(IdentityError::MissingFragment(self.0.clone())),
        }
    }

    /// JWS key identifier: `<did>#<fragment>`.
    pub fn kid(&self) -> Result<String, IdentityError> {
        Ok(format!("{}#{}", self.0, self.fragment()?))
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Did {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Private ed25519 key used for signing commit payloads.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Generates a new private key using the system's CSPRNG.
    pub fn new() -> Self {
        let mut csprng: OsRng = OsRng;
        Self(SigningKey::generate(&mut csprng))
    }

    /// Derive the key pair from a raw 32-byte seed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        let seed: [u8; SECRET_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidSeedLength(bytes.len()))?;
        Ok(Self(SigningKey::from_bytes(&seed)))
    }

    /// Derive the key pair from a hex-encoded 32-byte seed.
    pub fn from_hex(value: &str) -> Result<Self, IdentityError> {
        Self::from_bytes(&hex::decode(value)?)
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.0.verifying_key()
    }

    /// Sign the given bytes. Ed25519 signing is deterministic: the same
    /// bytes and key always produce the same signature.
    pub fn sign(&self, bytes: &[u8]) -> Signature {
        self.0.sign(bytes)
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("PrivateKey").finish_non_exhaustive()
    }
}

/// Error types for identity strings and key material.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The identity string carries no colon-delimited key fragment.
    #[error("identity '{0}' has no colon-delimited key fragment")]
    MissingFragment(String),

    /// Seeds must be exactly 32 bytes.
    #[error("invalid private key seed length {0}, expected 32 bytes")]
    InvalidSeedLength(usize),

    /// Seed string contains invalid hexadecimal characters.
    #[error("invalid hex encoding in private key seed")]
    InvalidHexEncoding(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::{Did, IdentityError, PrivateKey};

    #[test]
    fn fragment_is_last_segment() {
        let did = Did::new("did:key:z6MkpTHR8VNs");
        assert_eq!(did.fragment().unwrap(), "z6MkpTHR8VNs");
        assert_eq!(did.kid().unwrap(), "did:key:z6MkpTHR8VNs#z6MkpTHR8VNs");
    }

    #[test]
    fn identity_without_fragment_fails() {
        let did = Did::new("no-colons-here");
        assert!(matches!(
            did.fragment(),
            Err(IdentityError::MissingFragment(_))
        ));

        let trailing = Did::new("did:key:");
        assert!(trailing.fragment().is_err());
    }

    #[test]
    fn seed_roundtrip() {
        let seed = [7u8; 32];
        let key = PrivateKey::from_bytes(&seed).unwrap();
        let again = PrivateKey::from_hex(&hex::encode(seed)).unwrap();
        assert_eq!(key.public_key(), again.public_key());
    }

    #[test]
    fn rejects_bad_seeds() {
        assert!(matches!(
            PrivateKey::from_bytes(&[1, 2, 3]),
            Err(IdentityError::InvalidSeedLength(3))
        ));
        assert!(PrivateKey::from_hex("not hex").is_err());
    }

    #[test]
    fn generated_keys_are_distinct() {
        let first = PrivateKey::new();
        let second = PrivateKey::new();
        assert_ne!(first.public_key(), second.public_key());

        let signature = first.sign(b"payload");
        first.public_key().verify_strict(b"payload", &signature).unwrap();
    }

    #[test]
    fn signing_is_deterministic() {
        let key = PrivateKey::from_bytes(&[42u8; 32]).unwrap();
        assert_eq!(
            key.sign(b"payload").to_bytes(),
            key.sign(b"payload").to_bytes()
        );
    }
}
