// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base64 handling for linked content blocks.
//!
//! Blocks are written with standard base64 including padding, but decoding
//! tolerates stripped trailing `=` since some transports trim it.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

const STANDARD_INDIFFERENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode a linked content block: standard base64 with padding.
pub fn encode_block(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a linked content block, with or without trailing padding.
pub fn decode_block(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD_INDIFFERENT.decode(text)
}

#[cfg(test)]
mod tests {
    use super::{decode_block, encode_block};

    #[test]
    fn tolerates_missing_padding() {
        let block = encode_block(b"hello");
        assert!(block.ends_with('='));

        let stripped = block.trim_end_matches('=');
        assert_eq!(decode_block(&block).unwrap(), b"hello");
        assert_eq!(decode_block(stripped).unwrap(), b"hello");
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(decode_block("not base64 at all!").is_err());
    }
}
