//! Raw codec - payloads are plain UTF-8 text.
//!
//! Used when the channel already hands over decoded query text.

use super::PayloadCodec;
use crate::error::Result;

/// Codec that treats payload bytes as UTF-8 text.
///
/// This is the simplest codec and the oracle default. Decoding fails only
/// when the bytes are not valid UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl PayloadCodec for RawCodec {
    #[inline]
    fn decode(&self, payload: &[u8]) -> Result<String> {
        Ok(String::from_utf8(payload.to_vec())?)
    }

    #[inline]
    fn encode(&self, text: &str) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }
}
