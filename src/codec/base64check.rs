//! Prefixed base64 codec with a double-SHA256 checksum.
//!
//! Node APIs in the aeternity family return oracle payloads as
//! `<prefix>_<base64(data ++ checksum)>`, where the checksum is the first
//! four bytes of `sha256(sha256(data))`. Queries use the `oq` prefix and
//! responses the `or` prefix.
//!
//! # Example
//!
//! ```
//! use oraclewire::codec::{PayloadCodec, PrefixedBase64Codec};
//!
//! let codec = PrefixedBase64Codec::queries();
//! let payload = codec.encode("hello:name=Ada").unwrap();
//! assert_eq!(codec.decode(&payload).unwrap(), "hello:name=Ada");
//!
//! // Wrong prefix
//! assert!(PrefixedBase64Codec::responses().decode(&payload).is_err());
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use super::PayloadCodec;
use crate::error::{OracleError, Result};

/// Prefix for oracle query payloads.
pub const QUERY_PREFIX: &str = "oq";

/// Prefix for oracle response payloads.
pub const RESPONSE_PREFIX: &str = "or";

/// Checksum length in bytes.
const CHECKSUM_LEN: usize = 4;

/// Codec for `<prefix>_<base64check>` payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixedBase64Codec {
    prefix: String,
}

impl PrefixedBase64Codec {
    /// Create a codec for the given prefix (without the trailing `_`).
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Codec for query payloads (`oq_...`).
    pub fn queries() -> Self {
        Self::new(QUERY_PREFIX)
    }

    /// Codec for response payloads (`or_...`).
    pub fn responses() -> Self {
        Self::new(RESPONSE_PREFIX)
    }

    /// The expected prefix.
    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(Sha256::digest(data));
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

impl PayloadCodec for PrefixedBase64Codec {
    fn decode(&self, payload: &[u8]) -> Result<String> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| OracleError::Decode(format!("payload is not text: {}", e)))?;

        let (prefix, body) = text
            .split_once('_')
            .ok_or_else(|| OracleError::Decode("missing prefix separator".to_string()))?;

        if prefix != self.prefix {
            return Err(OracleError::Decode(format!(
                "expected prefix {:?}, got {:?}",
                self.prefix, prefix
            )));
        }

        let raw = STANDARD.decode(body)?;
        if raw.len() < CHECKSUM_LEN {
            return Err(OracleError::Decode("payload shorter than checksum".to_string()));
        }

        let (data, check) = raw.split_at(raw.len() - CHECKSUM_LEN);
        if checksum(data).as_slice() != check {
            return Err(OracleError::Decode("checksum mismatch".to_string()));
        }

        Ok(String::from_utf8(data.to_vec())?)
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let data = text.as_bytes();
        let mut raw = Vec::with_capacity(data.len() + CHECKSUM_LEN);
        raw.extend_from_slice(data);
        raw.extend_from_slice(&checksum(data));

        Ok(format!("{}_{}", self.prefix, STANDARD.encode(raw)).into_bytes())
    }
}
