//! Codec module - decoding transport payloads into query text.
//!
//! Channels deliver query payloads as bytes in whatever encoding the backend
//! uses. A [`PayloadCodec`] turns them into the text handed to the query
//! parser, and encodes text the same way for channels that need it.
//!
//! - [`RawCodec`] - payload is UTF-8 text (the default)
//! - [`MsgPackCodec`] - payload is a MessagePack string (`rmp-serde`)
//! - [`PrefixedBase64Codec`] - `<prefix>_<base64(data ++ checksum)>` node encoding
//!
//! # Example
//!
//! ```
//! use oraclewire::codec::{PayloadCodec, PrefixedBase64Codec, RawCodec};
//!
//! let raw = RawCodec.encode("hello:name=Ada").unwrap();
//! assert_eq!(RawCodec.decode(&raw).unwrap(), "hello:name=Ada");
//!
//! let codec = PrefixedBase64Codec::queries();
//! let encoded = codec.encode("hello").unwrap();
//! assert!(encoded.starts_with(b"oq_"));
//! assert_eq!(codec.decode(&encoded).unwrap(), "hello");
//! ```

mod base64check;
mod msgpack;
mod raw;

pub use base64check::{PrefixedBase64Codec, QUERY_PREFIX, RESPONSE_PREFIX};
pub use msgpack::MsgPackCodec;
pub use raw::RawCodec;

use crate::error::Result;

/// Converts between transport payload bytes and query/answer text.
pub trait PayloadCodec: Send + Sync + 'static {
    /// Decode a payload into text.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid for this encoding.
    fn decode(&self, payload: &[u8]) -> Result<String>;

    /// Encode text into a payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be encoded.
    fn encode(&self, text: &str) -> Result<Vec<u8>>;
}
