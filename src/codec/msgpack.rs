//! MsgPack codec using `rmp-serde`.
//!
//! For channels that wrap query text in a MessagePack string. Encoding goes
//! through `to_vec_named` like every other MsgPack write in this crate, so
//! the output stays compatible with map-based peers if the payload ever
//! grows into a struct.
//!
//! # Example
//!
//! ```
//! use oraclewire::codec::{MsgPackCodec, PayloadCodec};
//!
//! let encoded = MsgPackCodec.encode("hello").unwrap();
//! assert_eq!(encoded[0], 0xa5); // fixstr, 5 bytes
//! assert_eq!(MsgPackCodec.decode(&encoded).unwrap(), "hello");
//! ```

use super::PayloadCodec;
use crate::error::Result;

/// MessagePack codec for string payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl PayloadCodec for MsgPackCodec {
    #[inline]
    fn decode(&self, payload: &[u8]) -> Result<String> {
        Ok(rmp_serde::from_slice::<String>(payload)?)
    }

    #[inline]
    fn encode(&self, text: &str) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(text)?)
    }
}
