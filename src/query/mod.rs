//! Query module - turning raw query text into [`Request`](crate::Request)s.
//!
//! The [`QueryParser`] trait is the seam for custom query languages. The
//! [`DefaultQueryParser`] implements the built-in grammar:
//!
//! ```text
//! raw  := name [ ":" args ]
//! args := pair ("," pair)*
//! pair := key "=" value
//! ```

mod parser;

pub use parser::{DefaultQueryParser, ParserFn, QueryParser};
