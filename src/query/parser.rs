//! Query parsers.
//!
//! # Example
//!
//! ```
//! use oraclewire::query::{DefaultQueryParser, QueryParser};
//!
//! let req = DefaultQueryParser.parse("hello: name = Ada ,lang=en").unwrap();
//! assert_eq!(req.query(), "hello");
//! assert_eq!(req.arg("name").as_deref(), Some("Ada"));
//! assert_eq!(req.arg("lang").as_deref(), Some("en"));
//!
//! assert!(DefaultQueryParser.parse("a:b:c").is_err());
//! ```

use crate::error::{OracleError, Result};
use crate::handler::Request;

/// Converts raw query text into a [`Request`].
///
/// Implement this to replace the query language used by an oracle.
pub trait QueryParser: Send + Sync + 'static {
    /// Parse one raw query.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` does not follow the parser's grammar.
    /// No request is produced in that case.
    fn parse(&self, raw: &str) -> Result<Request>;
}

/// Wrapper that lets a plain function serve as a [`QueryParser`].
pub struct ParserFn<F>(pub F)
where
    F: Fn(&str) -> Result<Request> + Send + Sync + 'static;

impl<F> QueryParser for ParserFn<F>
where
    F: Fn(&str) -> Result<Request> + Send + Sync + 'static,
{
    fn parse(&self, raw: &str) -> Result<Request> {
        (self.0)(raw)
    }
}

/// The built-in `query:key=value,...` grammar.
///
/// - No `:` means the whole trimmed input is the query name, without
///   arguments.
/// - One `:` separates the name from a comma-separated list of `key=value`
///   pairs. Keys and values are trimmed.
/// - More than one `:` is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultQueryParser;

impl QueryParser for DefaultQueryParser {
    fn parse(&self, raw: &str) -> Result<Request> {
        let parts: Vec<&str> = raw.split(':').collect();

        match parts.as_slice() {
            [query] => Ok(Request::new(query.trim())),
            [query, args] => {
                let req = Request::new(query.trim());

                for arg in args.trim().split(',') {
                    let pair: Vec<&str> = arg.trim().split('=').collect();
                    match pair.as_slice() {
                        [key, value] => req.set_arg(key.trim(), value.trim()),
                        _ => return Err(OracleError::InvalidArgument(arg.to_string())),
                    }
                }

                Ok(req)
            }
            _ => Err(OracleError::InvalidQuery),
        }
    }
}
