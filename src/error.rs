//! The error taxonomy for the decoder, lexer, parser and DOM.
//!
//! XPath has its own, separate error type (`xpath::XPathError`); it is
//! embedded here as `Error::XPath` so a single `Result` alias can flow
//! through code that both parses documents and evaluates paths over them.

use std::fmt;

use crate::xpath::XPathError;

/// A line/column position within the original input, one-based.
///
/// Mirrors `xmlparser::TextPos` from the teacher crate: cheap to compute
/// on demand, never carried around speculatively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextPos {
    pub line: u32,
    pub column: u32,
}

impl TextPos {
    pub fn new(line: u32, column: u32) -> Self {
        TextPos { line, column }
    }
}

impl fmt::Display for TextPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The kinds of failure a parse or DOM mutation can surface, per spec §7.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid encoding at {0}: {1}")]
    InvalidEncoding(TextPos, String),

    #[error("not well-formed at {0}: {1}")]
    NotWellFormed(TextPos, String),

    #[error("invalid at {0}: {1}")]
    Invalid(TextPos, String),

    #[error("entity recursion at {0}: '{1}' re-entered during expansion")]
    EntityRecursion(TextPos, String),

    #[error("external entity reference inside attribute value at {0}")]
    ExternalEntityInAttribute(TextPos),

    #[error("encoding mismatch at {0}: declared '{1}', detected '{2}'")]
    EncodingMismatch(TextPos, String, String),

    #[error("unexpected end of input at {0}")]
    UnexpectedEof(TextPos),

    #[error(transparent)]
    XPath(#[from] XPathError),

    #[error("node operation failed: {0}")]
    Dom(String),
}

impl Error {
    pub fn pos(&self) -> Option<TextPos> {
        match self {
            Error::InvalidEncoding(p, _)
            | Error::NotWellFormed(p, _)
            | Error::Invalid(p, _)
            | Error::EntityRecursion(p, _)
            | Error::ExternalEntityInAttribute(p)
            | Error::EncodingMismatch(p, _, _)
            | Error::UnexpectedEof(p) => Some(*p),
            Error::XPath(_) | Error::Dom(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
