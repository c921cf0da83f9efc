//! A validating XML 1.0 parser, mutable DOM, DTD content-model validator
//! and XPath 1.0 engine.
//!
//! The pieces compose in the direction the module list reads: bytes go
//! through `decoder` and `source` to become a character stream, `lexer`
//! tokenizes it, `parser` drives that against a `dtd` and a `sax`
//! `ContentHandler` (the `dom` module's `Document` being the handler most
//! callers want), and `xpath` queries the result. `serializer` goes back
//! the other way, from a `Document` to text.
//!
//! ```
//! use zeep_xml::dom::Document;
//! use zeep_xml::parser::ParseOptions;
//!
//! let doc = Document::parse(b"<greeting>hello</greeting>", ParseOptions::default()).unwrap();
//! let root = doc.children(doc.root())[0];
//! assert_eq!(doc.str(root), "hello");
//! ```

pub mod decoder;
pub mod dom;
pub mod dtd;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod qname;
pub mod sax;
pub mod serializer;
pub mod source;
pub mod xpath;

pub use dom::Document;
pub use error::{Error, Result, TextPos};
pub use parser::ParseOptions;
pub use qname::{ExpandedName, QName};
