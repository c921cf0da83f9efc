//! SAX-style callback contracts the parser drives, per spec §4.5.6.
//!
//! Trait shapes are grounded on `examples/compenguy-sax2_traits/src/common.rs`
//! and `sax2.rs`: `ContentHandler` carries the document-shape events,
//! `EntityResolver` and `ErrorHandler` are independently pluggable, and a
//! `Locator` gives a handler access to the parser's current position without
//! every event payload having to carry one.

use crate::error::TextPos;

/// An attribute as delivered to `start_element`: already namespace-resolved
/// and defaulted/normalized.
#[derive(Clone, Debug, PartialEq)]
pub struct SaxAttribute {
    pub local_name: String,
    pub prefix: Option<String>,
    pub uri: String,
    pub value: String,
    pub is_id: bool,
}

/// Gives a handler the parser's current position, for diagnostics that
/// don't come through as an `Err`.
pub trait Locator {
    fn position(&self) -> TextPos;
}

/// The document-shape event sink. A `Document` builder (§4.6) is the
/// default implementation; tests and host applications may supply others
/// for streaming consumption.
pub trait ContentHandler {
    fn set_document_locator(&mut self, _locator: &dyn Locator) {}
    fn start_document(&mut self) {}
    fn end_document(&mut self) {}

    fn start_namespace_decl(&mut self, _prefix: Option<&str>, _uri: &str) {}
    fn end_namespace_decl(&mut self, _prefix: Option<&str>) {}

    fn start_element(&mut self, local: &str, prefix: Option<&str>, uri: &str, attributes: &[SaxAttribute]);
    fn end_element(&mut self, local: &str, uri: &str);

    fn character_data(&mut self, text: &str);
    fn start_cdata_section(&mut self) {}
    fn end_cdata_section(&mut self) {}

    fn processing_instruction(&mut self, target: &str, data: Option<&str>);
    fn comment(&mut self, text: &str) {}

    fn notation_decl(&mut self, _name: &str, _public_id: Option<&str>, _system_id: Option<&str>) {}
}

/// Resolves external identifiers (the external DTD subset, external parsed
/// and parameter entities) to byte streams. The default resolver (spec
/// §9 open question) reads local files relative to `base_directory` only;
/// network fetches are never performed.
pub trait EntityResolver {
    fn resolve(&mut self, base_uri: Option<&str>, public_id: Option<&str>, system_id: &str)
        -> std::io::Result<Vec<u8>>;
}

/// A resolver that reads `system_id` as a filesystem path, relative to
/// `base_uri` when `system_id` is itself relative. Never performs network
/// I/O; this is a deliberately minimal default (spec §9).
pub struct FileEntityResolver {
    pub base_directory: Option<std::path::PathBuf>,
}

impl EntityResolver for FileEntityResolver {
    fn resolve(
        &mut self,
        base_uri: Option<&str>,
        _public_id: Option<&str>,
        system_id: &str,
    ) -> std::io::Result<Vec<u8>> {
        let path = std::path::Path::new(system_id);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(base) = base_uri {
            std::path::Path::new(base).join(path)
        } else if let Some(dir) = &self.base_directory {
            dir.join(path)
        } else {
            path.to_path_buf()
        };
        std::fs::read(resolved)
    }
}

/// Reports non-fatal conditions a `ContentHandler` wouldn't otherwise see:
/// recoverable validity errors (spec `Invalid`) when `validating` is false,
/// and any warning-level observation the parser wants surfaced without
/// aborting.
pub trait ErrorHandler {
    fn warning(&mut self, message: &str, pos: TextPos);
    fn error(&mut self, message: &str, pos: TextPos);
}

/// An `ErrorHandler` that silently drops everything — the default when a
/// caller hasn't supplied one.
pub struct NullErrorHandler;

impl ErrorHandler for NullErrorHandler {
    fn warning(&mut self, _message: &str, _pos: TextPos) {}
    fn error(&mut self, _message: &str, _pos: TextPos) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        events: Vec<String>,
    }

    impl ContentHandler for Recorder {
        fn start_element(&mut self, local: &str, _prefix: Option<&str>, _uri: &str, attrs: &[SaxAttribute]) {
            self.events.push(format!("start:{}:{}", local, attrs.len()));
        }
        fn end_element(&mut self, local: &str, _uri: &str) {
            self.events.push(format!("end:{}", local));
        }
        fn character_data(&mut self, text: &str) {
            self.events.push(format!("text:{}", text));
        }
        fn processing_instruction(&mut self, target: &str, _data: Option<&str>) {
            self.events.push(format!("pi:{}", target));
        }
    }

    #[test]
    fn default_methods_are_no_ops() {
        let mut r = Recorder { events: Vec::new() };
        r.start_document();
        r.start_namespace_decl(Some("p"), "urn:x");
        r.start_element("e", None, "", &[]);
        r.character_data("hi");
        r.end_element("e", "");
        r.end_namespace_decl(Some("p"));
        r.end_document();
        assert_eq!(r.events, vec!["start:e:0", "text:hi", "end:e"]);
    }
}
