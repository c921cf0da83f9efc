//! Writes a `Document` back to XML text, per spec §4.7.
//!
//! The escaping and indentation knobs mirror the options-struct pattern
//! used throughout this crate (`ParseOptions` in `parser.rs`); the actual
//! text-emission walk is new, since the teacher crate is read-only and
//! never serializes.

use std::fmt::Write as _;

use crate::dom::{Document, NodeId, NodeKind};

/// Serialization knobs, per spec §4.7/§6.5.
#[derive(Clone, Debug)]
pub struct SerializeOptions {
    /// Spaces per indentation level. `0` disables indentation entirely
    /// (output is written on a single line per node, no added whitespace).
    pub indent: usize,
    /// Put each attribute on its own indented line instead of all on the
    /// start tag's line.
    pub indent_attributes: bool,
    /// Emit `<x/>` for elements with no children instead of `<x></x>`.
    pub collapse_tags: bool,
    pub suppress_comments: bool,
    /// Escape tab/CR/LF as `&#9;`/`&#13;`/`&#10;` inside attribute values.
    pub escape_white_space: bool,
    /// Escape `"` as `&quot;` inside attribute values (they are always
    /// written double-quoted, so this is the only quote character that
    /// would otherwise need escaping).
    pub escape_double_quote: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        SerializeOptions {
            indent: 2,
            indent_attributes: false,
            collapse_tags: true,
            suppress_comments: false,
            escape_white_space: false,
            escape_double_quote: true,
        }
    }
}

impl Document {
    /// Serializes the whole document (root's children) to a string.
    pub fn serialize(&self, options: &SerializeOptions) -> String {
        let mut out = String::new();
        let mut w = Writer { doc: self, opts: options, out: &mut out };
        for child in self.children(self.root()).to_vec() {
            w.write_node(child, 0);
        }
        out
    }
}

struct Writer<'a> {
    doc: &'a Document,
    opts: &'a SerializeOptions,
    out: &'a mut String,
}

impl<'a> Writer<'a> {
    fn newline_indent(&mut self, depth: usize) {
        if self.opts.indent > 0 {
            self.out.push('\n');
            for _ in 0..depth * self.opts.indent {
                self.out.push(' ');
            }
        }
    }

    fn write_node(&mut self, id: NodeId, depth: usize) {
        match self.doc.kind(id).clone() {
            NodeKind::Root => {}
            NodeKind::Element { qname, attrs, .. } => {
                self.out.push('<');
                write!(self.out, "{}", qname).unwrap();
                for (prefix, uri) in self.doc.namespaces(id) {
                    self.write_namespace_decl(prefix.as_deref(), uri, depth + 1);
                }
                for attr in &attrs {
                    self.write_attribute(*attr, depth + 1);
                }
                let children = self.doc.children(id);
                if children.is_empty() && self.opts.collapse_tags {
                    self.out.push_str("/>");
                    return;
                }
                self.out.push('>');
                for &child in children {
                    self.newline_indent(depth + 1);
                    self.write_node(child, depth + 1);
                }
                if !children.is_empty() {
                    self.newline_indent(depth);
                }
                self.out.push_str("</");
                write!(self.out, "{}", qname).unwrap();
                self.out.push('>');
            }
            NodeKind::Attribute(_) | NodeKind::Namespace { .. } => {}
            NodeKind::Text(text) => self.out.push_str(&escape_text(&text)),
            NodeKind::CData(text) => self.write_cdata(&text),
            NodeKind::Comment(text) => {
                if !self.opts.suppress_comments {
                    self.out.push_str("<!--");
                    self.out.push_str(&text);
                    self.out.push_str("-->");
                }
            }
            NodeKind::ProcessingInstruction { target, data } => {
                self.out.push_str("<?");
                self.out.push_str(&target);
                if let Some(data) = data {
                    self.out.push(' ');
                    self.out.push_str(&data);
                }
                self.out.push_str("?>");
            }
        }
    }

    fn write_namespace_decl(&mut self, prefix: Option<&str>, uri: &str, depth: usize) {
        if self.opts.indent_attributes {
            self.newline_indent(depth);
        } else {
            self.out.push(' ');
        }
        match prefix {
            Some(p) => write!(self.out, "xmlns:{}", p).unwrap(),
            None => self.out.push_str("xmlns"),
        }
        self.out.push_str("=\"");
        self.out.push_str(&escape_attribute_value(uri, self.opts));
        self.out.push('"');
    }

    fn write_attribute(&mut self, attr: NodeId, depth: usize) {
        let data = self.doc.attribute(attr).expect("attrs list only ever holds attribute nodes");
        if self.opts.indent_attributes {
            self.newline_indent(depth);
        } else {
            self.out.push(' ');
        }
        write!(self.out, "{}", data.qname).unwrap();
        self.out.push_str("=\"");
        self.out.push_str(&escape_attribute_value(&data.value, self.opts));
        self.out.push('"');
    }

    /// Splits the payload across multiple `<![CDATA[...]]>` sections
    /// wherever it contains the terminator, so the terminator itself is
    /// never written literally (spec §4.7).
    fn write_cdata(&mut self, text: &str) {
        let mut rest = text;
        loop {
            match rest.find("]]>") {
                Some(idx) => {
                    let (head, tail) = rest.split_at(idx + 2);
                    self.out.push_str("<![CDATA[");
                    self.out.push_str(head);
                    self.out.push_str("]]>");
                    rest = tail;
                }
                None => {
                    self.out.push_str("<![CDATA[");
                    self.out.push_str(rest);
                    self.out.push_str("]]>");
                    return;
                }
            }
        }
    }
}

/// Text-content escaping: `&` and `<` always; `>` only when it directly
/// follows `]]`, the one case where a literal `>` could be misread as
/// closing a CDATA-like sequence (spec §4.7).
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    for (i, c) in text.char_indices() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' if i >= 2 && &bytes[i - 2..i] == b"]]" => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

fn escape_attribute_value(value: &str, opts: &SerializeOptions) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' if opts.escape_double_quote => out.push_str("&quot;"),
            '\t' if opts.escape_white_space => out.push_str("&#9;"),
            '\n' if opts.escape_white_space => out.push_str("&#10;"),
            '\r' if opts.escape_white_space => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseOptions;

    // Indentation inserts literal whitespace between sibling nodes; on
    // reparse that whitespace becomes real text children with no
    // counterpart in the original tree. The round-trip law only holds
    // byte-for-structure with indentation off (spec §8's "input without
    // significant whitespace" scoping — see DESIGN.md).
    fn roundtrip(xml: &str) {
        let doc = Document::parse(xml.as_bytes(), ParseOptions::default()).unwrap();
        let out = doc.serialize(&SerializeOptions { indent: 0, ..SerializeOptions::default() });
        let reparsed = Document::parse(out.as_bytes(), ParseOptions::default()).unwrap();
        assert!(doc.equals(doc.root(), reparsed.root()), "round-trip mismatch: {}", out);
    }

    #[test]
    fn round_trips_simple_document() {
        roundtrip("<a x=\"1\"><b>hi</b><c/></a>");
    }

    #[test]
    fn round_trips_namespaces_and_comments() {
        roundtrip("<p:a xmlns:p=\"urn:x\"><!-- hi --><p:b/></p:a>");
    }

    #[test]
    fn collapses_empty_elements_when_enabled() {
        let doc = Document::parse(b"<a><b></b></a>", ParseOptions::default()).unwrap();
        let out = doc.serialize(&SerializeOptions { indent: 0, ..SerializeOptions::default() });
        assert!(out.contains("<b/>"));
    }

    #[test]
    fn does_not_collapse_when_disabled() {
        let doc = Document::parse(b"<a><b></b></a>", ParseOptions::default()).unwrap();
        let out = doc.serialize(&SerializeOptions { indent: 0, collapse_tags: false, ..SerializeOptions::default() });
        assert!(out.contains("<b></b>"));
    }

    #[test]
    fn splits_cdata_containing_terminator() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element(crate::qname::QName::new("a"), "");
        doc.append_child(root, a).unwrap();
        let cdata = doc.create_cdata("x]]>y");
        doc.append_child(a, cdata).unwrap();
        let out = doc.serialize(&SerializeOptions::default());
        assert!(!out.contains("]]>y]]>"));
        assert_eq!(out.matches("<![CDATA[").count(), 2);
    }

    #[test]
    fn escapes_ampersand_and_lt_in_text() {
        assert_eq!(escape_text("a&b<c"), "a&amp;b&lt;c");
    }

    #[test]
    fn escapes_gt_only_after_double_bracket() {
        assert_eq!(escape_text("a>b"), "a>b");
        assert_eq!(escape_text("]]>"), "]]&gt;");
    }

    #[test]
    fn suppresses_comments_when_requested() {
        let doc = Document::parse(b"<a><!-- hi --><b/></a>", ParseOptions::default()).unwrap();
        let out = doc.serialize(&SerializeOptions { suppress_comments: true, ..SerializeOptions::default() });
        assert!(!out.contains("hi"));
    }
}
