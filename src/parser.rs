//! The recursive-descent driver over the lexer, DTD model and content-model
//! validator, per spec §4.5. Builds a `Document` by default, but the event
//! stream is the `ContentHandler` contract from `sax.rs`, so a caller can
//! supply any other consumer.

use crate::dom::{Document, NodeId, NodeKind};
use crate::dtd::content_model::ContentValidator;
use crate::dtd::{AttDefault, AttType, Dtd, EntityValue};
use crate::error::{Error, Result, TextPos};
use crate::lexer::{Lexer, Token};
use crate::qname::QName;
use crate::sax::{ContentHandler, EntityResolver, ErrorHandler, FileEntityResolver, Locator, NullErrorHandler, SaxAttribute};
use crate::source::SourceStack;

/// Ambient parse configuration, per the teacher's options-struct pattern.
pub struct ParseOptions {
    /// When set, validity errors (`Error::Invalid`) abort the parse instead
    /// of only being reported to the `ErrorHandler`.
    pub validating: bool,
    /// Keep `<![CDATA[...]]>` sections distinct from text nodes in the
    /// resulting DOM instead of folding them into ordinary text.
    pub preserve_cdata: bool,
    pub resolver: Box<dyn EntityResolver>,
    pub error_handler: Box<dyn ErrorHandler>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            validating: false,
            preserve_cdata: false,
            resolver: Box::new(FileEntityResolver { base_directory: None }),
            error_handler: Box::new(NullErrorHandler),
        }
    }
}

struct NsScope(Vec<(Option<String>, String)>);

struct Parser<'s> {
    lexer: Lexer<'s>,
    dtd: Dtd,
    validating: bool,
    preserve_cdata: bool,
    ns_scopes: Vec<NsScope>,
    resolver: Box<dyn EntityResolver>,
    error_handler: Box<dyn ErrorHandler>,
}

impl<'s> Locator for Parser<'s> {
    fn position(&self) -> TextPos {
        self.lexer.pos()
    }
}

impl<'s> Parser<'s> {
    fn resolve_ns(&self, prefix: Option<&str>) -> Option<String> {
        match prefix {
            Some("xml") => return Some("http://www.w3.org/XML/1998/namespace".to_string()),
            Some("xmlns") => return Some("http://www.w3.org/2000/xmlns/".to_string()),
            _ => {}
        }
        for scope in self.ns_scopes.iter().rev() {
            for (p, uri) in scope.0.iter().rev() {
                if p.as_deref() == prefix {
                    return Some(uri.clone());
                }
            }
        }
        None
    }

    fn err_here(&self, msg: impl Into<String>) -> Error {
        Error::NotWellFormed(self.lexer.pos(), msg.into())
    }

    fn invalid(&mut self, msg: impl Into<String>) -> Error {
        let msg = msg.into();
        self.error_handler.error(&msg, self.lexer.pos());
        Error::Invalid(self.lexer.pos(), msg)
    }

    /// Consumes the next significant markup token and requires it to be
    /// `=`, the one place the lexer's own `Token` stream needs a
    /// caller-side "expect a specific punctuation token" helper that the
    /// DTD grammar's `expect_punct` doesn't cover (`=` isn't DTD punct).
    fn expect_eq(&mut self) -> Result<()> {
        loop {
            match self.lexer.next_markup()? {
                Token::Whitespace => continue,
                Token::Eq => return Ok(()),
                other => return Err(self.err_here(format!("expected '=', found {:?}", other))),
            }
        }
    }

    // --- prolog -----------------------------------------------------------

    fn parse_document(&mut self, handler: &mut dyn ContentHandler) -> Result<()> {
        handler.set_document_locator(self);
        handler.start_document();
        self.skip_xml_decl()?;
        self.parse_misc(handler)?;
        if self.try_doctype()? {
            self.parse_doctype(handler)?;
            self.parse_misc(handler)?;
        }
        self.parse_element(handler, None)?;
        self.parse_misc(handler)?;
        if !matches!(self.lexer.next_markup()?, Token::Eof) {
            return Err(self.err_here("content found after the document element"));
        }
        handler.end_document();
        Ok(())
    }

    fn skip_xml_decl(&mut self) -> Result<()> {
        match self.lexer.next_markup()? {
            Token::XmlDeclStart => {
                loop {
                    match self.lexer.next_markup()? {
                        Token::Whitespace => continue,
                        Token::Nmtoken(_) => {
                            self.lexer.skip_whitespace();
                            self.expect_eq()?;
                            self.lexer.skip_whitespace();
                            self.lexer.expect_quoted()?;
                        }
                        Token::TagClose => break,
                        Token::EmptyTagClose => {
                            return Err(self.err_here("XML declaration must end with '?>'"))
                        }
                        Token::Eof => return Err(Error::UnexpectedEof(self.lexer.pos())),
                        other => return Err(self.err_here(format!("unexpected token in XML declaration: {:?}", other))),
                    }
                }
                Ok(())
            }
            other => {
                self.lexer.push_back(other);
                Ok(())
            }
        }
    }

    fn try_doctype(&mut self) -> Result<bool> {
        match self.lexer.next_markup()? {
            Token::DoctypeStart => Ok(true),
            other => {
                self.lexer.push_back(other);
                Ok(false)
            }
        }
    }

    fn parse_doctype(&mut self, handler: &mut dyn ContentHandler) -> Result<()> {
        self.lexer.skip_whitespace();
        let _root_name = self.lexer.expect_name()?;
        self.lexer.skip_whitespace();
        let (public_id, system_id) = self.parse_external_id_opt()?;
        self.lexer.skip_whitespace();
        if self.lexer.try_eat_punct('[')? {
            self.dtd.parse_subset(&mut self.lexer, true)?;
            self.lexer.skip_whitespace();
        }
        self.lexer.expect_tag_close()?;
        if let Some(system_id) = system_id {
            self.load_external_subset(&system_id, public_id.as_deref())?;
        }
        for (name, decl) in self.dtd.notations.clone() {
            handler.notation_decl(&name, decl.public_id.as_deref(), decl.system_id.as_deref());
        }
        Ok(())
    }

    fn parse_external_id_opt(&mut self) -> Result<(Option<String>, Option<String>)> {
        if self.lexer.try_eat_nmtoken("PUBLIC")? {
            self.lexer.skip_whitespace();
            let public_id = self.lexer.expect_quoted()?;
            self.lexer.skip_whitespace();
            let system_id = self.lexer.expect_quoted()?;
            Ok((Some(public_id), Some(system_id)))
        } else if self.lexer.try_eat_nmtoken("SYSTEM")? {
            self.lexer.skip_whitespace();
            let system_id = self.lexer.expect_quoted()?;
            Ok((None, Some(system_id)))
        } else {
            Ok((None, None))
        }
    }

    fn load_external_subset(&mut self, system_id: &str, public_id: Option<&str>) -> Result<()> {
        let base = self.lexer.base_uri().map(|p| p.to_string_lossy().to_string());
        let bytes = self
            .resolver
            .resolve(base.as_deref(), public_id, system_id)
            .map_err(|e| self.err_here(format!("could not resolve external DTD subset: {}", e)))?;
        let text = crate::decoder::decode(&bytes)?;
        let mut sub_src = SourceStack::new(&text, base.map(Into::into));
        let mut sub_lexer = Lexer::new(&mut sub_src);
        self.dtd.parse_subset(&mut sub_lexer, false)
    }

    fn parse_misc(&mut self, handler: &mut dyn ContentHandler) -> Result<()> {
        loop {
            match self.lexer.next_markup()? {
                Token::Whitespace => continue,
                Token::Comment(text) => handler.comment(&text),
                Token::ProcessingInstruction(target, data) => {
                    handler.processing_instruction(&target, data.as_deref())
                }
                other => {
                    self.lexer.push_back(other);
                    return Ok(());
                }
            }
        }
    }

    // --- elements -----------------------------------------------------------

    /// Parses one element, checking it against `parent_validator` (the
    /// content model of the element currently open, or `None` at the
    /// document root) as soon as its name is known.
    fn parse_element(
        &mut self,
        handler: &mut dyn ContentHandler,
        parent_validator: Option<&mut ContentValidator>,
    ) -> Result<()> {
        match self.lexer.next_markup()? {
            Token::TagOpen => {}
            other => return Err(self.err_here(format!("expected an element start tag, found {:?}", other))),
        }
        let raw_name = self.lexer.expect_name()?;

        if let Some(v) = parent_validator {
            if !v.allow(&raw_name) {
                return Err(self.invalid(format!("element '<{}>' is not allowed here", raw_name)));
            }
        }

        let mut raw_attrs: Vec<(String, String)> = Vec::new();
        let is_empty;
        loop {
            self.lexer.skip_whitespace();
            match self.lexer.next_markup()? {
                Token::TagClose => {
                    is_empty = false;
                    break;
                }
                Token::EmptyTagClose => {
                    is_empty = true;
                    break;
                }
                Token::Nmtoken(attr_name) => {
                    self.lexer.skip_whitespace();
                    self.expect_eq()?;
                    self.lexer.skip_whitespace();
                    let raw_value = self.lexer.expect_quoted()?;
                    if raw_attrs.iter().any(|(n, _)| *n == attr_name) {
                        return Err(self.err_here(format!("duplicate attribute '{}'", attr_name)));
                    }
                    raw_attrs.push((attr_name, raw_value));
                }
                other => return Err(self.err_here(format!("expected an attribute or '>', found {:?}", other))),
            }
        }

        let attr_decls = self.dtd.attlists.get(&raw_name).cloned().unwrap_or_default();

        let mut scope = Vec::new();
        for (name, raw_value) in &raw_attrs {
            if name == "xmlns" {
                let value = self.expand_attribute_text(raw_value)?;
                scope.push((None, value));
            } else if let Some(local) = name.strip_prefix("xmlns:") {
                let value = self.expand_attribute_text(raw_value)?;
                scope.push((Some(local.to_string()), value));
            }
        }
        self.ns_scopes.push(NsScope(scope));

        let mut resolved: Vec<SaxAttribute> = Vec::new();
        for (name, raw_value) in &raw_attrs {
            if name == "xmlns" || name.starts_with("xmlns:") {
                continue;
            }
            let qname = QName::parse(name);
            let decl = attr_decls.iter().find(|d| d.name == *name);
            let should_collapse = !matches!(decl.map(|d| &d.att_type), Some(AttType::CData) | None);
            let expanded = self.expand_attribute_text(raw_value)?;
            let value = if should_collapse { collapse_whitespace_runs(&expanded) } else { expanded };
            let uri = match qname.prefix.as_deref() {
                Some(p) => self
                    .resolve_ns(Some(p))
                    .ok_or_else(|| self.err_here(format!("unbound namespace prefix '{}'", p)))?,
                None => String::new(),
            };
            // ID-ness is a DTD fact, set regardless of `validating`; only
            // the uniqueness check below it (`Document::create_attribute`)
            // is gated on validity checking.
            let is_id = matches!(decl.map(|d| &d.att_type), Some(AttType::Id));
            resolved.push(SaxAttribute { local_name: qname.local, prefix: qname.prefix, uri, value, is_id });
        }

        for decl in &attr_decls {
            if raw_attrs.iter().any(|(n, _)| *n == decl.name) {
                continue;
            }
            let default_value = match &decl.default {
                AttDefault::Fixed(v) | AttDefault::Default(v) => Some(v.clone()),
                AttDefault::Required => {
                    if self.validating {
                        return Err(self.invalid(format!(
                            "required attribute '{}' missing on '<{}>'",
                            decl.name, raw_name
                        )));
                    }
                    None
                }
                AttDefault::Implied | AttDefault::None => None,
            };
            if let Some(value) = default_value {
                let qname = QName::parse(&decl.name);
                let is_id = matches!(decl.att_type, AttType::Id);
                resolved.push(SaxAttribute {
                    local_name: qname.local,
                    prefix: qname.prefix,
                    uri: String::new(),
                    value,
                    is_id,
                });
            }
        }

        let qname = QName::parse(&raw_name);
        let uri = match qname.prefix.as_deref() {
            Some(p) => self
                .resolve_ns(Some(p))
                .ok_or_else(|| self.err_here(format!("unbound namespace prefix '{}'", p)))?,
            None => self.resolve_ns(None).unwrap_or_default(),
        };

        for (prefix, ns_uri) in &self.ns_scopes.last().unwrap().0 {
            handler.start_namespace_decl(prefix.as_deref(), ns_uri);
        }
        handler.start_element(&qname.local, qname.prefix.as_deref(), &uri, &resolved);

        let mut validator = if self.validating {
            self.dtd.elements.get(&raw_name).map(|d| d.content.validator())
        } else {
            None
        };

        if !is_empty {
            self.parse_content(handler, &raw_name, &mut validator)?;
        } else if let Some(v) = &validator {
            if !v.done() {
                return Err(self.invalid(format!("element '<{}>' requires content it does not have", raw_name)));
            }
        }

        handler.end_element(&qname.local, &uri);
        for (prefix, _) in self.ns_scopes.pop().unwrap().0.iter().rev() {
            handler.end_namespace_decl(prefix.as_deref());
        }
        Ok(())
    }

    fn parse_content(
        &mut self,
        handler: &mut dyn ContentHandler,
        open_element: &str,
        validator: &mut Option<ContentValidator>,
    ) -> Result<()> {
        let mut text = String::new();
        loop {
            match self.lexer.next_content()? {
                Token::CharData(s) => text.push_str(&s),
                Token::CharRef(code) => {
                    if let Some(c) = char::from_u32(code) {
                        text.push(c);
                    }
                }
                Token::EntityRef(name) => match name.as_str() {
                    "amp" => text.push('&'),
                    "lt" => text.push('<'),
                    "gt" => text.push('>'),
                    "apos" => text.push('\''),
                    "quot" => text.push('"'),
                    _ => self.expand_general_entity_in_content(&name)?,
                },
                Token::TagOpen => {
                    self.lexer.push_back(Token::TagOpen);
                    self.flush_text(handler, &mut text, validator)?;
                    self.parse_element(handler, validator.as_mut())?;
                }
                Token::EndTagOpen => {
                    self.flush_text(handler, &mut text, validator)?;
                    let closing = self.lexer.expect_name()?;
                    if closing != open_element {
                        return Err(self.err_here(format!(
                            "mismatched end tag: expected '</{}>', found '</{}>'",
                            open_element, closing
                        )));
                    }
                    self.lexer.skip_whitespace();
                    self.lexer.expect_tag_close()?;
                    if let Some(v) = validator {
                        if !v.done() {
                            return Err(self.invalid(format!(
                                "element '<{}>' ends with incomplete content",
                                open_element
                            )));
                        }
                    }
                    return Ok(());
                }
                Token::CData(s) => {
                    self.flush_text(handler, &mut text, validator)?;
                    if let Some(v) = validator {
                        if !v.allow_char_data() {
                            return Err(self.invalid("character data not allowed here"));
                        }
                    }
                    if self.preserve_cdata {
                        handler.start_cdata_section();
                        handler.character_data(&s);
                        handler.end_cdata_section();
                    } else {
                        handler.character_data(&s);
                    }
                }
                Token::Comment(s) => {
                    self.flush_text(handler, &mut text, validator)?;
                    handler.comment(&s);
                }
                Token::ProcessingInstruction(t, d) => {
                    self.flush_text(handler, &mut text, validator)?;
                    handler.processing_instruction(&t, d.as_deref());
                }
                Token::Eof => return Err(Error::UnexpectedEof(self.lexer.pos())),
                other => return Err(self.err_here(format!("unexpected token in content: {:?}", other))),
            }
        }
    }

    fn flush_text(
        &mut self,
        handler: &mut dyn ContentHandler,
        text: &mut String,
        validator: &mut Option<ContentValidator>,
    ) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if let Some(v) = validator {
            let is_whitespace_only = text.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
            if !v.allow_char_data() && !is_whitespace_only {
                return Err(self.invalid("character data not allowed by the declared content model"));
            }
        }
        handler.character_data(text);
        text.clear();
        Ok(())
    }

    fn expand_general_entity_in_content(&mut self, name: &str) -> Result<()> {
        let decl = self
            .dtd
            .general_entities
            .get(name)
            .cloned()
            .ok_or_else(|| self.err_here(format!("reference to undeclared entity '&{};'", name)))?;
        match decl.value {
            EntityValue::Internal(replacement) => self.lexer.push_entity_text(name, &replacement),
            EntityValue::External { ndata: Some(_), .. } => {
                Err(self.err_here(format!("unparsed entity '&{};' cannot appear in content", name)))
            }
            EntityValue::External { system_id, .. } => {
                let base = self.lexer.base_uri().map(|p| p.to_string_lossy().to_string());
                let bytes = self
                    .resolver
                    .resolve(base.as_deref(), None, &system_id)
                    .map_err(|e| self.err_here(format!("could not resolve external entity: {}", e)))?;
                let text = crate::decoder::decode(&bytes)?;
                self.lexer.push_entity_text(name, &text)
            }
        }
    }

    /// Expands character and general-entity references in an attribute
    /// literal, applying the always-on whitespace-to-space substitution
    /// (spec §4.5.1). Parameter entities are never recognized here (they
    /// belong only to the DTD grammar); external general entities are
    /// forbidden inside attribute values.
    fn expand_attribute_text(&mut self, raw: &str) -> Result<String> {
        self.expand_attribute_text_inner(raw, &mut Vec::new())
    }

    fn expand_attribute_text_inner(&mut self, raw: &str, open: &mut Vec<String>) -> Result<String> {
        let mut out = String::new();
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\t' | '\n' | '\r' => out.push(' '),
                '&' => {
                    if chars.peek() == Some(&'#') {
                        chars.next();
                        let hex = chars.peek() == Some(&'x');
                        if hex {
                            chars.next();
                        }
                        let mut digits = String::new();
                        while let Some(&d) = chars.peek() {
                            if d == ';' {
                                break;
                            }
                            digits.push(d);
                            chars.next();
                        }
                        chars.next();
                        let radix = if hex { 16 } else { 10 };
                        let code = u32::from_str_radix(&digits, radix)
                            .map_err(|_| self.err_here("malformed character reference"))?;
                        out.push(char::from_u32(code).ok_or_else(|| self.err_here("invalid character reference"))?);
                    } else {
                        let mut name = String::new();
                        while let Some(&d) = chars.peek() {
                            if d == ';' {
                                break;
                            }
                            name.push(d);
                            chars.next();
                        }
                        chars.next();
                        match name.as_str() {
                            "amp" => out.push('&'),
                            "lt" => out.push('<'),
                            "gt" => out.push('>'),
                            "apos" => out.push('\''),
                            "quot" => out.push('"'),
                            _ => {
                                if open.iter().any(|n| n == &name) {
                                    return Err(Error::EntityRecursion(self.lexer.pos(), name));
                                }
                                let decl = self.dtd.general_entities.get(&name).cloned().ok_or_else(|| {
                                    self.err_here(format!("reference to undeclared entity '&{};'", name))
                                })?;
                                match decl.value {
                                    EntityValue::Internal(text) => {
                                        open.push(name);
                                        let expanded = self.expand_attribute_text_inner(&text, open)?;
                                        open.pop();
                                        out.push_str(&expanded);
                                    }
                                    EntityValue::External { .. } => {
                                        return Err(Error::ExternalEntityInAttribute(self.lexer.pos()))
                                    }
                                }
                            }
                        }
                    }
                }
                '<' => return Err(self.err_here("'<' is not allowed in an attribute value")),
                c => out.push(c),
            }
        }
        Ok(out)
    }
}

/// Step two of attribute-value normalization: for non-CDATA typed
/// attributes, leading/trailing spaces are trimmed and internal runs
/// collapsed to one (spec §4.5.1). Step one (every whitespace character
/// becomes a literal space) already happened during reference expansion.
fn collapse_whitespace_runs(s: &str) -> String {
    s.split(' ').filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" ")
}

/// A `ContentHandler` that builds a `Document` as events arrive. The
/// default consumer behind `Document::parse` (spec §4.6). `start_element`
/// and friends can't return `Result` (the trait is shared with streaming
/// consumers that have nothing to fail), so DOM-invariant violations are
/// latched into `pending_error` and surfaced once parsing finishes.
struct DomBuilder<'d> {
    doc: &'d mut Document,
    cursor: Vec<NodeId>,
    pending_error: Option<Error>,
    validating: bool,
    /// `start_namespace_decl` for an element fires before that element's
    /// own `start_element` (spec §5); the bindings are buffered here until
    /// `start_element` creates the node they belong to.
    pending_namespaces: Vec<(Option<String>, String)>,
}

impl<'d> DomBuilder<'d> {
    fn new(doc: &'d mut Document, validating: bool) -> Self {
        let root = doc.root();
        DomBuilder { doc, cursor: vec![root], pending_error: None, validating, pending_namespaces: Vec::new() }
    }

    fn fail(&mut self, e: Error) {
        if self.pending_error.is_none() {
            self.pending_error = Some(e);
        }
    }

    fn try_append(&mut self, parent: NodeId, child: NodeId) {
        if let Err(e) = self.doc.append_child(parent, child) {
            self.fail(e);
        }
    }
}

impl<'d> ContentHandler for DomBuilder<'d> {
    fn start_element(&mut self, local: &str, prefix: Option<&str>, uri: &str, attributes: &[SaxAttribute]) {
        let qname = match prefix {
            Some(p) => QName::with_prefix(p.to_string(), local.to_string()),
            None => QName::new(local.to_string()),
        };
        let element = self.doc.create_element(qname, uri);
        let parent = *self.cursor.last().unwrap();
        self.try_append(parent, element);
        let pending_namespaces: Vec<_> = self.pending_namespaces.drain(..).collect();
        for (prefix, uri) in pending_namespaces {
            if let Err(e) = self.doc.add_namespace(element, prefix, uri) {
                self.fail(e);
            }
        }
        for a in attributes {
            let qname = match &a.prefix {
                Some(p) => QName::with_prefix(p.clone(), a.local_name.clone()),
                None => QName::new(a.local_name.clone()),
            };
            match self.doc.create_attribute(element, qname.clone(), a.uri.clone(), a.value.clone(), a.is_id) {
                Ok(_) => {}
                // A duplicate ID value is a DTD-validity concern (spec §4.5
                // item 7), not a well-formedness one: outside validating
                // mode it must not abort the parse. Re-add the attribute
                // without the ID flag so it still appears in the tree —
                // just not registered for `get_id()`/`id()`.
                Err(Error::Dom(msg)) if a.is_id && !self.validating && msg.contains("duplicate ID") => {
                    if let Err(e) = self.doc.create_attribute(element, qname, a.uri.clone(), a.value.clone(), false) {
                        self.fail(e);
                    }
                }
                Err(e) => self.fail(e),
            }
        }
        self.cursor.push(element);
    }

    fn end_element(&mut self, _local: &str, _uri: &str) {
        self.cursor.pop();
    }

    fn start_namespace_decl(&mut self, prefix: Option<&str>, uri: &str) {
        // Fires before `start_element` for the element it belongs to (spec
        // §5), so the element doesn't exist yet — buffer until it does.
        self.pending_namespaces.push((prefix.map(str::to_string), uri.to_string()));
    }

    fn character_data(&mut self, text: &str) {
        let parent = *self.cursor.last().unwrap();
        if let Some(&last) = self.doc.children(parent).last() {
            if let NodeKind::Text(existing) = self.doc.kind(last) {
                let mut merged = existing.clone();
                merged.push_str(text);
                let node = self.doc.create_text(merged);
                self.doc.erase(last);
                self.try_append(parent, node);
                return;
            }
        }
        let node = self.doc.create_text(text);
        self.try_append(parent, node);
    }

    fn processing_instruction(&mut self, target: &str, data: Option<&str>) {
        let parent = *self.cursor.last().unwrap();
        let node = self.doc.create_pi(target, data.map(str::to_string));
        self.try_append(parent, node);
    }

    fn comment(&mut self, text: &str) {
        let parent = *self.cursor.last().unwrap();
        let node = self.doc.create_comment(text);
        self.try_append(parent, node);
    }
}

impl Document {
    /// Parses a complete XML document from `bytes`, building a `Document`.
    pub fn parse(bytes: &[u8], mut options: ParseOptions) -> Result<Document> {
        let text = crate::decoder::decode(bytes)?;
        let mut src = SourceStack::new(&text, None);
        let mut doc = Document::new();
        let pending_error = {
            let mut builder = DomBuilder::new(&mut doc, options.validating);
            let lexer = Lexer::new(&mut src);
            let mut parser = Parser {
                lexer,
                dtd: Dtd::new(),
                validating: options.validating,
                preserve_cdata: options.preserve_cdata,
                ns_scopes: vec![NsScope(Vec::new())],
                resolver: std::mem::replace(&mut options.resolver, Box::new(FileEntityResolver { base_directory: None })),
                error_handler: std::mem::replace(&mut options.error_handler, Box::new(NullErrorHandler)),
            };
            parser.parse_document(&mut builder)?;
            builder.pending_error.take()
        };
        if let Some(e) = pending_error {
            return Err(e);
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Document {
        Document::parse(xml.as_bytes(), ParseOptions::default()).unwrap()
    }

    fn parse_with(xml: &str, validating: bool) -> Result<Document> {
        Document::parse(xml.as_bytes(), ParseOptions { validating, ..ParseOptions::default() })
    }

    #[test]
    fn parses_simple_element_with_text() {
        let doc = parse("<root>hello</root>");
        let root_elem = doc.children(doc.root())[0];
        assert_eq!(doc.str(root_elem), "hello");
    }

    #[test]
    fn parses_nested_elements_and_attributes() {
        let doc = parse("<a x=\"1\"><b/></a>");
        let a = doc.children(doc.root())[0];
        assert_eq!(doc.attributes(a).len(), 1);
        let attr = doc.attribute(doc.attributes(a)[0]).unwrap();
        assert_eq!(attr.value, "1");
        assert_eq!(doc.children(a).len(), 1);
    }

    #[test]
    fn resolves_namespaced_elements() {
        let doc = parse("<p:a xmlns:p=\"urn:x\"><p:b/></p:a>");
        let a = doc.children(doc.root())[0];
        assert_eq!(doc.element_uri(a), Some("urn:x"));
        assert_eq!(doc.element_qname(a).unwrap().prefix.as_deref(), Some("p"));
        let b = doc.children(a)[0];
        assert_eq!(doc.element_uri(b), Some("urn:x"));
    }

    #[test]
    fn expands_internal_general_entity_in_content() {
        let xml = "<!DOCTYPE r [<!ENTITY e \"hi\">]><r>&e;</r>";
        let doc = parse(xml);
        let r = doc.children(doc.root())[0];
        assert_eq!(doc.str(r), "hi");
    }

    #[test]
    fn detects_entity_recursion() {
        let xml = "<!DOCTYPE r [<!ENTITY a \"&b;\"><!ENTITY b \"&a;\">]><r>&a;</r>";
        let err = Document::parse(xml.as_bytes(), ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::EntityRecursion(..)));
    }

    #[test]
    fn applies_attribute_default_from_dtd() {
        let xml = "<!DOCTYPE e [<!ATTLIST e x CDATA \"def\">]><e/>";
        let doc = parse(xml);
        let e = doc.children(doc.root())[0];
        let attr = doc.attribute(doc.attributes(e)[0]).unwrap();
        assert_eq!(attr.qname.local, "x");
        assert_eq!(attr.value, "def");
        assert!(!attr.is_id);
    }

    #[test]
    fn validates_mixed_content() {
        let dtd = "<!DOCTYPE p [<!ELEMENT p (#PCDATA|b)*><!ELEMENT b ANY>]>";
        assert!(parse_with(&format!("{}<p>hello <b>w</b> orld</p>", dtd), true).is_ok());
        assert!(parse_with(&format!("{}<p><c/></p>", dtd), true).is_err());
    }

    #[test]
    fn collapses_whitespace_runs_in_non_cdata_attributes() {
        assert_eq!(collapse_whitespace_runs("  a   b "), "a b");
    }

    #[test]
    fn id_flag_is_set_regardless_of_validating() {
        let dtd = "<!DOCTYPE e [<!ATTLIST e x ID #IMPLIED>]>";
        let doc = parse_with(&format!("{}<e x=\"one\"/>", dtd), false).unwrap();
        let e = doc.children(doc.root())[0];
        let attr = doc.attribute(doc.attributes(e)[0]).unwrap();
        assert!(attr.is_id, "ID-ness is a DTD fact, not gated on validating");
    }

    #[test]
    fn duplicate_id_is_recoverable_outside_validating_mode() {
        let dtd = "<!DOCTYPE r [<!ELEMENT r (e,e)><!ATTLIST e x ID #IMPLIED>]>";
        let xml = format!("{}<r><e x=\"dup\"/><e x=\"dup\"/></r>", dtd);
        let doc = parse_with(&xml, false).unwrap();
        let r = doc.children(doc.root())[0];
        assert_eq!(doc.children(r).len(), 2, "both elements still appear in the tree");

        let err = parse_with(&xml, true).unwrap_err();
        assert!(matches!(err, Error::Dom(_)));
    }

    #[test]
    fn namespace_decl_fires_before_start_element_for_same_element() {
        let doc = parse("<a xmlns:p=\"urn:x\"><p:b/></a>");
        let a = doc.children(doc.root())[0];
        assert_eq!(doc.namespace_nodes(a).len(), 1);
    }
}
