//! Document type definitions: element/attribute/entity/notation tables and
//! the grammar that parses them out of a `<!DOCTYPE ...>` subset, per spec
//! §4.3.
//!
//! The table shapes mirror `examples/original_source/src/doctype.cpp`'s
//! `dtd_type` — one map per declaration kind, keyed by name, filled in as
//! the internal and/or external subset is walked.

pub mod content_model;

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};
use content_model::{ContentModel, ContentParticle};

/// An attribute's declared value type.
#[derive(Clone, Debug, PartialEq)]
pub enum AttType {
    CData,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    NmToken,
    NmTokens,
    Notation(Vec<String>),
    Enumeration(Vec<String>),
}

/// An attribute's default-value policy.
#[derive(Clone, Debug, PartialEq)]
pub enum AttDefault {
    None,
    Required,
    Implied,
    Fixed(String),
    Default(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttDef {
    pub name: String,
    pub att_type: AttType,
    pub default: AttDefault,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElementDecl {
    pub name: String,
    pub content: ContentModel,
}

/// A general or parameter entity's replacement, either inline text or an
/// external reference (optionally unparsed, via `NDATA`).
#[derive(Clone, Debug, PartialEq)]
pub enum EntityValue {
    Internal(String),
    External { public_id: Option<String>, system_id: String, ndata: Option<String> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntityDecl {
    pub name: String,
    pub value: EntityValue,
}

impl EntityDecl {
    pub fn is_unparsed(&self) -> bool {
        matches!(&self.value, EntityValue::External { ndata: Some(_), .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NotationDecl {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

/// The full DTD: everything declared across the internal and external
/// subsets, merged (internal-subset declarations win on name collision,
/// per XML 1.0 §5.3 — a validating processor must report duplicates but a
/// well-formedness-only one just keeps the first).
#[derive(Clone, Debug, Default)]
pub struct Dtd {
    pub elements: HashMap<String, ElementDecl>,
    pub attlists: HashMap<String, Vec<AttDef>>,
    pub general_entities: HashMap<String, EntityDecl>,
    pub parameter_entities: HashMap<String, EntityDecl>,
    pub notations: HashMap<String, NotationDecl>,
}

impl Dtd {
    pub fn new() -> Self {
        Dtd::default()
    }

    pub fn attr_def<'a>(&'a self, element: &str, attr: &str) -> Option<&'a AttDef> {
        self.attlists.get(element)?.iter().find(|a| a.name == attr)
    }

    /// Parses one complete subset (internal or external) from `lexer`,
    /// stopping at `]` (internal subset close, caller consumes the
    /// matching `>`) or end-of-input (external subset).
    pub fn parse_subset(&mut self, lexer: &mut Lexer, internal: bool) -> Result<()> {
        loop {
            match lexer.next_markup()? {
                Token::Whitespace => continue,
                Token::Punct(']') if internal => return Ok(()),
                Token::Eof => {
                    if internal {
                        return Err(Error::UnexpectedEof(lexer.pos()));
                    }
                    return Ok(());
                }
                Token::ElementDeclStart => self.parse_element_decl(lexer)?,
                Token::AttlistDeclStart => self.parse_attlist_decl(lexer)?,
                Token::EntityDeclStart => self.parse_entity_decl(lexer)?,
                Token::NotationDeclStart => self.parse_notation_decl(lexer)?,
                Token::Comment(_) => continue,
                Token::ProcessingInstruction(..) => continue,
                Token::ParamEntityRef(name) => self.expand_parameter_entity(lexer, &name)?,
                Token::ConditionalStart if !internal => self.parse_conditional_section(lexer)?,
                other => {
                    return Err(Error::NotWellFormed(
                        lexer.pos(),
                        format!("unexpected token in DTD subset: {:?}", other),
                    ))
                }
            }
        }
    }

    fn parse_conditional_section(&mut self, lexer: &mut Lexer) -> Result<()> {
        let keyword = lexer.expect_name()?;
        lexer.expect_punct('[')?;
        match keyword.as_str() {
            "INCLUDE" => self.parse_subset_until_section_close(lexer),
            "IGNORE" => lexer.skip_ignored_section(),
            other => Err(Error::NotWellFormed(
                lexer.pos(),
                format!("unknown conditional-section keyword '{}'", other),
            )),
        }
    }

    fn parse_subset_until_section_close(&mut self, lexer: &mut Lexer) -> Result<()> {
        loop {
            match lexer.next_markup()? {
                Token::Whitespace => continue,
                Token::SectionClose => return Ok(()),
                Token::ElementDeclStart => self.parse_element_decl(lexer)?,
                Token::AttlistDeclStart => self.parse_attlist_decl(lexer)?,
                Token::EntityDeclStart => self.parse_entity_decl(lexer)?,
                Token::NotationDeclStart => self.parse_notation_decl(lexer)?,
                Token::Comment(_) => continue,
                Token::ProcessingInstruction(..) => continue,
                Token::ParamEntityRef(name) => self.expand_parameter_entity(lexer, &name)?,
                Token::ConditionalStart => self.parse_conditional_section(lexer)?,
                Token::Eof => return Err(Error::UnexpectedEof(lexer.pos())),
                other => {
                    return Err(Error::NotWellFormed(
                        lexer.pos(),
                        format!("unexpected token in included section: {:?}", other),
                    ))
                }
            }
        }
    }

    /// Expands a literal (internal) parameter entity in place, per spec
    /// §4.1: the replacement is pushed as a fresh source framed by
    /// synthesized spaces, so e.g. `<!ELEMENT %e; EMPTY>` tokenizes the
    /// same as if the declaration had been written out with `e`'s value
    /// inline. External parameter entities are resolved by the parser
    /// (which owns the entity resolver) before the subset text reaches us,
    /// so encountering one here means it was never pre-expanded.
    fn expand_parameter_entity(&self, lexer: &mut Lexer, name: &str) -> Result<()> {
        let decl = self.parameter_entities.get(name).ok_or_else(|| {
            Error::NotWellFormed(lexer.pos(), format!("undeclared parameter entity '%{};'", name))
        })?;
        match &decl.value {
            EntityValue::Internal(text) => {
                // Prefixed for cycle tracking only: general and parameter
                // entities live in separate namespaces (XML 1.0 §4.1), but
                // the source stack's recursion check is a single flat name
                // set, so a `%a;` and an `&a;` must not be able to collide.
                let padded = format!(" {} ", text);
                lexer.push_entity_text(&format!("%{}", name), &padded)
            }
            EntityValue::External { .. } => Err(Error::NotWellFormed(
                lexer.pos(),
                format!("external parameter entity '%{};' was not pre-resolved", name),
            )),
        }
    }

    fn parse_element_decl(&mut self, lexer: &mut Lexer) -> Result<()> {
        lexer.skip_whitespace();
        let name = lexer.expect_name()?;
        lexer.skip_whitespace();
        let content = self.parse_content_spec(lexer)?;
        lexer.skip_whitespace();
        lexer.expect_tag_close()?;
        self.elements.insert(name.clone(), ElementDecl { name, content });
        Ok(())
    }

    fn parse_content_spec(&mut self, lexer: &mut Lexer) -> Result<ContentModel> {
        match lexer.next_markup()? {
            Token::Nmtoken(n) if n == "EMPTY" => Ok(ContentModel::Empty),
            Token::Nmtoken(n) if n == "ANY" => Ok(ContentModel::Any),
            Token::Punct('(') => self.parse_parenthesized_content(lexer),
            other => Err(Error::NotWellFormed(
                lexer.pos(),
                format!("expected EMPTY, ANY, or '(', found {:?}", other),
            )),
        }
    }

    /// Parses the body after the opening `(` of a content spec, dispatching
    /// between mixed content (`#PCDATA ...`) and a child-element particle
    /// tree.
    fn parse_parenthesized_content(&mut self, lexer: &mut Lexer) -> Result<ContentModel> {
        lexer.skip_whitespace();
        if lexer.try_eat_pcdata()? {
            let mut names = Vec::new();
            loop {
                lexer.skip_whitespace();
                match lexer.next_markup()? {
                    Token::Punct(')') => break,
                    Token::Punct('|') => {
                        lexer.skip_whitespace();
                        names.push(lexer.expect_name()?);
                    }
                    other => {
                        return Err(Error::NotWellFormed(
                            lexer.pos(),
                            format!("expected '|' or ')' in mixed content, found {:?}", other),
                        ))
                    }
                }
            }
            if !names.is_empty() {
                lexer.expect_punct('*')?;
            } else {
                // `(#PCDATA)` may optionally be followed by `*`, but need
                // not be; either way the model is the same.
                lexer.try_eat_punct('*')?;
            }
            return Ok(ContentModel::Mixed(names));
        }
        let particle = self.parse_cp_sequence_body(lexer)?;
        Ok(ContentModel::Children(self.apply_quantifier(lexer, particle)?))
    }

    /// Parses one content particle (name or parenthesized group), without
    /// its trailing quantifier — callers apply that themselves.
    fn parse_cp(&mut self, lexer: &mut Lexer) -> Result<ContentParticle> {
        lexer.skip_whitespace();
        match lexer.next_markup()? {
            Token::Nmtoken(n) => {
                let p = ContentParticle::Name(n);
                self.apply_quantifier(lexer, p)
            }
            Token::Punct('(') => {
                let p = self.parse_cp_sequence_body(lexer)?;
                self.apply_quantifier(lexer, p)
            }
            other => Err(Error::NotWellFormed(
                lexer.pos(),
                format!("expected a child-element name or '(', found {:?}", other),
            )),
        }
    }

    fn apply_quantifier(
        &mut self,
        lexer: &mut Lexer,
        p: ContentParticle,
    ) -> Result<ContentParticle> {
        if lexer.try_eat_punct('?')? {
            Ok(ContentParticle::ZeroOrOne(Box::new(p)))
        } else if lexer.try_eat_punct('*')? {
            Ok(ContentParticle::ZeroOrMore(Box::new(p)))
        } else if lexer.try_eat_punct('+')? {
            Ok(ContentParticle::OneOrMore(Box::new(p)))
        } else {
            Ok(p)
        }
    }

    /// Parses the comma- or bar-separated body of a `(...)` group (after
    /// the opening paren has already been consumed) into a `Seq`/`Choice`
    /// particle, deciding which based on the first separator encountered.
    fn parse_cp_sequence_body(&mut self, lexer: &mut Lexer) -> Result<ContentParticle> {
        let mut parts = vec![self.parse_cp(lexer)?];
        lexer.skip_whitespace();
        let mut is_choice: Option<bool> = None;
        loop {
            match lexer.next_markup()? {
                Token::Punct(')') => break,
                Token::Punct(sep @ (',' | '|')) => {
                    let this_is_choice = sep == '|';
                    match is_choice {
                        Some(prev) if prev != this_is_choice => {
                            return Err(Error::NotWellFormed(
                                lexer.pos(),
                                "cannot mix ',' and '|' in the same content-particle group".into(),
                            ))
                        }
                        _ => is_choice = Some(this_is_choice),
                    }
                    parts.push(self.parse_cp(lexer)?);
                    lexer.skip_whitespace();
                }
                other => {
                    return Err(Error::NotWellFormed(
                        lexer.pos(),
                        format!("expected ',', '|', or ')', found {:?}", other),
                    ))
                }
            }
        }
        if parts.len() == 1 {
            return Ok(parts.pop().unwrap());
        }
        Ok(if is_choice == Some(true) {
            ContentParticle::Choice(parts)
        } else {
            ContentParticle::Seq(parts)
        })
    }

    fn parse_attlist_decl(&mut self, lexer: &mut Lexer) -> Result<()> {
        lexer.skip_whitespace();
        let element = lexer.expect_name()?;
        let mut defs = Vec::new();
        loop {
            lexer.skip_whitespace();
            if lexer.try_eat_tag_close()? {
                break;
            }
            let name = lexer.expect_name()?;
            lexer.skip_whitespace();
            let att_type = self.parse_att_type(lexer)?;
            lexer.skip_whitespace();
            let default = self.parse_att_default(lexer)?;
            defs.push(AttDef { name, att_type, default });
        }
        self.attlists.entry(element).or_default().extend(defs);
        Ok(())
    }

    fn parse_att_type(&mut self, lexer: &mut Lexer) -> Result<AttType> {
        match lexer.next_markup()? {
            Token::Nmtoken(n) => match n.as_str() {
                "CDATA" => Ok(AttType::CData),
                "ID" => Ok(AttType::Id),
                "IDREF" => Ok(AttType::IdRef),
                "IDREFS" => Ok(AttType::IdRefs),
                "ENTITY" => Ok(AttType::Entity),
                "ENTITIES" => Ok(AttType::Entities),
                "NMTOKEN" => Ok(AttType::NmToken),
                "NMTOKENS" => Ok(AttType::NmTokens),
                "NOTATION" => {
                    lexer.skip_whitespace();
                    lexer.expect_punct('(')?;
                    Ok(AttType::Notation(self.parse_name_list(lexer)?))
                }
                other => Err(Error::NotWellFormed(
                    lexer.pos(),
                    format!("unknown attribute type '{}'", other),
                )),
            },
            Token::Punct('(') => Ok(AttType::Enumeration(self.parse_nmtoken_list(lexer)?)),
            other => Err(Error::NotWellFormed(
                lexer.pos(),
                format!("expected an attribute type, found {:?}", other),
            )),
        }
    }

    fn parse_name_list(&mut self, lexer: &mut Lexer) -> Result<Vec<String>> {
        let mut names = Vec::new();
        loop {
            lexer.skip_whitespace();
            names.push(lexer.expect_name()?);
            lexer.skip_whitespace();
            match lexer.next_markup()? {
                Token::Punct('|') => continue,
                Token::Punct(')') => break,
                other => {
                    return Err(Error::NotWellFormed(
                        lexer.pos(),
                        format!("expected '|' or ')', found {:?}", other),
                    ))
                }
            }
        }
        Ok(names)
    }

    fn parse_nmtoken_list(&mut self, lexer: &mut Lexer) -> Result<Vec<String>> {
        let mut names = Vec::new();
        loop {
            lexer.skip_whitespace();
            names.push(lexer.expect_nmtoken()?);
            lexer.skip_whitespace();
            match lexer.next_markup()? {
                Token::Punct('|') => continue,
                Token::Punct(')') => break,
                other => {
                    return Err(Error::NotWellFormed(
                        lexer.pos(),
                        format!("expected '|' or ')', found {:?}", other),
                    ))
                }
            }
        }
        Ok(names)
    }

    fn parse_att_default(&mut self, lexer: &mut Lexer) -> Result<AttDefault> {
        match lexer.next_markup()? {
            Token::Punct('#') => {
                let kw = lexer.expect_nmtoken()?;
                match kw.as_str() {
                    "REQUIRED" => Ok(AttDefault::Required),
                    "IMPLIED" => Ok(AttDefault::Implied),
                    "FIXED" => {
                        lexer.skip_whitespace();
                        let v = lexer.expect_quoted()?;
                        Ok(AttDefault::Fixed(normalize_attribute_value(&v)))
                    }
                    other => Err(Error::NotWellFormed(
                        lexer.pos(),
                        format!("unknown default keyword '#{}'", other),
                    )),
                }
            }
            Token::QuotedString(v) => Ok(AttDefault::Default(normalize_attribute_value(&v))),
            other => Err(Error::NotWellFormed(
                lexer.pos(),
                format!("expected a default value, found {:?}", other),
            )),
        }
    }

    fn parse_entity_decl(&mut self, lexer: &mut Lexer) -> Result<()> {
        lexer.skip_whitespace();
        let is_param = lexer.try_eat_punct('%')?;
        if is_param {
            lexer.skip_whitespace();
        }
        let name = lexer.expect_name()?;
        lexer.skip_whitespace();
        let value = match lexer.peek_token()? {
            Token::QuotedString(_) => {
                let v = lexer.expect_quoted()?;
                EntityValue::Internal(v)
            }
            _ => {
                let (public_id, system_id) = self.parse_external_id(lexer)?;
                lexer.skip_whitespace();
                let ndata = if lexer.try_eat_nmtoken("NDATA")? {
                    lexer.skip_whitespace();
                    Some(lexer.expect_name()?)
                } else {
                    None
                };
                EntityValue::External {
                    public_id,
                    system_id: system_id
                        .ok_or_else(|| Error::NotWellFormed(lexer.pos(), "missing SYSTEM identifier".into()))?,
                    ndata,
                }
            }
        };
        lexer.skip_whitespace();
        lexer.expect_tag_close()?;
        let decl = EntityDecl { name: name.clone(), value };
        let table = if is_param { &mut self.parameter_entities } else { &mut self.general_entities };
        table.entry(name).or_insert(decl);
        Ok(())
    }

    fn parse_external_id(&mut self, lexer: &mut Lexer) -> Result<(Option<String>, Option<String>)> {
        if lexer.try_eat_nmtoken("PUBLIC")? {
            lexer.skip_whitespace();
            let public_id = lexer.expect_quoted()?;
            lexer.skip_whitespace();
            let system_id = lexer.expect_quoted()?;
            Ok((Some(public_id), Some(system_id)))
        } else if lexer.try_eat_nmtoken("SYSTEM")? {
            lexer.skip_whitespace();
            let system_id = lexer.expect_quoted()?;
            Ok((None, Some(system_id)))
        } else {
            Ok((None, None))
        }
    }

    fn parse_notation_decl(&mut self, lexer: &mut Lexer) -> Result<()> {
        lexer.skip_whitespace();
        let name = lexer.expect_name()?;
        lexer.skip_whitespace();
        let (public_id, system_id) = self.parse_external_id(lexer)?;
        if public_id.is_none() && system_id.is_none() {
            return Err(Error::NotWellFormed(
                lexer.pos(),
                "NOTATION requires a PUBLIC or SYSTEM identifier".into(),
            ));
        }
        lexer.skip_whitespace();
        lexer.expect_tag_close()?;
        self.notations.insert(name.clone(), NotationDecl { name, public_id, system_id });
        Ok(())
    }
}

/// Attribute-value normalization per XML 1.0 §3.3.3: character/entity
/// references aside (those are expanded earlier, by whoever produced `raw`),
/// every literal whitespace character collapses to a single space. This is
/// applied to default/fixed values taken straight from the DTD, since
/// nothing else normalizes them first.
pub fn normalize_attribute_value(raw: &str) -> String {
    raw.chars().map(|c| if c == '\t' || c == '\n' || c == '\r' { ' ' } else { c }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceStack;

    fn parse_internal(dtd_text: &str) -> Dtd {
        let mut src = SourceStack::new(dtd_text, None);
        let mut lexer = Lexer::new(&mut src);
        let mut dtd = Dtd::new();
        dtd.parse_subset(&mut lexer, true).unwrap();
        dtd
    }

    #[test]
    fn parses_element_with_sequence_content() {
        let dtd = parse_internal("<!ELEMENT a (b, c*)>");
        let decl = dtd.elements.get("a").unwrap();
        assert_eq!(decl.content.to_string(), "(b,c*)");
    }

    #[test]
    fn parses_mixed_content() {
        let dtd = parse_internal("<!ELEMENT p (#PCDATA|b)*>");
        match &dtd.elements.get("p").unwrap().content {
            ContentModel::Mixed(names) => assert_eq!(names, &vec!["b".to_string()]),
            other => panic!("expected mixed content, got {:?}", other),
        }
    }

    #[test]
    fn parses_attlist_with_default_and_enumeration() {
        let dtd = parse_internal(
            "<!ATTLIST e x CDATA \"def\" y (a|b) #REQUIRED z ID #IMPLIED>",
        );
        let defs = dtd.attlists.get("e").unwrap();
        assert_eq!(defs[0].name, "x");
        assert_eq!(defs[0].default, AttDefault::Default("def".into()));
        assert_eq!(defs[1].att_type, AttType::Enumeration(vec!["a".into(), "b".into()]));
        assert_eq!(defs[1].default, AttDefault::Required);
        assert_eq!(defs[2].att_type, AttType::Id);
        assert_eq!(defs[2].default, AttDefault::Implied);
    }

    #[test]
    fn parses_internal_general_entity() {
        let dtd = parse_internal("<!ENTITY foo \"bar\">");
        assert_eq!(
            dtd.general_entities.get("foo").unwrap().value,
            EntityValue::Internal("bar".into())
        );
    }

    #[test]
    fn parses_unparsed_entity_with_ndata() {
        let dtd = parse_internal(
            "<!NOTATION gif SYSTEM \"viewer\">\n<!ENTITY img SYSTEM \"pic.gif\" NDATA gif>",
        );
        let decl = dtd.general_entities.get("img").unwrap();
        assert!(decl.is_unparsed());
        assert!(dtd.notations.contains_key("gif"));
    }

    #[test]
    fn rejects_mixed_separators_in_one_group() {
        let mut src = SourceStack::new("<!ELEMENT a (b, c | d)>", None);
        let mut lexer = Lexer::new(&mut src);
        let mut dtd = Dtd::new();
        assert!(dtd.parse_subset(&mut lexer, true).is_err());
    }

    #[test]
    fn normalizes_tabs_and_newlines_in_fixed_values() {
        assert_eq!(normalize_attribute_value("a\tb\nc"), "a b c");
    }
}
