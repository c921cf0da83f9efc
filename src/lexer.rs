//! The two-mode lexer described in spec §4.2.
//!
//! `Lexer::next_markup` and `Lexer::next_content` are the two entry
//! points; the parser decides, at each position, which grammar applies
//! and calls the matching one. Name-character classification mirrors
//! the teacher crate's `XmlCharExt` (`examples/RazrFalcon-roxmltree/src/tokenizer.rs`),
//! which already encodes the XML 1.0 `NameStartChar`/`NameChar` ranges;
//! everything else here is new, since the teacher's tokenizer fuses
//! lexing and parsing into one pass and spec.md wants them kept apart.

use crate::error::{Error, Result, TextPos};
use crate::source::SourceStack;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Eof,
    Whitespace,
    Name(String),
    Nmtoken(String),
    QuotedString(String),
    ParamEntityRef(String),
    Eq,
    /// One of the DTD punctuation characters `( ) [ ] , | + * ? #`.
    Punct(char),
    XmlDeclStart,
    ProcessingInstruction(String, Option<String>),
    Comment(String),
    DoctypeStart,
    ElementDeclStart,
    AttlistDeclStart,
    EntityDeclStart,
    NotationDeclStart,
    ConditionalStart,
    SectionClose,
    EndTagOpen,
    TagOpen,
    TagClose,
    EmptyTagClose,
    CharData(String),
    CData(String),
    EntityRef(String),
    CharRef(u32),
}

pub trait CharExt {
    fn is_name_start(self) -> bool;
    fn is_name_char(self) -> bool;
    fn is_xml_space(self) -> bool;
}

impl CharExt for char {
    fn is_name_start(self) -> bool {
        if (self as u32) <= 128 {
            return matches!(self as u8, b'A'..=b'Z' | b'a'..=b'z' | b':' | b'_');
        }
        matches!(self as u32,
            0x0000C0..=0x0000D6
            | 0x0000D8..=0x0000F6
            | 0x0000F8..=0x0002FF
            | 0x000370..=0x00037D
            | 0x00037F..=0x001FFF
            | 0x00200C..=0x00200D
            | 0x002070..=0x00218F
            | 0x002C00..=0x002FEF
            | 0x003001..=0x00D7FF
            | 0x00F900..=0x00FDCF
            | 0x00FDF0..=0x00FFFD
            | 0x010000..=0x0EFFFF)
    }

    fn is_name_char(self) -> bool {
        if self.is_name_start() {
            return true;
        }
        if (self as u32) <= 128 {
            return matches!(self as u8, b'0'..=b'9' | b'-' | b'.');
        }
        matches!(self as u32, 0x0000B7
            | 0x000300..=0x00036F
            | 0x00203F..=0x002040)
    }

    fn is_xml_space(self) -> bool {
        matches!(self, ' ' | '\t' | '\n' | '\r')
    }
}

/// A character source with one character of lookahead, used for both
/// markup-mode and content-mode scanning.
pub struct Lexer<'s> {
    src: &'s mut SourceStack,
    /// A single buffered markup token, so DTD-grammar helpers can peek one
    /// token ahead without the underlying character stream supporting
    /// pushback. Never holds `Token::Whitespace` — `peek_markup` drains
    /// those itself, matching `next_markup`'s own skip-then-return-real-token
    /// shape for callers that only ever call it directly.
    pending: Option<Token>,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s mut SourceStack) -> Self {
        Lexer { src, pending: None }
    }

    pub fn pos(&self) -> TextPos {
        self.src.pos()
    }

    fn err(&self, msg: impl Into<String>) -> Error {
        Error::NotWellFormed(self.pos(), msg.into())
    }

    fn peek(&mut self) -> Option<char> {
        self.src.peek()
    }

    fn bump(&mut self) -> Option<char> {
        self.src.next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn skip_whitespace(&mut self) -> bool {
        let mut any = false;
        while let Some(c) = self.peek() {
            if c.is_xml_space() {
                self.bump();
                any = true;
            } else {
                break;
            }
        }
        any
    }

    fn scan_name(&mut self) -> Result<String> {
        let mut s = String::new();
        match self.peek() {
            Some(c) if c.is_name_start() => {
                s.push(c);
                self.bump();
            }
            _ => return Err(self.err("expected a name")),
        }
        while let Some(c) = self.peek() {
            if c.is_name_char() {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(s)
    }

    fn scan_quoted(&mut self) -> Result<String> {
        let quote = match self.bump() {
            Some(c @ ('"' | '\'')) => c,
            _ => return Err(self.err("expected a quoted string")),
        };
        let mut s = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => break,
                Some('<') => return Err(self.err("'<' is not allowed in an attribute value")),
                Some(c) => s.push(c),
                None => return Err(Error::UnexpectedEof(self.pos())),
            }
        }
        Ok(s)
    }

    /// Markup-mode: recognizes declarations, tags, comments, PIs, CDATA
    /// and conditional-section markers plus DTD punctuation.
    pub fn next_markup(&mut self) -> Result<Token> {
        if let Some(t) = self.pending.take() {
            return Ok(t);
        }
        if self.skip_whitespace() {
            return Ok(Token::Whitespace);
        }
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        match c {
            '<' => self.lex_markup_open(),
            '>' => {
                self.bump();
                Ok(Token::TagClose)
            }
            '/' => {
                self.bump();
                if self.eat('>') {
                    Ok(Token::EmptyTagClose)
                } else {
                    Err(self.err("expected '/>'"))
                }
            }
            '=' => {
                self.bump();
                Ok(Token::Eq)
            }
            '"' | '\'' => Ok(Token::QuotedString(self.scan_quoted()?)),
            '%' => {
                self.bump();
                let name = self.scan_name()?;
                if self.eat(';') {
                    Ok(Token::ParamEntityRef(name))
                } else {
                    Err(self.err("expected ';' after parameter-entity name"))
                }
            }
            ']' => {
                self.bump();
                if self.eat(']') && self.eat('>') {
                    Ok(Token::SectionClose)
                } else {
                    Ok(Token::Punct(']'))
                }
            }
            '(' | ')' | '[' | ',' | '|' | '+' | '*' | '?' | '#' | ';' => {
                self.bump();
                Ok(Token::Punct(c))
            }
            c if c.is_name_start() => {
                let name = self.scan_name()?;
                Ok(Token::Nmtoken(name))
            }
            _ => Err(self.err(format!("unexpected character '{}'", c))),
        }
    }

    fn lex_markup_open(&mut self) -> Result<Token> {
        self.bump(); // consume '<'
        match self.peek() {
            Some('?') => {
                self.bump();
                self.lex_pi()
            }
            Some('!') => {
                self.bump();
                self.lex_bang()
            }
            Some('/') => {
                self.bump();
                Ok(Token::EndTagOpen)
            }
            _ => Ok(Token::TagOpen),
        }
    }

    fn lex_pi(&mut self) -> Result<Token> {
        let target = self.scan_name()?;
        if target.eq_ignore_ascii_case("xml") {
            return Ok(Token::XmlDeclStart);
        }
        let had_space = self.skip_whitespace();
        let mut data = String::new();
        loop {
            match self.bump() {
                Some('?') if self.peek() == Some('>') => {
                    self.bump();
                    break;
                }
                Some(c) => data.push(c),
                None => return Err(Error::UnexpectedEof(self.pos())),
            }
        }
        let data = if data.is_empty() && !had_space {
            None
        } else {
            Some(data)
        };
        Ok(Token::ProcessingInstruction(target, data))
    }

    fn lex_bang(&mut self) -> Result<Token> {
        match self.peek() {
            Some('-') => {
                self.bump();
                if !self.eat('-') {
                    return Err(self.err("expected '<!--'"));
                }
                self.lex_comment()
            }
            Some('[') => {
                self.bump();
                Ok(Token::ConditionalStart)
            }
            Some('D') | Some('d') => {
                let name = self.scan_name()?;
                if name == "DOCTYPE" {
                    Ok(Token::DoctypeStart)
                } else {
                    Err(self.err("expected 'DOCTYPE'"))
                }
            }
            Some('E') | Some('e') => {
                let name = self.scan_name()?;
                match name.as_str() {
                    "ELEMENT" => Ok(Token::ElementDeclStart),
                    "ENTITY" => Ok(Token::EntityDeclStart),
                    _ => Err(self.err(format!("unexpected declaration '{}'", name))),
                }
            }
            Some('A') | Some('a') => {
                let name = self.scan_name()?;
                if name == "ATTLIST" {
                    Ok(Token::AttlistDeclStart)
                } else {
                    Err(self.err("expected 'ATTLIST'"))
                }
            }
            Some('N') | Some('n') => {
                let name = self.scan_name()?;
                if name == "NOTATION" {
                    Ok(Token::NotationDeclStart)
                } else {
                    Err(self.err("expected 'NOTATION'"))
                }
            }
            _ => Err(self.err("malformed markup declaration")),
        }
    }

    fn lex_comment(&mut self) -> Result<Token> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('-') if self.peek() == Some('-') => {
                    self.bump();
                    if self.eat('>') {
                        break;
                    }
                    return Err(self.err("'--' is not allowed inside a comment"));
                }
                Some(c) => text.push(c),
                None => return Err(Error::UnexpectedEof(self.pos())),
            }
        }
        Ok(Token::Comment(text))
    }

    /// Called by the parser right after a `Token::ConditionalStart` to
    /// distinguish `<![CDATA[` from `<![INCLUDE[` / `<![IGNORE[`, since
    /// that distinction needs a name lookup the lexer alone can't make
    /// (CDATA is a keyword only valid in content position).
    pub fn try_cdata_after_bracket(&mut self) -> Result<Option<Token>> {
        // Peek up to 5 chars for "CDATA".
        let mut consumed = String::new();
        for _ in 0..5 {
            match self.peek() {
                Some(c) => {
                    consumed.push(c);
                    self.bump();
                }
                None => break,
            }
        }
        if consumed == "CDATA" && self.eat('[') {
            let text = self.scan_cdata_body()?;
            return Ok(Some(Token::CData(text)));
        }
        Err(self.err(format!("expected 'CDATA[', found '{}'", consumed)))
    }

    fn scan_cdata_body(&mut self) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(']') if self.peek() == Some(']') => {
                    let save_checkpoint = text.len();
                    self.bump();
                    if self.eat('>') {
                        break;
                    }
                    text.truncate(save_checkpoint);
                    text.push(']');
                    text.push(']');
                }
                Some(c) => text.push(c),
                None => return Err(Error::UnexpectedEof(self.pos())),
            }
        }
        Ok(text)
    }

    /// Content-mode: character data, references, and the start of nested
    /// markup (the lexer hands back `TagOpen`/`EndTagOpen`/comment/PI/CDATA
    /// tokens exactly as in markup mode so the parser can share one
    /// dispatch for "what does `<` introduce here").
    pub fn next_content(&mut self) -> Result<Token> {
        match self.peek() {
            None => Ok(Token::Eof),
            Some('<') => self.lex_markup_open_in_content(),
            Some('&') => self.lex_reference(),
            _ => self.lex_char_data(),
        }
    }

    fn lex_markup_open_in_content(&mut self) -> Result<Token> {
        self.bump();
        match self.peek() {
            Some('!') => {
                self.bump();
                match self.peek() {
                    Some('-') => {
                        self.bump();
                        if !self.eat('-') {
                            return Err(self.err("expected '<!--'"));
                        }
                        self.lex_comment()
                    }
                    Some('[') => {
                        self.bump();
                        match self.try_cdata_after_bracket()? {
                            Some(tok) => Ok(tok),
                            None => Err(self.err("expected 'CDATA['")),
                        }
                    }
                    _ => Err(self.err("unexpected '<!' in content")),
                }
            }
            Some('?') => {
                self.bump();
                self.lex_pi()
            }
            Some('/') => {
                self.bump();
                Ok(Token::EndTagOpen)
            }
            _ => Ok(Token::TagOpen),
        }
    }

    fn lex_reference(&mut self) -> Result<Token> {
        self.bump(); // '&'
        if self.eat('#') {
            let hex = self.eat('x');
            let mut digits = String::new();
            while let Some(c) = self.peek() {
                if (hex && c.is_ascii_hexdigit()) || (!hex && c.is_ascii_digit()) {
                    digits.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            if !self.eat(';') {
                return Err(self.err("expected ';' after character reference"));
            }
            let radix = if hex { 16 } else { 10 };
            let code = u32::from_str_radix(&digits, radix)
                .map_err(|_| self.err("malformed character reference"))?;
            if !is_xml_char_codepoint(code) {
                return Err(self.err(format!("character reference U+{:X} is not valid XML", code)));
            }
            Ok(Token::CharRef(code))
        } else {
            let name = self.scan_name().map_err(|_| self.err("malformed entity reference"))?;
            if !self.eat(';') {
                return Err(self.err("expected ';' after entity reference"));
            }
            Ok(Token::EntityRef(name))
        }
    }

    /// Pushes a previously-read token back, so the next `next_markup` call
    /// returns it again. Lets a parser production peek past a delimiter
    /// token before committing to a grammar branch, without the underlying
    /// character stream needing to support pushback itself.
    pub fn push_back(&mut self, token: Token) {
        self.pending = Some(token);
    }

    /// The base URI of the currently active source frame (the document's
    /// own, or an externally-resolved DTD subset/entity's), for resolving
    /// further relative system identifiers against.
    pub fn base_uri(&self) -> Option<&std::path::Path> {
        self.src.base_uri().map(|p| p.as_path())
    }

    /// The next non-whitespace markup token, without consuming it.
    fn peek_markup(&mut self) -> Result<Token> {
        loop {
            match &self.pending {
                Some(Token::Whitespace) => {
                    self.pending = None;
                }
                Some(t) => return Ok(t.clone()),
                None => {
                    let t = self.next_markup()?;
                    if matches!(t, Token::Whitespace) {
                        continue;
                    }
                    self.pending = Some(t);
                }
            }
        }
    }

    /// Used by the DTD grammar, which is written in terms of "expect the
    /// next significant token"; whitespace is insignificant there except as
    /// a separator.
    pub fn peek_token(&mut self) -> Result<Token> {
        self.peek_markup()
    }

    pub fn expect_name(&mut self) -> Result<String> {
        loop {
            match self.next_markup()? {
                Token::Whitespace => continue,
                Token::Nmtoken(n) => return Ok(n),
                other => return Err(self.err(format!("expected a name, found {:?}", other))),
            }
        }
    }

    /// DTD `Nmtoken`s are lexed identically to `Name`s here (both come from
    /// `scan_name`); kept as a distinct method because the DTD grammar
    /// distinguishes the two productions even though this lexer's character
    /// classes don't.
    pub fn expect_nmtoken(&mut self) -> Result<String> {
        self.expect_name()
    }

    pub fn expect_quoted(&mut self) -> Result<String> {
        loop {
            match self.next_markup()? {
                Token::Whitespace => continue,
                Token::QuotedString(s) => return Ok(s),
                other => return Err(self.err(format!("expected a quoted string, found {:?}", other))),
            }
        }
    }

    pub fn expect_tag_close(&mut self) -> Result<()> {
        loop {
            match self.next_markup()? {
                Token::Whitespace => continue,
                Token::TagClose => return Ok(()),
                other => return Err(self.err(format!("expected '>', found {:?}", other))),
            }
        }
    }

    pub fn try_eat_tag_close(&mut self) -> Result<bool> {
        if matches!(self.peek_markup()?, Token::TagClose) {
            self.pending = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn expect_punct(&mut self, c: char) -> Result<()> {
        loop {
            match self.next_markup()? {
                Token::Whitespace => continue,
                Token::Punct(p) if p == c => return Ok(()),
                other => return Err(self.err(format!("expected '{}', found {:?}", c, other))),
            }
        }
    }

    pub fn try_eat_punct(&mut self, c: char) -> Result<bool> {
        if matches!(self.peek_markup()?, Token::Punct(p) if p == c) {
            self.pending = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consumes a specific keyword-shaped `Nmtoken` (`PUBLIC`, `SYSTEM`,
    /// `NDATA`, …) if it's next, leaving the stream untouched otherwise.
    pub fn try_eat_nmtoken(&mut self, word: &str) -> Result<bool> {
        if matches!(self.peek_markup()?, Token::Nmtoken(ref n) if n == word) {
            self.pending = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consumes a `#PCDATA` marker if next (a `Punct('#')` immediately
    /// followed by the `Nmtoken` `"PCDATA"`).
    pub fn try_eat_pcdata(&mut self) -> Result<bool> {
        if !matches!(self.peek_markup()?, Token::Punct('#')) {
            return Ok(false);
        }
        self.pending = None;
        match self.next_markup()? {
            Token::Nmtoken(n) if n == "PCDATA" => Ok(true),
            other => Err(self.err(format!("expected 'PCDATA' after '#', found {:?}", other))),
        }
    }

    /// Pushes a parameter- or general-entity's replacement text as a fresh
    /// source frame, reporting the reference's own position on recursion.
    pub fn push_entity_text(&mut self, name: &str, replacement: &str) -> Result<()> {
        let pos = self.pos();
        self.src.push_entity(name, replacement, pos)
    }

    /// Skips an `IGNORE`d conditional section's body, tracking nested
    /// `<![…]]>` pairs so an inner conditional section's own close doesn't
    /// end the outer one early.
    pub fn skip_ignored_section(&mut self) -> Result<()> {
        let mut depth = 1u32;
        loop {
            match self.next_markup()? {
                Token::ConditionalStart => depth += 1,
                Token::SectionClose => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Token::Eof => return Err(Error::UnexpectedEof(self.pos())),
                _ => {}
            }
        }
    }

    fn lex_char_data(&mut self) -> Result<Token> {
        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some('<') | Some('&') => break,
                Some(']') => {
                    // `]]>` is forbidden in character data (spec §4.2).
                    let checkpoint = text.len();
                    text.push(self.bump().unwrap());
                    if self.peek() == Some(']') {
                        text.push(self.bump().unwrap());
                        if self.peek() == Some('>') {
                            return Err(self.err("literal ']]>' is not allowed in content"));
                        }
                    }
                    let _ = checkpoint;
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
        Ok(Token::CharData(text))
    }
}

/// XML 1.0 `Char` production, used to validate numeric character references.
pub fn is_xml_char_codepoint(code: u32) -> bool {
    matches!(code,
        0x9 | 0xA | 0xD
        | 0x20..=0xD7FF
        | 0xE000..=0xFFFD
        | 0x10000..=0x10FFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_content(input: &str) -> Vec<Token> {
        let mut src = SourceStack::new(input, None);
        let mut lex = Lexer::new(&mut src);
        let mut out = Vec::new();
        loop {
            let t = lex.next_content().unwrap();
            let is_eof = t == Token::Eof;
            out.push(t);
            if is_eof {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_char_data_and_tag_open() {
        let toks = tokens_content("hi<b>");
        assert_eq!(toks[0], Token::CharData("hi".into()));
        assert_eq!(toks[1], Token::TagOpen);
    }

    #[test]
    fn lexes_entity_and_char_refs() {
        let toks = tokens_content("&amp;&#65;&#x41;");
        assert_eq!(toks[0], Token::EntityRef("amp".into()));
        assert_eq!(toks[1], Token::CharRef(65));
        assert_eq!(toks[2], Token::CharRef(0x41));
    }

    #[test]
    fn rejects_literal_section_close_in_content() {
        let mut src = SourceStack::new("a]]>b", None);
        let mut lex = Lexer::new(&mut src);
        assert!(lex.next_content().is_err());
    }

    #[test]
    fn lexes_markup_mode_tag_and_attribute() {
        let mut src = SourceStack::new("<e a='1'>", None);
        let mut lex = Lexer::new(&mut src);
        assert_eq!(lex.next_markup().unwrap(), Token::TagOpen);
        assert_eq!(lex.next_markup().unwrap(), Token::Nmtoken("e".into()));
        lex.next_markup().unwrap(); // whitespace
        assert_eq!(lex.next_markup().unwrap(), Token::Nmtoken("a".into()));
        assert_eq!(lex.next_markup().unwrap(), Token::Eq);
        assert_eq!(lex.next_markup().unwrap(), Token::QuotedString("1".into()));
        assert_eq!(lex.next_markup().unwrap(), Token::TagClose);
    }

    #[test]
    fn lexes_comment() {
        let mut src = SourceStack::new("<!-- hi -->", None);
        let mut lex = Lexer::new(&mut src);
        assert_eq!(lex.next_markup().unwrap(), Token::Comment(" hi ".into()));
    }

    #[test]
    fn lexes_processing_instruction() {
        let mut src = SourceStack::new("<?t data?>", None);
        let mut lex = Lexer::new(&mut src);
        assert_eq!(
            lex.next_markup().unwrap(),
            Token::ProcessingInstruction("t".into(), Some("data".into()))
        );
    }

    #[test]
    fn lexes_cdata_section_in_content() {
        let mut src = SourceStack::new("<![CDATA[a]]b]]>", None);
        let mut lex = Lexer::new(&mut src);
        assert_eq!(lex.next_content().unwrap(), Token::CData("a]]b".into()));
    }
}
