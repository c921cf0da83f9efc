//! Qualified and expanded names, per GLOSSARY.
//!
//! A `QName` is syntax (`prefix:local` as it appeared in the source); an
//! `ExpandedName` is semantics (a resolved namespace URI paired with a
//! local name). The parser turns the former into the latter using the
//! namespace bindings in scope at the point of use.

use std::fmt;

/// A name as written: an optional prefix plus a local part.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(local: impl Into<String>) -> Self {
        QName { prefix: None, local: local.into() }
    }

    pub fn with_prefix(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        QName { prefix: Some(prefix.into()), local: local.into() }
    }

    /// Splits `"prefix:local"` or `"local"` into a `QName`.
    pub fn parse(raw: &str) -> QName {
        match raw.find(':') {
            Some(i) => QName::with_prefix(&raw[..i], &raw[i + 1..]),
            None => QName::new(raw),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{}:{}", p, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// A namespace URI + local name pair — the identity XPath and DOM equality
/// actually compare on (prefixes are source-text sugar, not identity).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct ExpandedName {
    pub uri: String,
    pub local: String,
}

impl ExpandedName {
    pub fn new(uri: impl Into<String>, local: impl Into<String>) -> Self {
        ExpandedName { uri: uri.into(), local: local.into() }
    }

    pub fn no_namespace(local: impl Into<String>) -> Self {
        ExpandedName { uri: String::new(), local: local.into() }
    }

    pub fn has_namespace(&self) -> bool {
        !self.uri.is_empty()
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_namespace() {
            write!(f, "{{{}}}{}", self.uri, self.local)
        } else {
            write!(f, "{}", self.local)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_and_bare_names() {
        assert_eq!(QName::parse("y:k"), QName::with_prefix("y", "k"));
        assert_eq!(QName::parse("k"), QName::new("k"));
    }
}
