//! XPath 1.0, per spec §4.8 and §6.
//!
//! `evaluate` is the one-shot entry point `dom::Document::find`/`find_first`
//! use; `XPath` is the compile-once, evaluate-many surface for callers who
//! run the same expression against many context nodes (spec §6.4) — both
//! share the same `ast`/`engine` machinery, the only difference being
//! whether parsing happens on every call or once up front.

mod ast;
mod axes;
pub mod engine;
mod functions;
mod lexer;
mod parser;

use std::collections::HashMap;

use crate::dom::{Document, NodeId, NodeKind};

pub use engine::Value;

/// XPath-specific failures, kept separate from `crate::Error` (which embeds
/// this as `Error::XPath`) since a compiled `XPath` object can be built and
/// evaluated independently of any document parse.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum XPathError {
    #[error("XPathSyntax: {0}")]
    Syntax(String),
    #[error("XPathType: {0}")]
    Type(String),
    #[error("XPathUndefinedVariable: ${0}")]
    UndefinedVariable(String),
    #[error("XPathUndefinedFunction: {0}()")]
    UndefinedFunction(String),
}

/// Parses and evaluates `expr` once against `context`, per spec §6.3.
pub fn evaluate(doc: &Document, context: NodeId, expr: &str, variables: &HashMap<String, Value>) -> Result<Value, XPathError> {
    let ast = parser::parse(expr)?;
    let ctx = engine::EvalContext::top(doc, context, variables);
    engine::eval_expr(&ast, &ctx)
}

/// A parsed expression, compiled once and evaluated against any number of
/// (document, context node) pairs — spec §6.4's "compiled XPath object".
#[derive(Debug)]
pub struct XPath {
    expr: ast::Expr,
}

impl XPath {
    pub fn compile(src: &str) -> Result<XPath, XPathError> {
        Ok(XPath { expr: parser::parse(src)? })
    }

    pub fn evaluate(&self, doc: &Document, context: NodeId) -> Result<Value, XPathError> {
        let empty = HashMap::new();
        let ctx = engine::EvalContext::top(doc, context, &empty);
        engine::eval_expr(&self.expr, &ctx)
    }

    /// Like `evaluate`, but filters the resulting node-set down to element
    /// nodes only — the common case for callers that treat a compiled path
    /// as a query over the element tree and have no use for attribute,
    /// text, comment, or PI hits.
    pub fn evaluate_elements(&self, doc: &Document, context: NodeId) -> Result<Vec<NodeId>, XPathError> {
        let nodes = self.evaluate(doc, context)?.into_node_set()?;
        Ok(nodes.into_iter().filter(|&n| matches!(doc.kind(n), NodeKind::Element { .. })).collect())
    }

    /// True if `node` is a member of the node-set this expression selects
    /// when evaluated with the document root as its context — the usual
    /// "does this node match this pattern" question a compiled path is
    /// used to answer (spec §6.4).
    pub fn matches(&self, doc: &Document, node: NodeId) -> Result<bool, XPathError> {
        let nodes = self.evaluate(doc, doc.root())?.into_node_set()?;
        Ok(nodes.contains(&node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qname::QName;

    fn doc_with_children() -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element(QName::new("a"), "");
        doc.append_child(root, a).unwrap();
        for name in ["b", "c", "b"] {
            let e = doc.create_element(QName::new(name), "");
            doc.append_child(a, e).unwrap();
        }
        (doc, a)
    }

    #[test]
    fn evaluates_a_simple_child_path() {
        let (doc, a) = doc_with_children();
        let nodes = evaluate(&doc, a, "b", &HashMap::new()).unwrap().into_node_set().unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn position_and_last_work_inside_predicates() {
        let (doc, a) = doc_with_children();
        let nodes = evaluate(&doc, a, "*[position() = last()]", &HashMap::new()).unwrap().into_node_set().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(doc.element_qname(nodes[0]).unwrap().local, "b");
    }

    #[test]
    fn compiled_xpath_matches_and_filters_elements() {
        let (doc, a) = doc_with_children();
        let xpath = XPath::compile("a/b").unwrap();
        let elements = xpath.evaluate_elements(&doc, doc.root()).unwrap();
        assert_eq!(elements.len(), 2);
        assert!(xpath.matches(&doc, elements[0]).unwrap());
        assert!(!xpath.matches(&doc, a).unwrap());
    }

    #[test]
    fn abbreviated_and_full_axis_syntax_agree() {
        let (doc, a) = doc_with_children();
        let short = evaluate(&doc, a, "@*", &HashMap::new());
        let long = evaluate(&doc, a, "attribute::*", &HashMap::new());
        assert_eq!(short.unwrap().into_node_set().unwrap(), long.unwrap().into_node_set().unwrap());
    }

    #[test]
    fn undefined_variable_is_reported() {
        let (doc, a) = doc_with_children();
        let err = evaluate(&doc, a, "$missing", &HashMap::new()).unwrap_err();
        assert!(matches!(err, XPathError::UndefinedVariable(_)));
    }

    #[test]
    fn syntax_error_on_malformed_expression() {
        assert!(parser::parse("a[").is_err());
    }

    #[test]
    fn wrong_arity_fails_at_compile_time() {
        let err = XPath::compile("count()").unwrap_err();
        assert!(matches!(err, XPathError::Syntax(_)), "expected a Syntax error, got {:?}", err);
    }

    #[test]
    fn unknown_function_fails_at_compile_time() {
        let err = XPath::compile("bogus(1)").unwrap_err();
        assert!(matches!(err, XPathError::Syntax(_)), "expected a Syntax error, got {:?}", err);
    }
}
