//! Expression evaluation: the `Value` object model (XPath 1.0's four
//! types plus its conversion rules) and the tree-walking evaluator that
//! turns an `ast::Expr` into one, per spec §4.8.

use std::collections::HashMap;

use crate::dom::{Document, NodeId, NodeKind};

use super::ast::{Axis, BinOp, Expr, NodeTest, PathExpr, PathStart, Step};
use super::{axes, functions, XPathError};

/// An XPath 1.0 value. `NodeSet` is always kept sorted in document order
/// with duplicates removed, per spec §4.8 — every constructor that can
/// produce one (`eval_step`, `functions::id`) routes through
/// `sort_unique_nodeset` rather than trusting callers to do it themselves.
#[derive(Clone, Debug)]
pub enum Value {
    NodeSet(Vec<NodeId>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::NodeSet(v) => !v.is_empty(),
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    pub fn to_number(&self, doc: &Document) -> f64 {
        match self {
            Value::NodeSet(_) => string_to_number(&self.to_xpath_string(doc)),
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
        }
    }

    pub fn to_xpath_string(&self, doc: &Document) -> String {
        match self {
            Value::NodeSet(v) => v.first().map(|n| doc.str(*n)).unwrap_or_default(),
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
        }
    }

    pub fn into_node_set(self) -> Result<Vec<NodeId>, XPathError> {
        match self {
            Value::NodeSet(v) => Ok(v),
            other => Err(XPathError::Type(format!("expected a node-set, found {}", other.type_name()))),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::NodeSet(_) => "node-set",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }
}

fn string_to_number(s: &str) -> f64 {
    s.trim().parse().unwrap_or(f64::NAN)
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

pub fn sort_unique_nodeset(doc: &Document, mut nodes: Vec<NodeId>) -> Vec<NodeId> {
    let order = doc.document_order();
    nodes.sort_by_key(|n| order.get(n).copied().unwrap_or(u64::MAX));
    nodes.dedup();
    nodes
}

/// The state threaded through one `eval_expr` call: the dynamic context
/// node used for `position()`/`last()`/relative steps, and the original
/// context node the expression was evaluated against, which fixes the
/// in-scope namespace declarations used to resolve a name test's prefix
/// (XPath prefixes are resolved lexically, not against whatever node a
/// step's axis happens to be visiting).
pub struct EvalContext<'a> {
    pub doc: &'a Document,
    pub node: NodeId,
    pub ns_node: NodeId,
    pub position: usize,
    pub size: usize,
    pub variables: &'a HashMap<String, Value>,
}

impl<'a> EvalContext<'a> {
    pub fn top(doc: &'a Document, node: NodeId, variables: &'a HashMap<String, Value>) -> Self {
        EvalContext { doc, node, ns_node: node, position: 1, size: 1, variables }
    }

    fn with_node(&self, node: NodeId, position: usize, size: usize) -> EvalContext<'a> {
        EvalContext { doc: self.doc, node, ns_node: self.ns_node, position, size, variables: self.variables }
    }
}

pub fn eval_expr(expr: &Expr, ctx: &EvalContext) -> Result<Value, XPathError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Literal(s) => Ok(Value::String(s.clone())),
        Expr::VarRef(name) => ctx
            .variables
            .get(name)
            .cloned()
            .ok_or_else(|| XPathError::UndefinedVariable(name.clone())),
        Expr::Call(name, args) => {
            let values = args.iter().map(|a| eval_expr(a, ctx)).collect::<Result<Vec<_>, _>>()?;
            functions::call(name, ctx, &values)
        }
        Expr::Negate(inner) => Ok(Value::Number(-eval_expr(inner, ctx)?.to_number(ctx.doc))),
        Expr::Binary(op, lhs, rhs) => eval_binary(*op, eval_expr(lhs, ctx)?, eval_expr(rhs, ctx)?, ctx.doc),
        Expr::Union(lhs, rhs) => {
            let mut nodes = eval_expr(lhs, ctx)?.into_node_set()?;
            nodes.extend(eval_expr(rhs, ctx)?.into_node_set()?);
            Ok(Value::NodeSet(sort_unique_nodeset(ctx.doc, nodes)))
        }
        Expr::Filter(inner, predicates) => {
            let nodes = eval_expr(inner, ctx)?.into_node_set()?;
            Ok(Value::NodeSet(apply_predicates(nodes, predicates, ctx)?))
        }
        Expr::Path(path) => Ok(Value::NodeSet(eval_path(path, ctx)?)),
    }
}

fn eval_path(path: &PathExpr, ctx: &EvalContext) -> Result<Vec<NodeId>, XPathError> {
    let mut current = match &path.start {
        PathStart::Root => vec![ctx.doc.root()],
        PathStart::Relative => vec![ctx.node],
        PathStart::Filter(inner) => eval_expr(inner, ctx)?.into_node_set()?,
    };
    for step in &path.steps {
        current = eval_step(step, &current, ctx)?;
    }
    Ok(current)
}

fn eval_step(step: &Step, input: &[NodeId], ctx: &EvalContext) -> Result<Vec<NodeId>, XPathError> {
    let mut result = Vec::new();
    for &source in input {
        let candidates: Vec<NodeId> = axes::nodes_on_axis(ctx.doc, source, step.axis)
            .into_iter()
            .filter(|&n| node_test_matches(ctx.doc, n, &step.test, step.axis, ctx.ns_node))
            .collect();
        result.extend(apply_predicates(candidates, &step.predicates, ctx)?);
    }
    Ok(sort_unique_nodeset(ctx.doc, result))
}

/// Narrows `candidates` through each predicate in turn, per spec: each
/// predicate sees the proximity position/size of the list as filtered by
/// the *previous* predicates, not the step's original candidate list.
fn apply_predicates(mut candidates: Vec<NodeId>, predicates: &[Expr], ctx: &EvalContext) -> Result<Vec<NodeId>, XPathError> {
    for pred in predicates {
        let size = candidates.len();
        let mut kept = Vec::new();
        for (i, &cand) in candidates.iter().enumerate() {
            let pred_ctx = ctx.with_node(cand, i + 1, size);
            let v = eval_expr(pred, &pred_ctx)?;
            let matches = match v {
                Value::Number(n) => n == (i + 1) as f64,
                other => other.to_boolean(),
            };
            if matches {
                kept.push(cand);
            }
        }
        candidates = kept;
    }
    Ok(candidates)
}

fn node_test_matches(doc: &Document, node: NodeId, test: &NodeTest, axis: Axis, ns_node: NodeId) -> bool {
    match test {
        NodeTest::Node => true,
        NodeTest::Text => matches!(doc.kind(node), NodeKind::Text(_) | NodeKind::CData(_)),
        NodeTest::Comment => matches!(doc.kind(node), NodeKind::Comment(_)),
        NodeTest::ProcessingInstruction(wanted) => match doc.kind(node) {
            NodeKind::ProcessingInstruction { target, .. } => wanted.as_deref().map_or(true, |w| w == target),
            _ => false,
        },
        NodeTest::Name { prefix, local } => match doc.kind(node) {
            NodeKind::Element { qname, uri, .. } => name_test_matches(doc, prefix, local, &qname.local, uri, ns_node),
            NodeKind::Attribute(a) => {
                matches!(axis, Axis::Attribute) && name_test_matches(doc, prefix, local, &a.qname.local, &a.uri, ns_node)
            }
            // Namespace nodes have no QName of their own; only the `*`
            // wildcard (`namespace::*`) selects them by name test.
            NodeKind::Namespace { .. } => prefix.is_none() && local == "*",
            _ => false,
        },
    }
}

/// An unprefixed name test (`foo`, not `p:foo` or `*`) matches only nodes
/// with no namespace URI — a default `xmlns` declaration never widens an
/// unprefixed test, which is a common surprise but is exactly what XPath
/// 1.0 specifies (a QName without a prefix has no namespace, full stop).
fn name_test_matches(doc: &Document, prefix: &Option<String>, local: &str, node_local: &str, node_uri: &str, ns_node: NodeId) -> bool {
    if local != "*" && local != node_local {
        return false;
    }
    match prefix {
        None => node_uri.is_empty() || local == "*",
        Some(p) => doc.resolve_namespace(ns_node, Some(p)).as_deref() == Some(node_uri),
    }
}

fn eval_binary(op: BinOp, lhs: Value, rhs: Value, doc: &Document) -> Result<Value, XPathError> {
    match op {
        BinOp::Or => Ok(Value::Boolean(lhs.to_boolean() || rhs.to_boolean())),
        BinOp::And => Ok(Value::Boolean(lhs.to_boolean() && rhs.to_boolean())),
        BinOp::Eq | BinOp::Ne => Ok(Value::Boolean(compare_equality(op, lhs, rhs, doc))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => Ok(Value::Boolean(compare_relational(op, lhs, rhs, doc))),
        BinOp::Add => Ok(Value::Number(lhs.to_number(doc) + rhs.to_number(doc))),
        BinOp::Sub => Ok(Value::Number(lhs.to_number(doc) - rhs.to_number(doc))),
        BinOp::Mul => Ok(Value::Number(lhs.to_number(doc) * rhs.to_number(doc))),
        BinOp::Div => Ok(Value::Number(lhs.to_number(doc) / rhs.to_number(doc))),
        BinOp::Mod => Ok(Value::Number(lhs.to_number(doc) % rhs.to_number(doc))),
    }
}

fn node_strings(doc: &Document, nodes: &[NodeId]) -> Vec<String> {
    nodes.iter().map(|&n| doc.str(n)).collect()
}

/// `=`/`!=` per XPath 1.0 §3.4: node-set operands compare by existential
/// quantification over string-values; a node-set against a scalar first
/// converts the scalar's type onto every node's string-value; two scalars
/// compare as booleans if either is boolean, else as numbers if either is
/// a number, else as strings.
fn compare_equality(op: BinOp, lhs: Value, rhs: Value, doc: &Document) -> bool {
    let invert = matches!(op, BinOp::Ne);
    let result = match (&lhs, &rhs) {
        (Value::NodeSet(a), Value::NodeSet(b)) => {
            let sa = node_strings(doc, a);
            let sb = node_strings(doc, b);
            sa.iter().any(|x| sb.iter().any(|y| x == y))
        }
        (Value::NodeSet(a), other) | (other, Value::NodeSet(a)) => match other {
            Value::Boolean(b) => !a.is_empty() == *b,
            Value::Number(n) => node_strings(doc, a).iter().any(|s| string_to_number(s) == *n),
            Value::String(s) => node_strings(doc, a).iter().any(|x| x == s),
            Value::NodeSet(_) => unreachable!(),
        },
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => lhs.to_boolean() == rhs.to_boolean(),
        (Value::Number(_), _) | (_, Value::Number(_)) => lhs.to_number(doc) == rhs.to_number(doc),
        _ => lhs.to_xpath_string(doc) == rhs.to_xpath_string(doc),
    };
    result != invert
}

/// `<`/`<=`/`>`/`>=` per XPath 1.0 §3.4: always a numeric comparison;
/// node-set operands existentially quantify over the numeric value of
/// each member's string-value.
fn compare_relational(op: BinOp, lhs: Value, rhs: Value, doc: &Document) -> bool {
    let cmp = |a: f64, b: f64| match op {
        BinOp::Lt => a < b,
        BinOp::Le => a <= b,
        BinOp::Gt => a > b,
        BinOp::Ge => a >= b,
        _ => unreachable!(),
    };
    match (&lhs, &rhs) {
        (Value::NodeSet(a), Value::NodeSet(b)) => {
            let na: Vec<f64> = node_strings(doc, a).iter().map(|s| string_to_number(s)).collect();
            let nb: Vec<f64> = node_strings(doc, b).iter().map(|s| string_to_number(s)).collect();
            na.iter().any(|&x| nb.iter().any(|&y| cmp(x, y)))
        }
        (Value::NodeSet(a), _) => {
            let n = rhs.to_number(doc);
            node_strings(doc, a).iter().any(|s| cmp(string_to_number(s), n))
        }
        (_, Value::NodeSet(b)) => {
            let n = lhs.to_number(doc);
            node_strings(doc, b).iter().any(|s| cmp(n, string_to_number(s)))
        }
        _ => cmp(lhs.to_number(doc), rhs.to_number(doc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qname::QName;

    #[test]
    fn number_to_string_drops_trailing_zero() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(3.5), "3.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
    }

    #[test]
    fn unprefixed_name_test_requires_no_namespace() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element(QName::new("a"), "urn:x");
        doc.append_child(root, a).unwrap();
        assert!(!name_test_matches(&doc, &None, "a", "a", "urn:x", a));
        assert!(name_test_matches(&doc, &None, "a", "a", "", a));
    }
}
