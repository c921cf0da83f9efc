//! Per-axis node enumeration, per spec §4.8 / XPath 1.0 §2.2.
//!
//! Each function returns its axis's nodes in "axis order": document order
//! for the forward axes, reverse document order for the four reverse axes
//! (`ancestor`, `ancestor-or-self`, `preceding`, `preceding-sibling`) —
//! `Axis::is_reverse` in `ast.rs` names exactly these four. Predicate
//! proximity positions (`engine.rs`) are numbered against this order
//! directly, so getting axis order right here is load-bearing, not cosmetic.
//!
//! The namespace axis (spec §4.8) enumerates the bindings in scope at an
//! element: one namespace node per prefix visible there, walking outward
//! from the element itself to the root and keeping the nearest declaration
//! for each prefix (an inner `xmlns:p` shadows an outer one, same as
//! `resolve_namespace` in `dom/mod.rs`). Non-element nodes have no
//! namespace nodes of their own.

use crate::dom::{Document, NodeId, NodeKind};

use super::ast::Axis;

pub fn nodes_on_axis(doc: &Document, node: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::SelfAxis => vec![node],
        Axis::Child => doc.children(node).to_vec(),
        Axis::Attribute => doc.attributes(node).to_vec(),
        Axis::Namespace => namespace_axis(doc, node),
        Axis::Parent => doc.parent(node).into_iter().collect(),
        Axis::Ancestor => ancestors(doc, node),
        Axis::AncestorOrSelf => {
            let mut v = vec![node];
            v.extend(ancestors(doc, node));
            v
        }
        Axis::Descendant => descendants(doc, node),
        Axis::DescendantOrSelf => {
            let mut v = vec![node];
            v.extend(descendants(doc, node));
            v
        }
        Axis::FollowingSibling => siblings(doc, node, true),
        Axis::PrecedingSibling => siblings(doc, node, false),
        Axis::Following => following(doc, node),
        Axis::Preceding => preceding(doc, node),
    }
}

/// Only element nodes carry namespace nodes; every other node type's
/// namespace axis is empty (XPath 1.0 §2.3).
fn namespace_axis(doc: &Document, node: NodeId) -> Vec<NodeId> {
    if !matches!(doc.kind(node), NodeKind::Element { .. }) {
        return Vec::new();
    }
    let mut seen_prefixes = Vec::new();
    let mut out = Vec::new();
    let mut cur = Some(node);
    while let Some(n) = cur {
        for &ns in doc.namespace_nodes(n) {
            let prefix = match doc.kind(ns) {
                NodeKind::Namespace { prefix, .. } => prefix.clone(),
                _ => unreachable!(),
            };
            if !seen_prefixes.contains(&prefix) {
                seen_prefixes.push(prefix);
                out.push(ns);
            }
        }
        cur = doc.parent(n);
    }
    out
}

fn ancestors(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut cur = doc.parent(node);
    while let Some(n) = cur {
        out.push(n);
        cur = doc.parent(n);
    }
    out
}

fn descendants(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_descendants(doc, node, &mut out);
    out
}

fn collect_descendants(doc: &Document, node: NodeId, out: &mut Vec<NodeId>) {
    for &c in doc.children(node) {
        out.push(c);
        collect_descendants(doc, c, out);
    }
}

fn siblings(doc: &Document, node: NodeId, after: bool) -> Vec<NodeId> {
    let parent = match doc.parent(node) {
        Some(p) => p,
        None => return Vec::new(),
    };
    let children = doc.children(parent);
    let idx = match children.iter().position(|&c| c == node) {
        Some(i) => i,
        None => return Vec::new(),
    };
    if after {
        children[idx + 1..].to_vec()
    } else {
        children[..idx].iter().rev().copied().collect()
    }
}

/// All live nodes below the document root, preorder, excluding attribute
/// nodes (neither `following` nor `preceding` ever contains one).
fn document_preorder(doc: &Document) -> Vec<NodeId> {
    let mut out = Vec::new();
    fn walk(doc: &Document, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for &c in doc.children(id) {
            walk(doc, c, out);
        }
    }
    walk(doc, doc.root(), &mut out);
    out
}

fn is_ancestor_of(doc: &Document, ancestor: NodeId, node: NodeId) -> bool {
    let mut cur = doc.parent(node);
    while let Some(n) = cur {
        if n == ancestor {
            return true;
        }
        cur = doc.parent(n);
    }
    false
}

fn following(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let all = document_preorder(doc);
    let idx = all.iter().position(|&n| n == node).unwrap_or(0);
    all[idx + 1..]
        .iter()
        .copied()
        .filter(|&n| !is_ancestor_of(doc, node, n) && !matches!(doc.kind(n), NodeKind::Attribute(_)))
        .collect()
}

fn preceding(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let all = document_preorder(doc);
    let idx = all.iter().position(|&n| n == node).unwrap_or(0);
    all[..idx]
        .iter()
        .rev()
        .copied()
        .filter(|&n| !is_ancestor_of(doc, n, node) && !matches!(doc.kind(n), NodeKind::Attribute(_)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qname::QName;

    fn sample() -> (Document, NodeId, NodeId, NodeId, NodeId) {
        // <a><b><c/></b><d/></a>
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element(QName::new("a"), "");
        doc.append_child(root, a).unwrap();
        let b = doc.create_element(QName::new("b"), "");
        doc.append_child(a, b).unwrap();
        let c = doc.create_element(QName::new("c"), "");
        doc.append_child(b, c).unwrap();
        let d = doc.create_element(QName::new("d"), "");
        doc.append_child(a, d).unwrap();
        (doc, a, b, c, d)
    }

    #[test]
    fn child_axis_is_document_order() {
        let (doc, a, b, _c, d) = sample();
        assert_eq!(nodes_on_axis(&doc, a, Axis::Child), vec![b, d]);
    }

    #[test]
    fn descendant_axis_is_preorder() {
        let (doc, a, b, c, d) = sample();
        assert_eq!(nodes_on_axis(&doc, a, Axis::Descendant), vec![b, c, d]);
    }

    #[test]
    fn ancestor_axis_is_nearest_first() {
        let (doc, a, _b, c, _d) = sample();
        assert_eq!(nodes_on_axis(&doc, c, Axis::Ancestor), vec![doc.parent(c).unwrap(), a, doc.root()]);
    }

    #[test]
    fn following_excludes_descendants_and_attributes() {
        let (doc, _a, b, c, d) = sample();
        assert_eq!(nodes_on_axis(&doc, b, Axis::Following), vec![d]);
        assert_eq!(nodes_on_axis(&doc, c, Axis::FollowingSibling), Vec::<NodeId>::new());
    }

    #[test]
    fn preceding_sibling_is_nearest_first() {
        let (doc, _a, b, _c, d) = sample();
        assert_eq!(nodes_on_axis(&doc, d, Axis::PrecedingSibling), vec![b]);
    }

    #[test]
    fn namespace_axis_collects_in_scope_bindings_nearest_first() {
        // <a xmlns:p='urn:outer'><b xmlns:p='urn:inner' xmlns:q='urn:q'/></a>
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element(QName::new("a"), "");
        doc.append_child(root, a).unwrap();
        doc.add_namespace(a, Some("p".into()), "urn:outer".into()).unwrap();
        let b = doc.create_element(QName::new("b"), "");
        doc.append_child(a, b).unwrap();
        doc.add_namespace(b, Some("p".into()), "urn:inner".into()).unwrap();
        doc.add_namespace(b, Some("q".into()), "urn:q".into()).unwrap();

        let nodes = nodes_on_axis(&doc, b, Axis::Namespace);
        assert_eq!(nodes.len(), 2, "inner 'p' shadows outer 'p', leaving p and q");
        let bindings: Vec<(Option<String>, String)> = nodes
            .iter()
            .map(|&n| match doc.kind(n) {
                NodeKind::Namespace { prefix, uri } => (prefix.clone(), uri.clone()),
                _ => panic!("expected a namespace node"),
            })
            .collect();
        assert!(bindings.contains(&(Some("p".to_string()), "urn:inner".to_string())));
        assert!(bindings.contains(&(Some("q".to_string()), "urn:q".to_string())));

        assert_eq!(nodes_on_axis(&doc, a, Axis::Namespace).len(), 1);
    }
}
