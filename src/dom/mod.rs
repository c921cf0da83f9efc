//! The mutable document tree, per spec §3 and §4.6.
//!
//! Nodes live in a flat arena (`Vec<NodeRecord>`) addressed by the `Copy`
//! handle `NodeId`, the same shape the teacher crate uses for its
//! (read-only) tree — generalized here to support detach/erase/move/clone,
//! and to give attributes their own addressable nodes so the XPath engine
//! can walk the attribute axis uniformly with everything else.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::qname::QName;

/// An opaque handle to a node. Stable across mutation of *other* nodes;
/// invalidated only for a node that has itself been erased.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
pub struct AttributeData {
    pub qname: QName,
    pub uri: String,
    pub value: String,
    pub is_id: bool,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    /// The document root: a singleton container for at most one element
    /// child plus any number of comments/PIs.
    Root,
    Element {
        qname: QName,
        uri: String,
        attrs: Vec<NodeId>,
        /// Namespace bindings declared on this element's start tag, as
        /// `(prefix, uri)`; `prefix: None` is the default `xmlns="..."`.
        namespaces: Vec<(Option<String>, String)>,
        /// Addressable namespace nodes, one per entry in `namespaces` above
        /// and in the same order — what the `namespace::` axis walks.
        namespace_nodes: Vec<NodeId>,
    },
    Attribute(AttributeData),
    /// A binding visible on the `namespace::` axis (spec §4.8). Not a real
    /// child: never appears in `children()`, only reachable through the
    /// axis itself.
    Namespace { prefix: Option<String>, uri: String },
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction { target: String, data: Option<String> },
}

impl NodeKind {
    pub fn is_text_like(&self) -> bool {
        matches!(self, NodeKind::Text(_) | NodeKind::CData(_))
    }
}

#[derive(Clone, Debug)]
struct NodeRecord {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Tombstoned nodes keep their slot (so outstanding `NodeId`s from
    /// before an `erase` don't alias a later, unrelated node) but are
    /// otherwise inert and excluded from traversal.
    removed: bool,
}

/// A mutable node tree plus the document-wide ID-attribute registry.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<NodeRecord>,
    root: NodeId,
    ids: HashMap<String, NodeId>,
}

impl Document {
    pub fn new() -> Self {
        let root_record = NodeRecord { kind: NodeKind::Root, parent: None, children: Vec::new(), removed: false };
        Document { nodes: vec![root_record], root: NodeId(0), ids: HashMap::new() }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeRecord { kind, parent: None, children: Vec::new(), removed: false });
        id
    }

    fn record(&self, id: NodeId) -> &NodeRecord {
        &self.nodes[id.0]
    }

    fn record_mut(&mut self, id: NodeId) -> &mut NodeRecord {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.record(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.record(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.record(id).children
    }

    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        match self.kind(id) {
            NodeKind::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId) -> Option<&AttributeData> {
        match self.kind(id) {
            NodeKind::Attribute(a) => Some(a),
            _ => None,
        }
    }

    pub fn element_qname(&self, id: NodeId) -> Option<&QName> {
        match self.kind(id) {
            NodeKind::Element { qname, .. } => Some(qname),
            _ => None,
        }
    }

    pub fn element_uri(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { uri, .. } => Some(uri.as_str()),
            _ => None,
        }
    }

    pub fn namespaces(&self, id: NodeId) -> &[(Option<String>, String)] {
        match self.kind(id) {
            NodeKind::Element { namespaces, .. } => namespaces,
            _ => &[],
        }
    }

    pub fn is_removed(&self, id: NodeId) -> bool {
        self.record(id).removed
    }

    // --- construction -----------------------------------------------------

    pub fn create_element(&mut self, qname: QName, uri: impl Into<String>) -> NodeId {
        self.push(NodeKind::Element {
            qname,
            uri: uri.into(),
            attrs: Vec::new(),
            namespaces: Vec::new(),
            namespace_nodes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn create_cdata(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::CData(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()))
    }

    pub fn create_pi(&mut self, target: impl Into<String>, data: Option<String>) -> NodeId {
        self.push(NodeKind::ProcessingInstruction { target: target.into(), data })
    }

    pub fn add_namespace(&mut self, element: NodeId, prefix: Option<String>, uri: String) -> Result<()> {
        if !matches!(self.kind(element), NodeKind::Element { .. }) {
            return Err(Error::Dom("add_namespace called on a non-element node".into()));
        }
        let ns_node = self.push(NodeKind::Namespace { prefix: prefix.clone(), uri: uri.clone() });
        self.record_mut(ns_node).parent = Some(element);
        match self.record_mut(element).kind {
            NodeKind::Element { ref mut namespaces, ref mut namespace_nodes, .. } => {
                namespaces.push((prefix, uri));
                namespace_nodes.push(ns_node);
                Ok(())
            }
            _ => unreachable!("checked above"),
        }
    }

    /// The addressable namespace nodes declared directly on `id`, parallel
    /// to `namespaces()` — what `namespace::` walks (ancestor-or-self,
    /// nearest prefix wins) rather than `children()`.
    pub fn namespace_nodes(&self, id: NodeId) -> &[NodeId] {
        match self.kind(id) {
            NodeKind::Element { namespace_nodes, .. } => namespace_nodes,
            _ => &[],
        }
    }

    /// Creates an attribute node owned by `element`, registering it in the
    /// document's ID table if `is_id` is set. Fails if `element` already has
    /// an attribute with the same resolved name, or if `is_id` collides with
    /// an existing ID value elsewhere in the document (spec §3.2).
    pub fn create_attribute(
        &mut self,
        element: NodeId,
        qname: QName,
        uri: impl Into<String>,
        value: impl Into<String>,
        is_id: bool,
    ) -> Result<NodeId> {
        let uri = uri.into();
        let value = value.into();
        let existing = self.attributes(element).to_vec();
        for a in &existing {
            if let Some(data) = self.attribute(*a) {
                if data.qname == qname && data.uri == uri {
                    return Err(Error::Dom(format!("duplicate attribute '{}'", qname)));
                }
            }
        }
        if is_id {
            if let Some(prev) = self.ids.get(&value) {
                if *prev != element {
                    return Err(Error::Dom(format!("duplicate ID value '{}'", value)));
                }
            }
        }
        let attr_id = self.push(NodeKind::Attribute(AttributeData { qname, uri, value: value.clone(), is_id }));
        self.record_mut(attr_id).parent = Some(element);
        match self.record_mut(element).kind {
            NodeKind::Element { ref mut attrs, .. } => attrs.push(attr_id),
            _ => return Err(Error::Dom("create_attribute called on a non-element node".into())),
        }
        if is_id {
            self.ids.insert(value, element);
        }
        Ok(attr_id)
    }

    pub fn get_id(&self, value: &str) -> Option<NodeId> {
        self.ids.get(value).copied()
    }

    // --- tree mutation ------------------------------------------------------

    /// Appends `child` as the last child of `parent`. `child` must not
    /// already be attached anywhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.record(child).parent.is_some() {
            return Err(Error::Dom("node is already attached to a parent".into()));
        }
        if matches!(self.kind(child), NodeKind::Attribute(_) | NodeKind::Root) {
            return Err(Error::Dom("attributes and the document root cannot be inserted as children".into()));
        }
        if matches!(self.kind(parent), NodeKind::Root) {
            let has_element_child =
                self.children(parent).iter().any(|c| matches!(self.kind(*c), NodeKind::Element { .. }));
            if has_element_child && matches!(self.kind(child), NodeKind::Element { .. }) {
                return Err(Error::Dom("the document root may have only one element child".into()));
            }
        } else if !matches!(self.kind(parent), NodeKind::Element { .. }) {
            return Err(Error::Dom("only elements and the document root may have children".into()));
        }
        self.record_mut(parent).children.push(child);
        self.record_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Detaches `node` from its parent, leaving it as an unowned subtree
    /// root. A no-op if already detached.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.record(node).parent {
            self.record_mut(parent).children.retain(|c| *c != node);
        }
        self.record_mut(node).parent = None;
    }

    /// Detaches and permanently destroys `node` and its subtree, releasing
    /// any ID registrations it held.
    pub fn erase(&mut self, node: NodeId) {
        self.detach(node);
        self.erase_subtree(node);
    }

    fn erase_subtree(&mut self, node: NodeId) {
        let children = self.record(node).children.clone();
        for c in children {
            self.erase_subtree(c);
        }
        if let NodeKind::Element { attrs, .. } = self.kind(node).clone() {
            for a in attrs {
                if let Some(data) = self.attribute(a) {
                    if data.is_id {
                        let value = data.value.clone();
                        if self.ids.get(&value) == Some(&node) {
                            self.ids.remove(&value);
                        }
                    }
                }
                self.record_mut(a).removed = true;
            }
        }
        self.record_mut(node).removed = true;
        self.record_mut(node).children.clear();
    }

    /// Produces an independent deep copy of `node`'s subtree, detached.
    pub fn clone_node(&mut self, node: NodeId) -> NodeId {
        let kind = self.kind(node).clone();
        let new_id = match kind {
            NodeKind::Root => self.push(NodeKind::Root),
            NodeKind::Element { qname, uri, namespaces, .. } => self.push(NodeKind::Element {
                qname,
                uri,
                attrs: Vec::new(),
                namespaces,
                namespace_nodes: Vec::new(),
            }),
            NodeKind::Attribute(a) => self.push(NodeKind::Attribute(a)),
            other => self.push(other),
        };
        if let NodeKind::Element { .. } = self.kind(node) {
            let attrs = self.attributes(node).to_vec();
            for a in attrs {
                let data = self.attribute(a).unwrap().clone();
                let cloned = self.push(NodeKind::Attribute(AttributeData { is_id: false, ..data }));
                self.record_mut(cloned).parent = Some(new_id);
                match self.record_mut(new_id).kind {
                    NodeKind::Element { ref mut attrs, .. } => attrs.push(cloned),
                    _ => unreachable!(),
                }
            }
            let bindings: Vec<(Option<String>, String)> = self
                .namespace_nodes(node)
                .iter()
                .map(|&n| match self.kind(n) {
                    NodeKind::Namespace { prefix, uri } => (prefix.clone(), uri.clone()),
                    _ => unreachable!(),
                })
                .collect();
            for (prefix, uri) in bindings {
                let cloned = self.push(NodeKind::Namespace { prefix, uri });
                self.record_mut(cloned).parent = Some(new_id);
                match self.record_mut(new_id).kind {
                    NodeKind::Element { ref mut namespace_nodes, .. } => namespace_nodes.push(cloned),
                    _ => unreachable!(),
                }
            }
        }
        let children = self.children(node).to_vec();
        for c in children {
            let cloned_child = self.clone_node(c);
            self.append_child(new_id, cloned_child).expect("freshly cloned node is always detached");
        }
        new_id
    }

    /// Moves `node`'s attributes and children into a brand-new detached
    /// node of the same shape, leaving `node` present but empty (spec
    /// §3.3). `node` itself keeps its identity and position in the tree.
    pub fn move_node(&mut self, node: NodeId) -> NodeId {
        let kind = self.kind(node).clone();
        match kind {
            NodeKind::Element { qname, uri, namespaces, .. } => {
                let new_id = self.push(NodeKind::Element {
                    qname,
                    uri,
                    attrs: Vec::new(),
                    namespaces: namespaces.clone(),
                    namespace_nodes: Vec::new(),
                });
                let attrs = std::mem::take(match &mut self.record_mut(node).kind {
                    NodeKind::Element { attrs, .. } => attrs,
                    _ => unreachable!(),
                });
                for a in &attrs {
                    self.record_mut(*a).parent = Some(new_id);
                }
                match self.record_mut(new_id).kind {
                    NodeKind::Element { attrs: ref mut dst, .. } => *dst = attrs,
                    _ => unreachable!(),
                }
                let namespace_nodes = std::mem::take(match &mut self.record_mut(node).kind {
                    NodeKind::Element { namespace_nodes, .. } => namespace_nodes,
                    _ => unreachable!(),
                });
                for n in &namespace_nodes {
                    self.record_mut(*n).parent = Some(new_id);
                }
                match self.record_mut(new_id).kind {
                    NodeKind::Element { namespace_nodes: ref mut dst, .. } => *dst = namespace_nodes,
                    _ => unreachable!(),
                }
                let children = std::mem::take(&mut self.record_mut(node).children);
                for c in &children {
                    self.record_mut(*c).parent = Some(new_id);
                }
                self.record_mut(new_id).children = children;
                new_id
            }
            other => {
                // Non-element nodes have no detachable contents beyond
                // their own payload; "moving" one yields an equal detached
                // copy and resets the source to an empty text-like value.
                let moved = self.push(other);
                match &mut self.record_mut(node).kind {
                    NodeKind::Text(s) | NodeKind::CData(s) | NodeKind::Comment(s) => s.clear(),
                    NodeKind::ProcessingInstruction { data, .. } => *data = None,
                    _ => {}
                }
                moved
            }
        }
    }

    // --- derived queries ------------------------------------------------

    /// Structural equality per spec §3.3: qnames compared by resolved URI,
    /// attributes as an (resolved name, value) multiset, children compared
    /// pairwise in order with like-typed nodes.
    pub fn equals(&self, a: NodeId, b: NodeId) -> bool {
        match (self.kind(a), self.kind(b)) {
            (NodeKind::Root, NodeKind::Root) => {
                let ca = self.children(a);
                let cb = self.children(b);
                ca.len() == cb.len() && ca.iter().zip(cb).all(|(x, y)| self.equals(*x, *y))
            }
            (
                NodeKind::Element { qname: qa, uri: ua, .. },
                NodeKind::Element { qname: qb, uri: ub, .. },
            ) => {
                if qa.local != qb.local || ua != ub {
                    return false;
                }
                let attrs_a = self.attributes(a);
                let attrs_b = self.attributes(b);
                if attrs_a.len() != attrs_b.len() {
                    return false;
                }
                for x in attrs_a {
                    let dx = self.attribute(*x).unwrap();
                    let found = attrs_b.iter().any(|y| {
                        let dy = self.attribute(*y).unwrap();
                        dx.qname.local == dy.qname.local && dx.uri == dy.uri && dx.value == dy.value
                    });
                    if !found {
                        return false;
                    }
                }
                let ca = self.children(a);
                let cb = self.children(b);
                ca.len() == cb.len() && ca.iter().zip(cb).all(|(x, y)| self.equals(*x, *y))
            }
            (NodeKind::Text(x), NodeKind::Text(y)) => x == y,
            (NodeKind::CData(x), NodeKind::CData(y)) => x == y,
            (NodeKind::Comment(x), NodeKind::Comment(y)) => x == y,
            (
                NodeKind::ProcessingInstruction { target: ta, data: da },
                NodeKind::ProcessingInstruction { target: tb, data: db },
            ) => ta == tb && da == db,
            _ => false,
        }
    }

    /// The concatenation of descendant text/CDATA content in document
    /// order, or an attribute's own value.
    pub fn str(&self, id: NodeId) -> String {
        if let NodeKind::Attribute(a) = self.kind(id) {
            return a.value.clone();
        }
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text(s) | NodeKind::CData(s) => out.push_str(s),
            NodeKind::Root | NodeKind::Element { .. } => {
                for c in self.children(id) {
                    self.collect_text(*c, out);
                }
            }
            _ => {}
        }
    }

    /// The nearest ancestor-or-self `xml:lang` value, or an empty string.
    pub fn lang(&self, id: NodeId) -> String {
        let mut cur = Some(id);
        while let Some(n) = cur {
            if let NodeKind::Element { .. } = self.kind(n) {
                for a in self.attributes(n) {
                    if let Some(data) = self.attribute(*a) {
                        if data.qname.prefix.as_deref() == Some("xml") && data.qname.local == "lang" {
                            return data.value.clone();
                        }
                    }
                }
            }
            cur = self.parent(n);
        }
        String::new()
    }

    /// Resolves `prefix` (`None` = default namespace) to a URI by walking
    /// ancestor elements' namespace bindings, nearest first. `"xml"` and
    /// `"xmlns"` are reserved per the XML Namespaces spec and never need a
    /// declared binding to resolve.
    pub fn resolve_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some("http://www.w3.org/XML/1998/namespace".to_string());
        }
        if prefix == Some("xmlns") {
            return Some("http://www.w3.org/2000/xmlns/".to_string());
        }
        let mut cur = Some(id);
        while let Some(n) = cur {
            for (p, uri) in self.namespaces(n) {
                if p.as_deref() == prefix {
                    return Some(uri.clone());
                }
            }
            cur = self.parent(n);
        }
        None
    }

    /// Rewrites the qname/URI of `node` (and, if `recursive`, its element
    /// descendants, and if `including_attributes`, every attribute on each
    /// rewritten element) to the given namespace. Used when relocating a
    /// subtree across documents (spec §4.6).
    pub fn move_to_namespace(
        &mut self,
        node: NodeId,
        prefix: Option<String>,
        uri: String,
        recursive: bool,
        including_attributes: bool,
    ) {
        if let NodeKind::Element { qname, uri: u, .. } = &mut self.record_mut(node).kind {
            qname.prefix = prefix.clone();
            *u = uri.clone();
        } else {
            return;
        }
        if including_attributes {
            let attrs = self.attributes(node).to_vec();
            for a in attrs {
                if let NodeKind::Attribute(data) = &mut self.record_mut(a).kind {
                    data.qname.prefix = prefix.clone();
                    data.uri = uri.clone();
                }
            }
        }
        if recursive {
            let children = self.children(node).to_vec();
            for c in children {
                if matches!(self.kind(c), NodeKind::Element { .. }) {
                    self.move_to_namespace(c, prefix.clone(), uri.clone(), true, including_attributes);
                }
            }
        }
    }

    /// Assigns each live node a preorder sequence number, for XPath's
    /// document-order comparisons. Attribute nodes sort immediately after
    /// their owning element, before its children, matching the attribute
    /// axis's place in document order by convention.
    pub fn document_order(&self) -> HashMap<NodeId, u64> {
        let mut order = HashMap::new();
        let mut next = 0u64;
        self.assign_order(self.root, &mut next, &mut order);
        order
    }

    fn assign_order(&self, id: NodeId, next: &mut u64, order: &mut HashMap<NodeId, u64>) {
        order.insert(id, *next);
        *next += 1;
        for a in self.attributes(id) {
            order.insert(*a, *next);
            *next += 1;
        }
        for c in self.children(id) {
            self.assign_order(*c, next, order);
        }
    }

    pub fn find(&self, context: NodeId, path: &str) -> Result<Vec<NodeId>> {
        let value = crate::xpath::evaluate(self, context, path, &HashMap::new())?;
        let nodes = value.into_node_set()?;
        Ok(nodes.into_iter().filter(|id| matches!(self.kind(*id), NodeKind::Element { .. })).collect())
    }

    pub fn find_first(&self, context: NodeId, path: &str) -> Result<Option<NodeId>> {
        Ok(self.find(context, path)?.into_iter().next())
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(doc: &mut Document, name: &str) -> NodeId {
        doc.create_element(QName::new(name), "")
    }

    #[test]
    fn appends_children_in_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let e = elem(&mut doc, "r");
        doc.append_child(root, e).unwrap();
        let t = doc.create_text("hi");
        doc.append_child(e, t).unwrap();
        assert_eq!(doc.children(e), &[t]);
        assert_eq!(doc.str(e), "hi");
    }

    #[test]
    fn rejects_double_attach() {
        let mut doc = Document::new();
        let root = doc.root();
        let e = elem(&mut doc, "r");
        doc.append_child(root, e).unwrap();
        let t = doc.create_text("hi");
        doc.append_child(e, t).unwrap();
        assert!(doc.append_child(e, t).is_err());
    }

    #[test]
    fn root_rejects_second_element_child() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = elem(&mut doc, "a");
        let b = elem(&mut doc, "b");
        doc.append_child(root, a).unwrap();
        assert!(doc.append_child(root, b).is_err());
    }

    #[test]
    fn clone_is_independent() {
        let mut doc = Document::new();
        let root = doc.root();
        let e = elem(&mut doc, "r");
        doc.append_child(root, e).unwrap();
        let t = doc.create_text("hi");
        doc.append_child(e, t).unwrap();
        let clone = doc.clone_node(e);
        assert!(doc.equals(e, clone));
        let t2 = doc.create_text(" more");
        doc.append_child(clone, t2).unwrap();
        assert!(!doc.equals(e, clone));
        assert_eq!(doc.str(e), "hi");
    }

    #[test]
    fn move_empties_the_source() {
        let mut doc = Document::new();
        let root = doc.root();
        let e = elem(&mut doc, "r");
        doc.append_child(root, e).unwrap();
        let t = doc.create_text("hi");
        doc.append_child(e, t).unwrap();
        let moved = doc.move_node(e);
        assert_eq!(doc.children(e).len(), 0);
        assert_eq!(doc.str(moved), "hi");
    }

    #[test]
    fn erase_releases_id_registration() {
        let mut doc = Document::new();
        let root = doc.root();
        let e = elem(&mut doc, "r");
        doc.append_child(root, e).unwrap();
        doc.create_attribute(e, QName::new("id"), "", "x1", true).unwrap();
        assert_eq!(doc.get_id("x1"), Some(e));
        doc.erase(e);
        assert_eq!(doc.get_id("x1"), None);
    }

    #[test]
    fn duplicate_id_value_is_rejected() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = elem(&mut doc, "a");
        doc.append_child(root, a).unwrap();
        let b = elem(&mut doc, "b");
        doc.append_child(a, b).unwrap();
        doc.create_attribute(a, QName::new("id"), "", "dup", true).unwrap();
        assert!(doc.create_attribute(b, QName::new("id"), "", "dup", true).is_err());
    }

    #[test]
    fn namespace_resolution_walks_ancestors() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = elem(&mut doc, "a");
        doc.append_child(root, a).unwrap();
        doc.add_namespace(a, Some("p".into()), "urn:x".into()).unwrap();
        let b = elem(&mut doc, "p:b");
        doc.append_child(a, b).unwrap();
        assert_eq!(doc.resolve_namespace(b, Some("p")), Some("urn:x".to_string()));
        assert_eq!(doc.resolve_namespace(b, Some("q")), None);
    }

    #[test]
    fn xml_lang_is_inherited() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = elem(&mut doc, "a");
        doc.append_child(root, a).unwrap();
        doc.create_attribute(a, QName::with_prefix("xml", "lang"), "", "en", false).unwrap();
        let b = elem(&mut doc, "b");
        doc.append_child(a, b).unwrap();
        assert_eq!(doc.lang(b), "en");
        assert_eq!(doc.lang(a), "en");
    }
}
