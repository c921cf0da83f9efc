//! The expression tree a compiled XPath is parsed into, per spec §4.8.
//!
//! Each node carries an `evaluate(context) -> object` contract (engine.rs);
//! kept as a plain enum dispatched by `match` rather than runtime-polymorphic
//! subclasses, matching the "tagged sum type, not virtual dispatch" pattern
//! used for the DTD content-model automaton.

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Literal(String),
    VarRef(String),
    Call(String, Vec<Expr>),
    Negate(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    /// `PrimaryExpr Predicate*`, e.g. `$nodes[1]` or `(a|b)[last()]`.
    Filter(Box<Expr>, Vec<Expr>),
    Path(PathExpr),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathExpr {
    pub start: PathStart,
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PathStart {
    /// A leading `/`: start from the document root.
    Root,
    /// No leading `/`: start from the context node.
    Relative,
    /// A `FilterExpr` used as the first step of a path, e.g. `$v/a`.
    Filter(Box<Expr>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
}

impl Axis {
    /// Reverse axes number their predicate positions from the *last*
    /// node in document order backward (spec §4.8 / XPath 1.0 §2.2).
    pub fn is_reverse(self) -> bool {
        matches!(self, Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeTest {
    /// A qname test; `local == "*"` matches any local name in the given
    /// (possibly absent) namespace; `prefix == Some("*")` is not
    /// distinguished from no-prefix here, since only `*` and `prefix:*`
    /// and `prefix:local` and `local` are legal productions.
    Name { prefix: Option<String>, local: String },
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}
