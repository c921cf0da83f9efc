//! Hand-rolled recursive-descent parser for XPath 1.0 expression syntax,
//! per spec §4.8. Tokens are buffered up front rather than streamed, which
//! makes the lookahead `PathExpr`/`FilterExpr` and `NodeType`/function-call
//! disambiguation below (XPath 1.0 production [39] vs. a `FunctionCall`)
//! trivial instead of requiring a pushback buffer.
//!
//! Operator precedence follows XPath 1.0's grammar directly: `Or` binds
//! loosest, then `And`, equality, relational, additive, multiplicative,
//! unary `-`, union `|`, and finally path/filter/primary expressions —
//! each precedence level is its own parse function calling the next
//! tighter one, the same "ladder of parse_X calling parse_X_plus_one"
//! shape used for the DTD content-model grammar in `dtd/mod.rs`.

use super::ast::{Axis, BinOp, Expr, NodeTest, PathExpr, PathStart, Step};
use super::lexer::{Lexer, Token};
use super::XPathError;

pub fn parse(input: &str) -> Result<Expr, XPathError> {
    let mut lexer = Lexer::new(input);
    let mut toks = Vec::new();
    loop {
        let t = lexer.next_token()?;
        let is_eof = matches!(t, Token::Eof);
        toks.push(t);
        if is_eof {
            break;
        }
    }
    let mut p = Parser { toks, pos: 0 };
    let expr = p.parse_expr()?;
    p.expect_eof()?;
    Ok(expr)
}

struct Parser {
    toks: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.toks[self.pos]
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.toks.get(self.pos + offset)
    }

    fn bump(&mut self) -> Token {
        let t = self.toks[self.pos].clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        t
    }

    fn expect_eof(&self) -> Result<(), XPathError> {
        match self.peek() {
            Token::Eof => Ok(()),
            other => Err(XPathError::Syntax(format!("unexpected trailing token {:?}", other))),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), XPathError> {
        match self.bump() {
            Token::RParen => Ok(()),
            other => Err(XPathError::Syntax(format!("expected ')', found {:?}", other))),
        }
    }

    fn expect_rbracket(&mut self) -> Result<(), XPathError> {
        match self.bump() {
            Token::RBracket => Ok(()),
            other => Err(XPathError::Syntax(format!("expected ']', found {:?}", other))),
        }
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Name(n) if n == word)
    }

    fn parse_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_and()?;
        while self.is_keyword("or") {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_equality()?;
        while self.is_keyword("and") {
            self.bump();
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinOp::Eq,
                Token::Ne => BinOp::Ne,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if matches!(self.peek(), Token::Star) {
                BinOp::Mul
            } else if self.is_keyword("div") {
                BinOp::Div
            } else if self.is_keyword("mod") {
                BinOp::Mod
            } else {
                break;
            };
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, XPathError> {
        if matches!(self.peek(), Token::Minus) {
            self.bump();
            Ok(Expr::Negate(Box::new(self.parse_unary()?)))
        } else {
            self.parse_union()
        }
    }

    fn parse_union(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_path_expr()?;
        while matches!(self.peek(), Token::Pipe) {
            self.bump();
            let rhs = self.parse_path_expr()?;
            lhs = Expr::Union(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// Dispatches between `LocationPath` and `FilterExpr` by looking at
    /// what comes next, per XPath 1.0 production [19]/[20]: a leading `/`
    /// or `//` is always a path; `.`, `..`, `@`, a bare `*`, an
    /// `axis::`-prefixed name, or a name not immediately followed by `(`
    /// all start a relative path too (the lone exception being the four
    /// `NodeType` keywords `comment`/`text`/`node`/`processing-instruction`
    /// immediately followed by `(`, which are also steps, not calls).
    /// Anything else is a `FilterExpr`, optionally continued by `/`.
    fn parse_path_expr(&mut self) -> Result<Expr, XPathError> {
        match self.peek() {
            Token::Slash => {
                self.bump();
                if self.at_step_start() {
                    let steps = self.parse_relative_location_path()?;
                    Ok(Expr::Path(PathExpr { start: PathStart::Root, steps }))
                } else {
                    Ok(Expr::Path(PathExpr { start: PathStart::Root, steps: Vec::new() }))
                }
            }
            Token::DoubleSlash => {
                self.bump();
                let mut steps = vec![descendant_or_self_step()];
                steps.extend(self.parse_relative_location_path()?);
                Ok(Expr::Path(PathExpr { start: PathStart::Root, steps }))
            }
            _ if self.at_step_start() => {
                let steps = self.parse_relative_location_path()?;
                Ok(Expr::Path(PathExpr { start: PathStart::Relative, steps }))
            }
            _ => {
                let primary = self.parse_filter_expr()?;
                match self.peek() {
                    Token::Slash => {
                        self.bump();
                        let steps = self.parse_relative_location_path()?;
                        Ok(Expr::Path(PathExpr { start: PathStart::Filter(Box::new(primary)), steps }))
                    }
                    Token::DoubleSlash => {
                        self.bump();
                        let mut steps = vec![descendant_or_self_step()];
                        steps.extend(self.parse_relative_location_path()?);
                        Ok(Expr::Path(PathExpr { start: PathStart::Filter(Box::new(primary)), steps }))
                    }
                    _ => Ok(primary),
                }
            }
        }
    }

    fn at_step_start(&self) -> bool {
        match self.peek() {
            Token::Dot | Token::DotDot | Token::At | Token::Star => true,
            Token::Name(name) => match self.peek_at(1) {
                Some(Token::DoubleColon) => true,
                Some(Token::LParen) => matches!(name.as_str(), "comment" | "text" | "node" | "processing-instruction"),
                _ => true,
            },
            _ => false,
        }
    }

    fn parse_relative_location_path(&mut self) -> Result<Vec<Step>, XPathError> {
        let mut steps = vec![self.parse_step()?];
        loop {
            match self.peek() {
                Token::Slash => {
                    self.bump();
                    steps.push(self.parse_step()?);
                }
                Token::DoubleSlash => {
                    self.bump();
                    steps.push(descendant_or_self_step());
                    steps.push(self.parse_step()?);
                }
                _ => break,
            }
        }
        Ok(steps)
    }

    fn parse_step(&mut self) -> Result<Step, XPathError> {
        match self.peek().clone() {
            Token::Dot => {
                self.bump();
                Ok(Step { axis: Axis::SelfAxis, test: NodeTest::Node, predicates: Vec::new() })
            }
            Token::DotDot => {
                self.bump();
                Ok(Step { axis: Axis::Parent, test: NodeTest::Node, predicates: Vec::new() })
            }
            Token::At => {
                self.bump();
                let test = self.parse_node_test()?;
                let predicates = self.parse_predicates()?;
                Ok(Step { axis: Axis::Attribute, test, predicates })
            }
            Token::Star => {
                let test = self.parse_node_test()?;
                let predicates = self.parse_predicates()?;
                Ok(Step { axis: Axis::Child, test, predicates })
            }
            Token::Name(name) if matches!(self.peek_at(1), Some(Token::DoubleColon)) => {
                let axis = axis_from_name(&name)?;
                self.bump();
                self.bump();
                let test = self.parse_node_test()?;
                let predicates = self.parse_predicates()?;
                Ok(Step { axis, test, predicates })
            }
            Token::Name(_) => {
                let test = self.parse_node_test()?;
                let predicates = self.parse_predicates()?;
                Ok(Step { axis: Axis::Child, test, predicates })
            }
            other => Err(XPathError::Syntax(format!("expected a location step, found {:?}", other))),
        }
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, XPathError> {
        match self.peek().clone() {
            Token::Star => {
                self.bump();
                Ok(NodeTest::Name { prefix: None, local: "*".to_string() })
            }
            Token::Name(name)
                if matches!(self.peek_at(1), Some(Token::LParen))
                    && matches!(name.as_str(), "comment" | "text" | "node" | "processing-instruction") =>
            {
                self.bump();
                self.bump();
                match name.as_str() {
                    "comment" => {
                        self.expect_rparen()?;
                        Ok(NodeTest::Comment)
                    }
                    "text" => {
                        self.expect_rparen()?;
                        Ok(NodeTest::Text)
                    }
                    "node" => {
                        self.expect_rparen()?;
                        Ok(NodeTest::Node)
                    }
                    "processing-instruction" => {
                        let target = match self.peek().clone() {
                            Token::Literal(s) => {
                                self.bump();
                                Some(s)
                            }
                            _ => None,
                        };
                        self.expect_rparen()?;
                        Ok(NodeTest::ProcessingInstruction(target))
                    }
                    _ => unreachable!(),
                }
            }
            Token::Name(name) => {
                self.bump();
                if matches!(self.peek(), Token::Colon) {
                    self.bump();
                    match self.peek().clone() {
                        Token::Star => {
                            self.bump();
                            Ok(NodeTest::Name { prefix: Some(name), local: "*".to_string() })
                        }
                        Token::Name(local) => {
                            self.bump();
                            Ok(NodeTest::Name { prefix: Some(name), local })
                        }
                        other => Err(XPathError::Syntax(format!("expected a local name after ':', found {:?}", other))),
                    }
                } else {
                    Ok(NodeTest::Name { prefix: None, local: name })
                }
            }
            other => Err(XPathError::Syntax(format!("expected a node test, found {:?}", other))),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut preds = Vec::new();
        while matches!(self.peek(), Token::LBracket) {
            self.bump();
            preds.push(self.parse_expr()?);
            self.expect_rbracket()?;
        }
        Ok(preds)
    }

    fn parse_filter_expr(&mut self) -> Result<Expr, XPathError> {
        let mut e = self.parse_primary_expr()?;
        let preds = self.parse_predicates()?;
        if !preds.is_empty() {
            e = Expr::Filter(Box::new(e), preds);
        }
        Ok(e)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, XPathError> {
        match self.peek().clone() {
            Token::Variable(name) => {
                self.bump();
                Ok(Expr::VarRef(name))
            }
            Token::LParen => {
                self.bump();
                let e = self.parse_expr()?;
                self.expect_rparen()?;
                Ok(e)
            }
            Token::Literal(s) => {
                self.bump();
                Ok(Expr::Literal(s))
            }
            Token::Number(n) => {
                self.bump();
                Ok(Expr::Number(n))
            }
            Token::Name(name) => {
                self.bump();
                if matches!(self.peek(), Token::LParen) {
                    self.bump();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Token::RParen) {
                        args.push(self.parse_expr()?);
                        while matches!(self.peek(), Token::Comma) {
                            self.bump();
                            args.push(self.parse_expr()?);
                        }
                    }
                    self.expect_rparen()?;
                    super::functions::check_call(&name, args.len()).map_err(XPathError::Syntax)?;
                    Ok(Expr::Call(name, args))
                } else {
                    Err(XPathError::Syntax(format!("unexpected name '{}' in expression position", name)))
                }
            }
            other => Err(XPathError::Syntax(format!("unexpected token {:?}", other))),
        }
    }
}

fn descendant_or_self_step() -> Step {
    Step { axis: Axis::DescendantOrSelf, test: NodeTest::Node, predicates: Vec::new() }
}

fn axis_from_name(name: &str) -> Result<Axis, XPathError> {
    match name {
        "ancestor" => Ok(Axis::Ancestor),
        "ancestor-or-self" => Ok(Axis::AncestorOrSelf),
        "attribute" => Ok(Axis::Attribute),
        "child" => Ok(Axis::Child),
        "descendant" => Ok(Axis::Descendant),
        "descendant-or-self" => Ok(Axis::DescendantOrSelf),
        "following" => Ok(Axis::Following),
        "following-sibling" => Ok(Axis::FollowingSibling),
        "namespace" => Ok(Axis::Namespace),
        "parent" => Ok(Axis::Parent),
        "preceding" => Ok(Axis::Preceding),
        "preceding-sibling" => Ok(Axis::PrecedingSibling),
        "self" => Ok(Axis::SelfAxis),
        other => Err(XPathError::Syntax(format!("unknown axis '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_absolute_path() {
        let e = parse("/a/b").unwrap();
        match e {
            Expr::Path(p) => {
                assert!(matches!(p.start, PathStart::Root));
                assert_eq!(p.steps.len(), 2);
            }
            _ => panic!("expected a path"),
        }
    }

    #[test]
    fn parses_predicate_with_position() {
        let e = parse("a/b[2]").unwrap();
        match e {
            Expr::Path(p) => assert_eq!(p.steps[1].predicates.len(), 1),
            _ => panic!("expected a path"),
        }
    }

    #[test]
    fn parses_function_call_not_confused_with_node_type() {
        let e = parse("concat('a', 'b')").unwrap();
        assert!(matches!(e, Expr::Call(ref name, ref args) if name == "concat" && args.len() == 2));
    }

    #[test]
    fn distinguishes_node_type_test_from_function_call() {
        let e = parse("//text()").unwrap();
        match e {
            Expr::Path(p) => assert!(matches!(p.steps.last().unwrap().test, NodeTest::Text)),
            _ => panic!("expected a path"),
        }
    }

    #[test]
    fn parses_axis_step() {
        let e = parse("ancestor::node()").unwrap();
        match e {
            Expr::Path(p) => assert_eq!(p.steps[0].axis, Axis::Ancestor),
            _ => panic!("expected a path"),
        }
    }

    #[test]
    fn operator_precedence_matches_or_and_equality() {
        let e = parse("1 = 1 or 2 = 3 and 4 = 5").unwrap();
        assert!(matches!(e, Expr::Binary(BinOp::Or, _, _)));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("a)").is_err());
    }
}
