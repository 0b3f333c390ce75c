use crate::xpath::lexer::{Tok, tokenize};

/// Parsed XPath expression
#[derive(Debug, Clone)]
pub enum Expr {
    /// Location path, e.g. `//X[@a='v']/child::Y`
    Path { absolute: bool, steps: Vec<Step> },
    /// Parenthesized expression with trailing predicates, e.g. `(//X)[2]`
    Filter { primary: Box<Expr>, preds: Vec<Expr> },
    BinOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    FnCall { name: String, args: Vec<Expr> },
    Lit(String),
    Num(f64),
}

/// One location step: axis, node test, predicates
#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub preds: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    SelfAxis,
    Attribute,
}

#[derive(Debug, Clone)]
pub enum NodeTest {
    Name(String),
    Wildcard,
    AnyNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

/// Parse an XPath expression string into an AST
pub fn parse(input: &str) -> Result<Expr, String> {
    let toks = tokenize(input)?;
    if toks.is_empty() {
        return Err("empty XPath expression".to_string());
    }
    let mut parser = Parser { toks, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos < parser.toks.len() {
        return Err(format!("unexpected token at end: {:?}", parser.peek()));
    }
    Ok(expr)
}

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Tok> {
        self.toks.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Tok) -> Result<(), String> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(format!("expected {tok:?}, got {:?}", self.peek()))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.eat(&Tok::Or) {
            let right = self.parse_and()?;
            left = Expr::BinOp {
                op: Op::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_equality()?;
        while self.eat(&Tok::And) {
            let right = self.parse_equality()?;
            left = Expr::BinOp {
                op: Op::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_relational()?;
        loop {
            let op = if self.eat(&Tok::Eq) {
                Op::Eq
            } else if self.eat(&Tok::Ne) {
                Op::Ne
            } else {
                break;
            };
            let right = self.parse_relational()?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_path()?;
        loop {
            let op = if self.eat(&Tok::Lt) {
                Op::Lt
            } else if self.eat(&Tok::Gt) {
                Op::Gt
            } else if self.eat(&Tok::Le) {
                Op::Le
            } else if self.eat(&Tok::Ge) {
                Op::Ge
            } else {
                break;
            };
            let right = self.parse_path()?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_path(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Tok::Slash) | Some(Tok::DSlash) => self.parse_location_path(),
            Some(Tok::LParen) => {
                self.advance();
                let primary = self.parse_or()?;
                self.expect(&Tok::RParen)?;
                // Trailing predicates filter the parenthesized node set,
                // e.g. (//a//b)[3]
                let mut preds = Vec::new();
                while self.eat(&Tok::LBrack) {
                    preds.push(self.parse_or()?);
                    self.expect(&Tok::RBrack)?;
                }
                if preds.is_empty() {
                    Ok(primary)
                } else {
                    Ok(Expr::Filter {
                        primary: Box::new(primary),
                        preds,
                    })
                }
            }
            Some(Tok::Str(s)) => {
                let s = s.clone();
                self.advance();
                Ok(Expr::Lit(s))
            }
            Some(Tok::Num(n)) => {
                let n = *n;
                self.advance();
                Ok(Expr::Num(n))
            }
            Some(Tok::Name(name)) => {
                // Function call when a '(' follows and the name isn't a
                // node-type test
                let is_fn = self.peek_at(1) == Some(&Tok::LParen)
                    && !matches!(name.as_str(), "node" | "text" | "comment");
                if is_fn {
                    self.parse_fn_call()
                } else {
                    self.parse_location_path()
                }
            }
            Some(Tok::Dot) | Some(Tok::DDot) | Some(Tok::At) | Some(Tok::Star) => {
                self.parse_location_path()
            }
            None => Err("unexpected end of expression".to_string()),
            other => Err(format!("unexpected token: {other:?}")),
        }
    }

    fn parse_fn_call(&mut self) -> Result<Expr, String> {
        let name = match self.advance() {
            Some(Tok::Name(n)) => n,
            other => return Err(format!("expected function name, got {other:?}")),
        };
        self.expect(&Tok::LParen)?;
        let mut args = Vec::new();
        if !self.eat(&Tok::RParen) {
            args.push(self.parse_or()?);
            while self.eat(&Tok::Comma) {
                args.push(self.parse_or()?);
            }
            self.expect(&Tok::RParen)?;
        }
        Ok(Expr::FnCall { name, args })
    }

    fn parse_location_path(&mut self) -> Result<Expr, String> {
        let mut absolute = false;
        let mut steps = Vec::new();

        if self.eat(&Tok::DSlash) {
            absolute = true;
            steps.push(Step {
                axis: Axis::DescendantOrSelf,
                test: NodeTest::AnyNode,
                preds: Vec::new(),
            });
            steps.push(self.parse_step()?);
        } else if self.eat(&Tok::Slash) {
            absolute = true;
            if self.peek().is_some()
                && !matches!(
                    self.peek(),
                    Some(Tok::RBrack) | Some(Tok::RParen) | Some(Tok::Comma)
                )
            {
                steps.push(self.parse_step()?);
            }
        } else {
            steps.push(self.parse_step()?);
        }

        loop {
            if self.eat(&Tok::DSlash) {
                steps.push(Step {
                    axis: Axis::DescendantOrSelf,
                    test: NodeTest::AnyNode,
                    preds: Vec::new(),
                });
                steps.push(self.parse_step()?);
            } else if self.eat(&Tok::Slash) {
                steps.push(self.parse_step()?);
            } else {
                break;
            }
        }

        Ok(Expr::Path { absolute, steps })
    }

    fn parse_step(&mut self) -> Result<Step, String> {
        // Abbreviated steps
        if self.eat(&Tok::Dot) {
            return Ok(Step {
                axis: Axis::SelfAxis,
                test: NodeTest::AnyNode,
                preds: Vec::new(),
            });
        }
        if self.eat(&Tok::DDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::AnyNode,
                preds: Vec::new(),
            });
        }

        let axis = if self.eat(&Tok::At) {
            Axis::Attribute
        } else if self.peek_at(1) == Some(&Tok::DColon) {
            let axis_name = match self.advance() {
                Some(Tok::Name(n)) => n,
                other => return Err(format!("expected axis name, got {other:?}")),
            };
            self.expect(&Tok::DColon)?;
            match axis_name.as_str() {
                "child" => Axis::Child,
                "descendant" => Axis::Descendant,
                "descendant-or-self" => Axis::DescendantOrSelf,
                "parent" => Axis::Parent,
                "ancestor" => Axis::Ancestor,
                "ancestor-or-self" => Axis::AncestorOrSelf,
                "following-sibling" => Axis::FollowingSibling,
                "preceding-sibling" => Axis::PrecedingSibling,
                "self" => Axis::SelfAxis,
                "attribute" => Axis::Attribute,
                _ => return Err(format!("unsupported axis: {axis_name}")),
            }
        } else {
            Axis::Child
        };

        let test = if self.eat(&Tok::Star) {
            NodeTest::Wildcard
        } else if let Some(Tok::Name(n)) = self.peek().cloned() {
            if n == "node" && self.peek_at(1) == Some(&Tok::LParen) {
                self.advance();
                self.expect(&Tok::LParen)?;
                self.expect(&Tok::RParen)?;
                NodeTest::AnyNode
            } else {
                self.advance();
                NodeTest::Name(n)
            }
        } else {
            return Err(format!("expected node test, got {:?}", self.peek()));
        };

        let mut preds = Vec::new();
        while self.eat(&Tok::LBrack) {
            preds.push(self.parse_or()?);
            self.expect(&Tok::RBrack)?;
        }

        Ok(Step { axis, test, preds })
    }
}
