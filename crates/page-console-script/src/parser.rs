//! Recursive-descent parser for console script input.

use std::{ops::Range, sync::Arc};

use crate::{
    ast::{
        BinaryOp, DeclarationKind, Expr, FunctionDecl, LogicalOp, Property, Script, Stmt, UnaryOp,
    },
    error::ParseError,
    lexer::{Token, tokenize},
};

/// Nesting limit for statements and expressions.
pub const MAX_DEPTH: usize = 128;

/// Parse `source` as a standalone script.
///
/// # Errors
/// Returns the first lexical or syntax error.
pub fn parse(source: &str) -> Result<Script, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens, source.len()).parse_script()
}

fn is_keyword(token: &Token) -> bool {
    let text = token.text();
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphabetic())
}

struct Parser {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    source_len: usize,
    depth: usize,
}

impl Parser {
    const fn new(tokens: Vec<(Token, Range<usize>)>, source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            source_len,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek_is(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source_len, |(_, span)| span.start)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek_is(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::UnexpectedToken {
                position: self.position(),
                expected: expected.to_string(),
                found: token.describe(),
            },
            None => ParseError::UnexpectedEof {
                position: self.source_len,
                expected: expected.to_string(),
            },
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", expected.text())))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// Property names may be identifiers or keywords.
    fn property_name(&mut self) -> Result<String, ParseError> {
        let name = match self.peek() {
            Some(Token::Ident(name)) => name.clone(),
            Some(token) if is_keyword(token) => token.text().to_string(),
            _ => return Err(self.unexpected("property name")),
        };
        self.pos += 1;
        Ok(name)
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::MaxDepthExceeded {
                position: self.position(),
                max_depth: MAX_DEPTH,
            });
        }
        self.depth += 1;
        Ok(())
    }

    const fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_script(mut self) -> Result<Script, ParseError> {
        let mut body = Vec::new();
        while self.peek().is_some() {
            body.push(self.parse_statement()?);
        }
        Ok(Script { body })
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        self.enter()?;
        let stmt = self.parse_statement_inner();
        self.leave();
        stmt
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            Some(Token::LBrace) => Ok(Stmt::Block(self.parse_block()?)),
            Some(Token::Var | Token::Let | Token::Const) => {
                let stmt = self.parse_declaration()?;
                self.eat(&Token::Semicolon);
                Ok(stmt)
            }
            Some(Token::Function) => Ok(Stmt::Function(self.parse_function(true)?)),
            Some(Token::Return) => {
                self.advance();
                let value = match self.peek() {
                    None | Some(Token::Semicolon | Token::RBrace) => None,
                    Some(_) => Some(self.parse_expression()?),
                };
                self.eat(&Token::Semicolon);
                Ok(Stmt::Return(value))
            }
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => {
                self.advance();
                self.expect(&Token::LParen)?;
                let test = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While { test, body })
            }
            Some(Token::Throw) => {
                self.advance();
                let value = self.parse_expression()?;
                self.eat(&Token::Semicolon);
                Ok(Stmt::Throw(value))
            }
            Some(Token::Try) => self.parse_try(),
            Some(Token::Semicolon) => {
                self.advance();
                Ok(Stmt::Empty)
            }
            _ => {
                let expr = self.parse_expression()?;
                self.eat(&Token::Semicolon);
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&Token::LBrace)?;
        let mut body = Vec::new();
        while !self.eat(&Token::RBrace) {
            if self.peek().is_none() {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_declaration(&mut self) -> Result<Stmt, ParseError> {
        let kind = match self.advance() {
            Some(Token::Var) => DeclarationKind::Var,
            Some(Token::Let) => DeclarationKind::Let,
            _ => DeclarationKind::Const,
        };

        let mut declarators = Vec::new();
        loop {
            let position = self.position();
            let name = self.expect_ident("binding name")?;
            let init = if self.eat(&Token::Assign) {
                Some(self.parse_assignment()?)
            } else if kind == DeclarationKind::Const {
                return Err(ParseError::MissingInitializer { position });
            } else {
                None
            };
            declarators.push((name, init));
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        Ok(Stmt::Declaration { kind, declarators })
    }

    fn parse_function(&mut self, require_name: bool) -> Result<Arc<FunctionDecl>, ParseError> {
        self.expect(&Token::Function)?;
        let name = if require_name || matches!(self.peek(), Some(Token::Ident(_))) {
            self.expect_ident("function name")?
        } else {
            String::new()
        };

        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                params.push(self.expect_ident("parameter name")?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }

        let body = self.parse_block()?;
        Ok(Arc::new(FunctionDecl { name, params, body }))
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&Token::If)?;
        self.expect(&Token::LParen)?;
        let test = self.parse_expression()?;
        self.expect(&Token::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(&Token::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_try(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&Token::Try)?;
        let block = self.parse_block()?;

        let mut param = None;
        let handler = if self.eat(&Token::Catch) {
            if self.eat(&Token::LParen) {
                param = Some(self.expect_ident("catch parameter")?);
                self.expect(&Token::RParen)?;
            }
            Some(self.parse_block()?)
        } else {
            None
        };

        let finalizer = if self.eat(&Token::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected("'catch' or 'finally'"));
        }

        Ok(Stmt::Try {
            block,
            param,
            handler,
            finalizer,
        })
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let expr = self.parse_assignment_inner();
        self.leave();
        expr
    }

    fn parse_assignment_inner(&mut self) -> Result<Expr, ParseError> {
        let position = self.position();
        let target = self.parse_conditional()?;

        let op = match self.peek() {
            Some(Token::Assign) => None,
            Some(Token::PlusAssign) => Some(BinaryOp::Add),
            Some(Token::MinusAssign) => Some(BinaryOp::Sub),
            Some(Token::StarAssign) => Some(BinaryOp::Mul),
            Some(Token::SlashAssign) => Some(BinaryOp::Div),
            _ => return Ok(target),
        };

        if !matches!(target, Expr::Ident(_) | Expr::Member { .. }) {
            return Err(ParseError::InvalidAssignmentTarget { position });
        }
        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            target: Box::new(target),
            op,
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let test = self.parse_logical_or()?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect(&Token::Colon)?;
        let alternate = self.parse_assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    /// Run a left-folding rule; every node it folds counts toward the depth
    /// limit until the rule returns.
    fn folding(
        &mut self,
        rule: impl FnOnce(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let expr = rule(self);
        self.depth = depth;
        expr
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        self.folding(Self::fold_logical_or)
    }

    fn fold_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.eat(&Token::OrOr) {
            self.enter()?;
            let right = self.parse_logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        self.folding(Self::fold_logical_and)
    }

    fn fold_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::AndAnd) {
            self.enter()?;
            let right = self.parse_equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, ParseError>,
        operator: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, ParseError> {
        self.folding(|parser| {
            let mut left = next(parser)?;
            while let Some(op) = parser.peek().and_then(operator) {
                parser.advance();
                parser.enter()?;
                let right = next(parser)?;
                left = Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                };
            }
            Ok(left)
        })
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_relational, |token| match token {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::NotEq),
            Token::EqEqEq => Some(BinaryOp::StrictEq),
            Token::NotEqEq => Some(BinaryOp::StrictNotEq),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_additive, |token| match token {
            Token::Less => Some(BinaryOp::Less),
            Token::Greater => Some(BinaryOp::Greater),
            Token::LessEq => Some(BinaryOp::LessEq),
            Token::GreaterEq => Some(BinaryOp::GreaterEq),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_multiplicative, |token| match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_unary, |token| match token {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Negate,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Typeof) => UnaryOp::Typeof,
            _ => return self.parse_postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand?),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        self.folding(Self::fold_postfix)
    }

    fn fold_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = if self.eat(&Token::New) {
            let callee = self.parse_member_chain()?;
            let args = if self.peek_is(&Token::LParen) {
                self.parse_arguments()?
            } else {
                Vec::new()
            };
            Expr::New {
                callee: Box::new(callee),
                args,
            }
        } else {
            self.parse_primary()?
        };

        loop {
            if matches!(
                self.peek(),
                Some(Token::Dot | Token::LBracket | Token::LParen)
            ) {
                self.enter()?;
            }
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Property::Named(self.property_name()?),
                    };
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Property::Computed(Box::new(index)),
                    };
                }
                Some(Token::LParen) => {
                    let args = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Callee of `new`: a primary followed by member accesses only.
    fn parse_member_chain(&mut self) -> Result<Expr, ParseError> {
        self.folding(Self::fold_member_chain)
    }

    fn fold_member_chain(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if matches!(self.peek(), Some(Token::Dot | Token::LBracket)) {
                self.enter()?;
            }
            if self.eat(&Token::Dot) {
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Property::Named(self.property_name()?),
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_expression()?;
                self.expect(&Token::RBracket)?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Property::Computed(Box::new(index)),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_assignment()?);
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            self.expect(&Token::Comma)?;
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("expression"));
        };

        let expr = match token {
            Token::Number(n) => Expr::Number(n),
            Token::String(s) => Expr::String(s),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Null => Expr::Null,
            Token::This => Expr::This,
            Token::Ident(name) => Expr::Ident(name),
            Token::Function => return Ok(Expr::Function(self.parse_function(false)?)),
            Token::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                return Ok(inner);
            }
            Token::LBracket => return self.parse_array(),
            Token::LBrace => return self.parse_object(),
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(expr)
    }

    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        self.expect(&Token::LBracket)?;
        let mut elements = Vec::new();
        while !self.eat(&Token::RBracket) {
            elements.push(self.parse_assignment()?);
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RBracket)?;
                break;
            }
        }
        Ok(Expr::Array(elements))
    }

    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        self.expect(&Token::LBrace)?;
        let mut properties = Vec::new();
        while !self.eat(&Token::RBrace) {
            let key = match self.peek() {
                Some(Token::String(s)) => {
                    let key = s.clone();
                    self.advance();
                    key
                }
                Some(Token::Number(n)) => {
                    let key = page_console_core::value::number_to_string(*n);
                    self.advance();
                    key
                }
                _ => self.property_name()?,
            };
            self.expect(&Token::Colon)?;
            properties.push((key, self.parse_assignment()?));
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RBrace)?;
                break;
            }
        }
        Ok(Expr::Object(properties))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn expr(source: &str) -> Expr {
        match parse(source).unwrap().body.into_iter().next() {
            Some(Stmt::Expr(expr)) => expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::Number(1.0)),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: Box::new(Expr::Number(2.0)),
                    right: Box::new(Expr::Number(3.0)),
                }),
            }
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(
            expr("a = b = 1"),
            Expr::Assign {
                target: Box::new(Expr::Ident("a".into())),
                op: None,
                value: Box::new(Expr::Assign {
                    target: Box::new(Expr::Ident("b".into())),
                    op: None,
                    value: Box::new(Expr::Number(1.0)),
                }),
            }
        );
    }

    #[test]
    fn test_member_call_chain() {
        assert_eq!(
            expr("console.log(1)"),
            Expr::Call {
                callee: Box::new(Expr::Member {
                    object: Box::new(Expr::Ident("console".into())),
                    property: Property::Named("log".into()),
                }),
                args: vec![Expr::Number(1.0)],
            }
        );
    }

    #[test]
    fn test_statements() {
        let script = parse(
            "let a = 1, b; function f(x) { return x; } if (a) { b = 2 } else b = 3; \
             try { throw new Error('x') } catch (e) {} finally {}",
        )
        .unwrap();
        assert_eq!(script.body.len(), 4);
        assert!(matches!(
            &script.body[0],
            Stmt::Declaration { kind: DeclarationKind::Let, declarators } if declarators.len() == 2
        ));
        assert!(matches!(&script.body[1], Stmt::Function(f) if f.name == "f" && f.params == ["x"]));
        assert!(matches!(&script.body[3], Stmt::Try { param: Some(p), .. } if p == "e"));
    }

    #[test]
    fn test_unterminated_paren_reports_end_of_input() {
        let err = parse("(").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedEof {
                position: 1,
                expected: "expression".into(),
            }
        );
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(matches!(
            parse("1 = 2").unwrap_err(),
            ParseError::InvalidAssignmentTarget { position: 0 }
        ));
    }

    #[test]
    fn test_const_requires_initializer() {
        assert!(matches!(
            parse("const x;").unwrap_err(),
            ParseError::MissingInitializer { .. }
        ));
    }

    #[test]
    fn test_depth_limit() {
        let source = format!("{}1{}", "(".repeat(MAX_DEPTH + 5), ")".repeat(MAX_DEPTH + 5));
        assert!(matches!(
            parse(&source).unwrap_err(),
            ParseError::MaxDepthExceeded { .. }
        ));
    }

    #[test]
    fn test_long_operator_chains_hit_depth_limit() {
        for source in [
            format!("1{}", "+1".repeat(200_000)),
            format!("a{}", " || a".repeat(MAX_DEPTH * 2)),
            format!("a{}", ".b".repeat(MAX_DEPTH * 2)),
            format!("f{}", "()".repeat(MAX_DEPTH * 2)),
            format!("new a{}", "[0]".repeat(MAX_DEPTH * 2)),
        ] {
            assert!(matches!(
                parse(&source).unwrap_err(),
                ParseError::MaxDepthExceeded { .. }
            ));
        }
    }

    #[test]
    fn test_moderate_chains_still_parse() {
        let source = format!("1{}; a{}", "+1".repeat(50), ".b".repeat(50));
        assert_eq!(parse(&source).unwrap().body.len(), 2);
    }

    #[test]
    fn test_object_and_array_literals() {
        assert_eq!(
            expr("({ a: [1, 2], 'b c': null })"),
            Expr::Object(vec![
                (
                    "a".into(),
                    Expr::Array(vec![Expr::Number(1.0), Expr::Number(2.0)])
                ),
                ("b c".into(), Expr::Null),
            ])
        );
    }
}
