//! Recursive-descent parser for MysoreScript.
//!
//! Grammar, roughly:
//!
//! ```text
//! statements ::= statement*
//! statement  ::= "var" ident ("=" expr)? ";"
//!              | "return" expr ";"
//!              | "if" "(" expr ")" block
//!              | "while" "(" expr ")" block
//!              | "class" ident (":" ident)? "{" member* "}"
//!              | closure
//!              | ident "=" expr ";"
//!              | expr ";"
//! member     ::= "var" ident ";" | closure
//! closure    ::= "func" ident? "(" params ")" block
//! expr       ::= sum (cmpop sum)*
//! sum        ::= term (("+" | "-") term)*
//! term       ::= postfix (("*" | "/") postfix)*
//! postfix    ::= primary ("." ident "(" args ")" | "(" args ")")*
//! primary    ::= number | string | "new" ident | closure | ident | "(" expr ")"
//! ```

use crate::ast::{BinOpKind, ClassDecl, ClosureDecl, Expr, ExprKind, Ident, Statements, Stmt, StmtKind};
use crate::lexer::tokenize;
use crate::token::{Keyword as KW, Token, TokenKind};
use mysore_core::{MysoreError, MysoreResult, Span};

/// Parse a source batch into a statement block.
pub fn parse(source: &str) -> MysoreResult<Statements> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut statements = Vec::new();
    while !parser.check(&TokenKind::Eof) {
        statements.push(parser.parse_statement()?);
    }
    Ok(Statements { statements })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn check_keyword(&self, kw: KW) -> bool {
        matches!(&self.current().kind, TokenKind::Keyword(k) if *k == kw)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, context: &str) -> MysoreResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!(
                "expected {kind} {context}, found {}",
                self.current().kind
            )))
        }
    }

    fn expect_ident(&mut self, context: &str) -> MysoreResult<Ident> {
        match &self.current().kind {
            TokenKind::Ident(_) => {
                let token = self.advance();
                let TokenKind::Ident(name) = token.kind else {
                    unreachable!()
                };
                Ok(Ident {
                    name,
                    span: token.span,
                })
            }
            other => Err(self.error_here(format!("expected identifier {context}, found {other}"))),
        }
    }

    fn error_here(&self, message: String) -> MysoreError {
        MysoreError::syntax(message, self.current().span)
    }

    fn prev_end(&self) -> u32 {
        self.tokens[self.pos.saturating_sub(1)].span.end
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_statement(&mut self) -> MysoreResult<Stmt> {
        let start = self.current().span.start;

        let keyword = match &self.current().kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        };
        if let Some(kw) = keyword {
            return match kw {
                KW::Var => self.parse_decl(start),
                KW::Return => self.parse_return(start),
                KW::If => self.parse_if(start),
                KW::While => self.parse_while(start),
                KW::Class => self.parse_class(start),
                // A closure declaration in statement position; no trailing
                // semicolon, like the compound statements.
                KW::Func => {
                    let expr = self.parse_closure_expr()?;
                    Ok(Stmt {
                        span: Span::new(start, self.prev_end()),
                        kind: StmtKind::Expr(expr),
                    })
                }
                KW::New => self.parse_expr_statement(start),
            };
        }

        // `ident = …` is an assignment; anything else is an expression
        // statement.
        if matches!(self.current().kind, TokenKind::Ident(_))
            && self.peek_kind(1) == Some(&TokenKind::Equal)
        {
            let target = self.expect_ident("as assignment target")?;
            self.advance(); // `=`
            let expr = self.parse_expr()?;
            self.expect(&TokenKind::Semicolon, "after assignment")?;
            return Ok(Stmt {
                span: Span::new(start, self.prev_end()),
                kind: StmtKind::Assignment { target, expr },
            });
        }

        self.parse_expr_statement(start)
    }

    fn parse_expr_statement(&mut self, start: u32) -> MysoreResult<Stmt> {
        let expr = self.parse_expr()?;
        self.expect(&TokenKind::Semicolon, "after expression")?;
        Ok(Stmt {
            span: Span::new(start, self.prev_end()),
            kind: StmtKind::Expr(expr),
        })
    }

    fn parse_decl(&mut self, start: u32) -> MysoreResult<Stmt> {
        self.advance(); // `var`
        let name = self.expect_ident("after 'var'")?;
        let init = if self.match_token(&TokenKind::Equal) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(&TokenKind::Semicolon, "after variable declaration")?;
        Ok(Stmt {
            span: Span::new(start, self.prev_end()),
            kind: StmtKind::Decl { name, init },
        })
    }

    fn parse_return(&mut self, start: u32) -> MysoreResult<Stmt> {
        self.advance(); // `return`
        let expr = self.parse_expr()?;
        self.expect(&TokenKind::Semicolon, "after return value")?;
        Ok(Stmt {
            span: Span::new(start, self.prev_end()),
            kind: StmtKind::Return(expr),
        })
    }

    fn parse_if(&mut self, start: u32) -> MysoreResult<Stmt> {
        self.advance(); // `if`
        self.expect(&TokenKind::LeftParen, "after 'if'")?;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::RightParen, "after condition")?;
        let body = self.parse_block()?;
        Ok(Stmt {
            span: Span::new(start, self.prev_end()),
            kind: StmtKind::If { condition, body },
        })
    }

    fn parse_while(&mut self, start: u32) -> MysoreResult<Stmt> {
        self.advance(); // `while`
        self.expect(&TokenKind::LeftParen, "after 'while'")?;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::RightParen, "after condition")?;
        let body = self.parse_block()?;
        Ok(Stmt {
            span: Span::new(start, self.prev_end()),
            kind: StmtKind::While { condition, body },
        })
    }

    fn parse_class(&mut self, start: u32) -> MysoreResult<Stmt> {
        self.advance(); // `class`
        let first = self.expect_ident("after 'class'")?;

        // With no `:` the class name sits in the superclass-name slot and
        // the name slot stays empty; ClassDecl::class_name untangles it.
        let (name, superclass_name) = if self.match_token(&TokenKind::Colon) {
            let superclass = self.expect_ident("after ':'")?;
            (Some(first), superclass)
        } else {
            (None, first)
        };

        self.expect(&TokenKind::LeftBrace, "to open class body")?;
        let mut ivars = Vec::new();
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.check_keyword(KW::Var) {
                self.advance();
                ivars.push(self.expect_ident("after 'var'")?);
                self.expect(&TokenKind::Semicolon, "after instance variable")?;
            } else if self.check_keyword(KW::Func) {
                let method = self.parse_closure()?;
                if method.name.is_none() {
                    return Err(self.error_here("methods must be named".into()));
                }
                methods.push(method);
            } else {
                return Err(self.error_here(format!(
                    "expected 'var', 'func' or '}}' in class body, found {}",
                    self.current().kind
                )));
            }
        }
        self.advance(); // `}`

        Ok(Stmt {
            span: Span::new(start, self.prev_end()),
            kind: StmtKind::Class(ClassDecl {
                name,
                superclass_name,
                ivars,
                methods,
            }),
        })
    }

    fn parse_block(&mut self) -> MysoreResult<Statements> {
        self.expect(&TokenKind::LeftBrace, "to open block")?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.error_here("unterminated block".into()));
            }
            statements.push(self.parse_statement()?);
        }
        self.advance(); // `}`
        Ok(Statements { statements })
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expr(&mut self) -> MysoreResult<Expr> {
        let start = self.current().span.start;
        let mut lhs = self.parse_sum()?;
        while let Some(op) = self.comparison_op() {
            self.advance();
            let rhs = self.parse_sum()?;
            lhs = self.binop(op, lhs, rhs, start);
        }
        Ok(lhs)
    }

    fn parse_sum(&mut self) -> MysoreResult<Expr> {
        let start = self.current().span.start;
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinOpKind::Add,
                TokenKind::Minus => BinOpKind::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = self.binop(op, lhs, rhs, start);
        }
    }

    fn parse_term(&mut self) -> MysoreResult<Expr> {
        let start = self.current().span.start;
        let mut lhs = self.parse_postfix()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinOpKind::Mul,
                TokenKind::Slash => BinOpKind::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_postfix()?;
            lhs = self.binop(op, lhs, rhs, start);
        }
    }

    fn comparison_op(&self) -> Option<BinOpKind> {
        Some(match self.current().kind {
            TokenKind::EqualEqual => BinOpKind::Eq,
            TokenKind::NotEqual => BinOpKind::Ne,
            TokenKind::Less => BinOpKind::Lt,
            TokenKind::Greater => BinOpKind::Gt,
            TokenKind::LessEqual => BinOpKind::Le,
            TokenKind::GreaterEqual => BinOpKind::Ge,
            _ => return None,
        })
    }

    fn binop(&self, op: BinOpKind, lhs: Expr, rhs: Expr, start: u32) -> Expr {
        Expr::new(
            ExprKind::BinOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            Span::new(start, self.prev_end()),
        )
    }

    fn parse_postfix(&mut self) -> MysoreResult<Expr> {
        let start = self.current().span.start;
        let mut expr = self.parse_primary()?;
        loop {
            if self.match_token(&TokenKind::Dot) {
                let method = self.expect_ident("after '.'")?;
                self.expect(&TokenKind::LeftParen, "to open argument list")?;
                let arguments = self.parse_args()?;
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        method: Some(method),
                        arguments,
                    },
                    Span::new(start, self.prev_end()),
                );
            } else if self.match_token(&TokenKind::LeftParen) {
                let arguments = self.parse_args()?;
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        method: None,
                        arguments,
                    },
                    Span::new(start, self.prev_end()),
                );
            } else {
                return Ok(expr);
            }
        }
    }

    /// Parse a comma-separated argument list; the `(` is already consumed.
    fn parse_args(&mut self) -> MysoreResult<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen, "to close argument list")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> MysoreResult<Expr> {
        let start = self.current().span.start;
        match &self.current().kind {
            TokenKind::Number(_) => {
                let token = self.advance();
                let TokenKind::Number(value) = token.kind else {
                    unreachable!()
                };
                Ok(Expr::new(ExprKind::Number(value), token.span))
            }
            TokenKind::Str(_) => {
                let token = self.advance();
                let TokenKind::Str(value) = token.kind else {
                    unreachable!()
                };
                Ok(Expr::new(ExprKind::StringLiteral(value), token.span))
            }
            TokenKind::Keyword(KW::New) => {
                self.advance();
                let class_name = self.expect_ident("after 'new'")?;
                Ok(Expr::new(
                    ExprKind::New(class_name),
                    Span::new(start, self.prev_end()),
                ))
            }
            TokenKind::Keyword(KW::Func) => self.parse_closure_expr(),
            TokenKind::Ident(_) => {
                let name = self.expect_ident("")?;
                let span = name.span;
                Ok(Expr::new(ExprKind::VarRef(name), span))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RightParen, "to close parenthesised expression")?;
                Ok(expr)
            }
            other => Err(self.error_here(format!("expected expression, found {other}"))),
        }
    }

    fn parse_closure_expr(&mut self) -> MysoreResult<Expr> {
        let start = self.current().span.start;
        let decl = self.parse_closure()?;
        Ok(Expr::new(
            ExprKind::Closure(decl),
            Span::new(start, self.prev_end()),
        ))
    }

    /// Parse `func name? ( params ) { body }`.
    fn parse_closure(&mut self) -> MysoreResult<ClosureDecl> {
        let start = self.current().span.start;
        self.advance(); // `func`
        let name = if matches!(self.current().kind, TokenKind::Ident(_)) {
            Some(self.expect_ident("")?)
        } else {
            None
        };
        self.expect(&TokenKind::LeftParen, "to open parameter list")?;
        let mut parameters = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                parameters.push(self.expect_ident("in parameter list")?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen, "to close parameter list")?;
        let body = self.parse_block()?;
        Ok(ClosureDecl::new(
            name,
            parameters,
            body,
            Span::new(start, self.prev_end()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decl_with_init() {
        let ast = parse("var x = 2 * 3 + 4;").unwrap();
        assert_eq!(ast.statements.len(), 1);
        let StmtKind::Decl { name, init } = &ast.statements[0].kind else {
            panic!("expected decl");
        };
        assert_eq!(name.name, "x");
        assert!(init.is_some());
    }

    #[test]
    fn test_parse_decl_without_init() {
        let ast = parse("var x;").unwrap();
        let StmtKind::Decl { init, .. } = &ast.statements[0].kind else {
            panic!("expected decl");
        };
        assert!(init.is_none());
    }

    #[test]
    fn test_precedence_mul_over_add() {
        // 2 * 3 + 4 parses as (2 * 3) + 4.
        let ast = parse("2 * 3 + 4;").unwrap();
        let StmtKind::Expr(expr) = &ast.statements[0].kind else {
            panic!("expected expr");
        };
        let ExprKind::BinOp { op, lhs, .. } = &expr.kind else {
            panic!("expected binop");
        };
        assert_eq!(*op, BinOpKind::Add);
        let ExprKind::BinOp { op: inner, .. } = &lhs.kind else {
            panic!("expected nested binop");
        };
        assert_eq!(*inner, BinOpKind::Mul);
    }

    #[test]
    fn test_precedence_add_over_comparison() {
        // a + 1 < b parses as (a + 1) < b.
        let ast = parse("a + 1 < b;").unwrap();
        let StmtKind::Expr(expr) = &ast.statements[0].kind else {
            panic!("expected expr");
        };
        let ExprKind::BinOp { op, .. } = &expr.kind else {
            panic!("expected binop");
        };
        assert_eq!(*op, BinOpKind::Lt);
    }

    #[test]
    fn test_assignment_statement() {
        let ast = parse("x = 99;").unwrap();
        let StmtKind::Assignment { target, .. } = &ast.statements[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(target.name, "x");
    }

    #[test]
    fn test_class_without_superclass_uses_superclass_slot() {
        let ast = parse("class Box { var val; }").unwrap();
        let StmtKind::Class(decl) = &ast.statements[0].kind else {
            panic!("expected class");
        };
        assert!(decl.name.is_none());
        assert_eq!(decl.superclass_name.name, "Box");
        assert_eq!(decl.class_name(), "Box");
        assert_eq!(decl.superclass(), None);
        assert_eq!(decl.ivars.len(), 1);
    }

    #[test]
    fn test_class_with_superclass() {
        let ast = parse("class Sub : Base { }").unwrap();
        let StmtKind::Class(decl) = &ast.statements[0].kind else {
            panic!("expected class");
        };
        assert_eq!(decl.class_name(), "Sub");
        assert_eq!(decl.superclass(), Some("Base"));
    }

    #[test]
    fn test_class_with_methods() {
        let ast = parse("class Box { var val; func add(o) { return o; } }").unwrap();
        let StmtKind::Class(decl) = &ast.statements[0].kind else {
            panic!("expected class");
        };
        assert_eq!(decl.methods.len(), 1);
        assert_eq!(decl.methods[0].name_or_anon(), "add");
        assert_eq!(decl.methods[0].arity(), 1);
    }

    #[test]
    fn test_method_must_be_named() {
        assert!(parse("class C { func() { return 1; } }").is_err());
    }

    #[test]
    fn test_closure_statement_has_no_semicolon() {
        let ast = parse("func f(n) { return n; } var x = f(1);").unwrap();
        assert_eq!(ast.statements.len(), 2);
    }

    #[test]
    fn test_anonymous_closure_expression() {
        let ast = parse("func make() { return func() { return 1; }; }").unwrap();
        assert_eq!(ast.statements.len(), 1);
    }

    #[test]
    fn test_method_call_on_parenthesised_expression() {
        let ast = parse("var r = (new C).fact(5);").unwrap();
        let StmtKind::Decl { init: Some(init), .. } = &ast.statements[0].kind else {
            panic!("expected decl with init");
        };
        let ExprKind::Call { callee, method, arguments } = &init.kind else {
            panic!("expected call");
        };
        assert_eq!(method.as_ref().unwrap().name, "fact");
        assert_eq!(arguments.len(), 1);
        assert!(matches!(callee.kind, ExprKind::New(_)));
    }

    #[test]
    fn test_chained_calls() {
        let ast = parse("f(1)(2);").unwrap();
        let StmtKind::Expr(expr) = &ast.statements[0].kind else {
            panic!("expected expr");
        };
        let ExprKind::Call { callee, method, .. } = &expr.kind else {
            panic!("expected call");
        };
        assert!(method.is_none());
        assert!(matches!(callee.kind, ExprKind::Call { .. }));
    }

    #[test]
    fn test_while_and_if() {
        let ast = parse("while (n > 0) { if (n == 1) { n = 0; } n = n - 1; }").unwrap();
        let StmtKind::While { body, .. } = &ast.statements[0].kind else {
            panic!("expected while");
        };
        assert_eq!(body.statements.len(), 2);
    }

    #[test]
    fn test_string_literal_expression() {
        let ast = parse("var s = \"hi\";").unwrap();
        let StmtKind::Decl { init: Some(init), .. } = &ast.statements[0].kind else {
            panic!("expected decl");
        };
        assert!(matches!(&init.kind, ExprKind::StringLiteral(s) if s == "hi"));
    }

    #[test]
    fn test_missing_semicolon_is_error() {
        assert!(parse("var x = 1").is_err());
    }

    #[test]
    fn test_unbalanced_block_is_error() {
        assert!(parse("if (1) { var x = 1;").is_err());
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(parse("var = 3;").is_err());
        assert!(parse("1 + ;").is_err());
    }
}
