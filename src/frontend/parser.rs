//! Parser for the harambe language
//!
//! Recursive descent over the token vector. Locations (`loc`) are the only
//! legal left operand of a dot access and the only legal assignment
//! target, so both are enforced here rather than during analysis. The
//! parser stops at the first error; there is no recovery.

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result};

/// The parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from a lexer
    pub fn new(mut lexer: Lexer) -> Self {
        Self {
            tokens: lexer.tokenize(),
            pos: 0,
        }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens.last().expect("tokens should not be empty")
        })
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn nth_kind(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + n).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(Error::UnexpectedToken {
                expected: format!("{:?}", expected),
                got: format!("{:?}", self.current_kind()),
                pos: self.current().pos,
            })
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_ident(&mut self) -> Result<Id> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Id::new(name.clone(), token.pos))
            }
            _ => Err(Error::ExpectedIdent { pos: token.pos }),
        }
    }

    // ==================== Declarations ====================

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut decls = Vec::new();

        while !self.is_at_end() {
            decls.push(self.parse_decl()?);
        }

        Ok(Program { decls })
    }

    fn parse_decl(&mut self) -> Result<Decl> {
        // `struct S {` opens a struct declaration; `struct S s;` and
        // `struct S f(...)` fall through to the type-first productions
        if self.check(&TokenKind::Struct)
            && matches!(self.nth_kind(1), Some(TokenKind::Ident(_)))
            && matches!(self.nth_kind(2), Some(TokenKind::LBrace))
        {
            return Ok(Decl::Struct(self.parse_struct_decl()?));
        }

        let ty = self.parse_type()?;
        let id = self.parse_ident()?;

        match self.current_kind() {
            TokenKind::Semicolon => {
                self.advance();
                Ok(Decl::Var(VarDecl {
                    size: size_tag(&ty),
                    ty,
                    id,
                }))
            }
            TokenKind::LParen => Ok(Decl::Fn(self.parse_fn_rest(ty, id)?)),
            _ => Err(Error::UnexpectedToken {
                expected: "`;` or `(`".to_string(),
                got: format!("{:?}", self.current_kind()),
                pos: self.current().pos,
            }),
        }
    }

    fn parse_struct_decl(&mut self) -> Result<StructDecl> {
        self.expect(TokenKind::Struct)?;
        let id = self.parse_ident()?;
        self.expect(TokenKind::LBrace)?;

        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            fields.push(self.parse_var_decl()?);
        }

        self.expect(TokenKind::RBrace)?;
        self.expect(TokenKind::Semicolon)?;

        Ok(StructDecl { id, fields })
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl> {
        let ty = self.parse_type()?;
        let id = self.parse_ident()?;
        self.expect(TokenKind::Semicolon)?;

        Ok(VarDecl {
            size: size_tag(&ty),
            ty,
            id,
        })
    }

    fn parse_fn_rest(&mut self, ret: Type, id: Id) -> Result<FnDecl> {
        self.expect(TokenKind::LParen)?;
        let formals = self.parse_formals()?;
        self.expect(TokenKind::RParen)?;

        self.expect(TokenKind::LBrace)?;
        let body = self.parse_body()?;
        self.expect(TokenKind::RBrace)?;

        Ok(FnDecl {
            ret,
            id,
            formals,
            body,
        })
    }

    fn parse_formals(&mut self) -> Result<Vec<FormalDecl>> {
        let mut formals = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            let ty = self.parse_type()?;
            let id = self.parse_ident()?;
            formals.push(FormalDecl { ty, id });
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }

        Ok(formals)
    }

    fn parse_type(&mut self) -> Result<Type> {
        match self.current_kind() {
            TokenKind::Int => {
                self.advance();
                Ok(Type::Int)
            }
            TokenKind::Bool => {
                self.advance();
                Ok(Type::Bool)
            }
            TokenKind::Void => {
                self.advance();
                Ok(Type::Void)
            }
            TokenKind::Struct => {
                self.advance();
                let id = self.parse_ident()?;
                Ok(Type::Struct(id))
            }
            _ => Err(Error::ExpectedType {
                pos: self.current().pos,
            }),
        }
    }

    /// Parse a function (or block) body: declarations first, then
    /// statements
    fn parse_body(&mut self) -> Result<FnBody> {
        let mut decls = Vec::new();
        while self.current_kind().starts_type() {
            decls.push(self.parse_var_decl()?);
        }

        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }

        Ok(FnBody { decls, stmts })
    }

    // ==================== Statements ====================

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.current_kind() {
            TokenKind::Cin => {
                self.advance();
                self.expect(TokenKind::Read)?;
                let loc = self.parse_loc()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Read(loc))
            }
            TokenKind::Cout => {
                self.advance();
                self.expect(TokenKind::Write)?;
                let exp = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Write(exp))
            }
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::LBrace)?;
                let body = self.parse_body()?;
                self.expect(TokenKind::RBrace)?;
                Ok(Stmt::While(WhileStmt {
                    cond,
                    decls: body.decls,
                    stmts: body.stmts,
                }))
            }
            TokenKind::Return => {
                self.advance();
                let exp = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Return(exp))
            }
            TokenKind::Ident(_) => {
                // call statement, assignment, or post-increment/decrement
                if matches!(self.nth_kind(1), Some(TokenKind::LParen)) {
                    let call = self.parse_call()?;
                    self.expect(TokenKind::Semicolon)?;
                    return Ok(Stmt::Call(call));
                }

                let loc = self.parse_loc()?;
                match self.current_kind() {
                    TokenKind::PlusPlus => {
                        self.advance();
                        self.expect(TokenKind::Semicolon)?;
                        Ok(Stmt::PostInc(loc))
                    }
                    TokenKind::MinusMinus => {
                        self.advance();
                        self.expect(TokenKind::Semicolon)?;
                        Ok(Stmt::PostDec(loc))
                    }
                    TokenKind::Assign => {
                        self.advance();
                        let rhs = self.parse_expr()?;
                        self.expect(TokenKind::Semicolon)?;
                        Ok(Stmt::Assign(AssignExpr { lhs: loc, rhs }))
                    }
                    _ => Err(Error::UnexpectedToken {
                        expected: "`++`, `--` or `=`".to_string(),
                        got: format!("{:?}", self.current_kind()),
                        pos: self.current().pos,
                    }),
                }
            }
            _ => Err(Error::Expected(
                "statement".to_string(),
                self.current().pos,
            )),
        }
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LBrace)?;
        let then_body = self.parse_body()?;
        self.expect(TokenKind::RBrace)?;

        if self.consume(&TokenKind::Else) {
            self.expect(TokenKind::LBrace)?;
            let else_body = self.parse_body()?;
            self.expect(TokenKind::RBrace)?;
            Ok(Stmt::IfElse(IfElseStmt {
                cond,
                then_decls: then_body.decls,
                then_stmts: then_body.stmts,
                else_decls: else_body.decls,
                else_stmts: else_body.stmts,
            }))
        } else {
            Ok(Stmt::If(IfStmt {
                cond,
                decls: then_body.decls,
                stmts: then_body.stmts,
            }))
        }
    }

    // ==================== Expressions ====================

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_assign()
    }

    /// Assignment is right-associative and only a location may be assigned
    fn parse_assign(&mut self) -> Result<Expr> {
        let lhs = self.parse_or()?;

        if self.consume(&TokenKind::Assign) {
            if !matches!(lhs, Expr::Id(_) | Expr::Dot(_)) {
                return Err(Error::Expected(
                    "assignable location".to_string(),
                    self.current().pos,
                ));
            }
            let rhs = self.parse_assign()?;
            return Ok(Expr::Assign(Box::new(AssignExpr { lhs, rhs })));
        }

        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.consume(&TokenKind::OrOr) {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_rel()?;
        while self.consume(&TokenKind::AndAnd) {
            let rhs = self.parse_rel()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// Comparisons are non-associative: at most one per expression level,
    /// so `a < b < c` fails upstream on the second `<`
    fn parse_rel(&mut self) -> Result<Expr> {
        let lhs = self.parse_add()?;

        let op = match self.current_kind() {
            TokenKind::EqEq => BinOp::Equals,
            TokenKind::NotEq => BinOp::NotEquals,
            TokenKind::Lt => BinOp::Less,
            TokenKind::Gt => BinOp::Greater,
            TokenKind::Le => BinOp::LessEq,
            TokenKind::Ge => BinOp::GreaterEq,
            _ => return Ok(lhs),
        };
        self.advance();

        let rhs = self.parse_add()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_add(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Plus => BinOp::Plus,
                TokenKind::Minus => BinOp::Minus,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_mul()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Star => BinOp::Times,
                TokenKind::Slash => BinOp::Divide,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.current_kind() {
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Not => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    operand: Box::new(operand),
                })
            }
            _ => self.parse_term(),
        }
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::IntLit(value) => {
                self.advance();
                Ok(Expr::IntLit(IntLit {
                    value: *value,
                    pos: token.pos,
                }))
            }
            TokenKind::StrLit(value) => {
                self.advance();
                Ok(Expr::StrLit(StrLit {
                    value: value.clone(),
                    pos: token.pos,
                }))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::True(token.pos))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::False(token.pos))
            }
            TokenKind::LParen => {
                self.advance();
                let exp = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(exp)
            }
            TokenKind::Ident(_) => {
                if matches!(self.nth_kind(1), Some(TokenKind::LParen)) {
                    Ok(Expr::Call(self.parse_call()?))
                } else {
                    self.parse_loc()
                }
            }
            TokenKind::Unknown(c) => Err(Error::UnknownChar {
                ch: *c,
                pos: token.pos,
            }),
            _ => Err(Error::ExpectedExpr { pos: token.pos }),
        }
    }

    /// A location: an identifier followed by any number of field accesses
    fn parse_loc(&mut self) -> Result<Expr> {
        let mut loc = Expr::Id(self.parse_ident()?);

        while self.consume(&TokenKind::Dot) {
            let field = self.parse_ident()?;
            loc = Expr::Dot(Box::new(DotAccess { loc, field }));
        }

        Ok(loc)
    }

    fn parse_call(&mut self) -> Result<CallExpr> {
        let callee = self.parse_ident()?;
        self.expect(TokenKind::LParen)?;

        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            args.push(self.parse_expr()?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::RParen)?;
        Ok(CallExpr { callee, args })
    }
}

fn size_tag(ty: &Type) -> i32 {
    match ty {
        Type::Struct(_) => 0,
        _ => VarDecl::NOT_STRUCT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Program> {
        Parser::new(Lexer::new(source)).parse_program()
    }

    #[test]
    fn test_simple_function() {
        let program = parse("int main() { int x; x = 3; }").unwrap();

        assert_eq!(program.decls.len(), 1);
        let Decl::Fn(f) = &program.decls[0] else {
            panic!("expected function");
        };
        assert_eq!(f.id.name, "main");
        assert!(f.formals.is_empty());
        assert_eq!(f.body.decls.len(), 1);
        assert_eq!(f.body.stmts.len(), 1);
    }

    #[test]
    fn test_struct_decl_and_struct_var() {
        let program = parse("struct P { int a; bool b; }; struct P p;").unwrap();

        assert_eq!(program.decls.len(), 2);
        let Decl::Struct(s) = &program.decls[0] else {
            panic!("expected struct decl");
        };
        assert_eq!(s.id.name, "P");
        assert_eq!(s.fields.len(), 2);

        let Decl::Var(v) = &program.decls[1] else {
            panic!("expected var decl");
        };
        assert!(matches!(&v.ty, Type::Struct(id) if id.name == "P"));
        assert_eq!(v.size, 0);
    }

    #[test]
    fn test_dot_chain_nests_left() {
        let program = parse("int main() { a.b.c = 1; }").unwrap();

        let Decl::Fn(f) = &program.decls[0] else {
            panic!()
        };
        let Stmt::Assign(assign) = &f.body.stmts[0] else {
            panic!("expected assignment");
        };
        let Expr::Dot(outer) = &assign.lhs else {
            panic!("expected dot access");
        };
        assert_eq!(outer.field.name, "c");
        let Expr::Dot(inner) = &outer.loc else {
            panic!("expected nested dot access");
        };
        assert_eq!(inner.field.name, "b");
        assert!(matches!(&inner.loc, Expr::Id(id) if id.name == "a"));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let program = parse("int main() { x = y = 1; }").unwrap();

        let Decl::Fn(f) = &program.decls[0] else {
            panic!()
        };
        let Stmt::Assign(outer) = &f.body.stmts[0] else {
            panic!()
        };
        assert!(matches!(&outer.lhs, Expr::Id(id) if id.name == "x"));
        assert!(matches!(&outer.rhs, Expr::Assign(_)));
    }

    #[test]
    fn test_relational_is_non_associative() {
        assert!(parse("int main() { x = a < b < c; }").is_err());
    }

    #[test]
    fn test_assign_to_non_location_rejected() {
        assert!(parse("int main() { 3 = x; }").is_err());
    }

    #[test]
    fn test_if_else_and_while() {
        let program = parse(
            "int main() { \
                if (a < 3) { int b; b = 1; } else { b = 2; } \
                while (true) { a++; } \
            }",
        )
        .unwrap();

        let Decl::Fn(f) = &program.decls[0] else {
            panic!()
        };
        assert!(matches!(&f.body.stmts[0], Stmt::IfElse(s) if s.then_decls.len() == 1));
        assert!(matches!(&f.body.stmts[1], Stmt::While(_)));
    }

    #[test]
    fn test_io_statements() {
        let program = parse("int main() { cin >> x; cout << x + 1; }").unwrap();

        let Decl::Fn(f) = &program.decls[0] else {
            panic!()
        };
        assert!(matches!(&f.body.stmts[0], Stmt::Read(Expr::Id(_))));
        assert!(matches!(&f.body.stmts[1], Stmt::Write(Expr::Binary { .. })));
    }

    #[test]
    fn test_call_statement_and_expression() {
        let program = parse("int main() { f(); x = g(1, y); }").unwrap();

        let Decl::Fn(f) = &program.decls[0] else {
            panic!()
        };
        assert!(matches!(&f.body.stmts[0], Stmt::Call(c) if c.callee.name == "f"));
        let Stmt::Assign(assign) = &f.body.stmts[1] else {
            panic!()
        };
        assert!(matches!(&assign.rhs, Expr::Call(c) if c.args.len() == 2));
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let program = parse("int main() { x = 1 + 2 * 3; }").unwrap();

        let Decl::Fn(f) = &program.decls[0] else {
            panic!()
        };
        let Stmt::Assign(assign) = &f.body.stmts[0] else {
            panic!()
        };
        let Expr::Binary { op, rhs, .. } = &assign.rhs else {
            panic!()
        };
        assert_eq!(*op, BinOp::Plus);
        assert!(matches!(rhs.as_ref(), Expr::Binary { op: BinOp::Times, .. }));
    }

    #[test]
    fn test_fn_with_formals() {
        let program = parse("void f(int a, bool b) { }").unwrap();

        let Decl::Fn(f) = &program.decls[0] else {
            panic!()
        };
        assert_eq!(f.formals.len(), 2);
        assert!(matches!(f.ret, Type::Void));
    }

    #[test]
    fn test_parse_error_reports_position() {
        let err = parse("int main() { x = ; }").unwrap_err();
        assert_eq!(err.pos().line, 1);
    }

    #[test]
    fn test_unknown_character_rejected() {
        let err = parse("int main() { x = @; }").unwrap_err();
        assert!(matches!(err, Error::UnknownChar { ch: '@', .. }));
    }

    #[test]
    fn test_literals_carry_positions() {
        let program = parse("int main() { cout << \"hi\";\ncout << 42; x = true; }").unwrap();

        let Decl::Fn(f) = &program.decls[0] else {
            panic!()
        };
        let Stmt::Write(Expr::StrLit(s)) = &f.body.stmts[0] else {
            panic!()
        };
        assert_eq!((s.pos.line, s.pos.col), (1, 22));
        let Stmt::Write(Expr::IntLit(n)) = &f.body.stmts[1] else {
            panic!()
        };
        assert_eq!((n.pos.line, n.pos.col), (2, 9));
        assert_eq!(n.value, 42);
        let Stmt::Assign(a) = &f.body.stmts[2] else {
            panic!()
        };
        let Expr::True(pos) = &a.rhs else {
            panic!()
        };
        assert_eq!(pos.line, 2);
    }
}
