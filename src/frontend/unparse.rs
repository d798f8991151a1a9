//! Annotated unparser for the harambe language
//!
//! Renders the analyzed tree back to source-like text. Every resolved
//! identifier use carries a `(type)` annotation; a resolved call target
//! carries its formal types and return type instead. Declared identifiers
//! stay bare, so stripping the annotations yields a re-parseable program.

use std::fmt::Write;

use crate::frontend::ast::*;

/// Unparse a program into a string
pub fn unparse(program: &Program) -> String {
    let mut u = Unparser { out: String::new() };
    u.program(program);
    u.out
}

const INDENT_STEP: usize = 4;

struct Unparser {
    out: String,
}

impl Unparser {
    fn program(&mut self, program: &Program) {
        for decl in &program.decls {
            self.decl(decl, 0);
        }
    }

    // ==================== Declarations ====================

    fn decl(&mut self, decl: &Decl, indent: usize) {
        match decl {
            Decl::Var(d) => self.var_decl(d, indent),
            Decl::Fn(d) => self.fn_decl(d, indent),
            Decl::Struct(d) => self.struct_decl(d, indent),
        }
    }

    fn var_decl(&mut self, d: &VarDecl, indent: usize) {
        self.indent(indent);
        self.ty(&d.ty);
        self.out.push(' ');
        self.id_decl(&d.id);
        self.out.push_str(";\n");
    }

    fn fn_decl(&mut self, d: &FnDecl, indent: usize) {
        self.indent(indent);
        self.ty(&d.ret);
        self.out.push(' ');
        self.id_decl(&d.id);
        self.out.push('(');
        for (i, formal) in d.formals.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.ty(&formal.ty);
            self.out.push(' ');
            self.id_decl(&formal.id);
        }
        self.out.push_str(") {\n");
        for v in &d.body.decls {
            self.var_decl(v, indent + INDENT_STEP);
        }
        for s in &d.body.stmts {
            self.stmt(s, indent + INDENT_STEP);
        }
        self.out.push_str("}\n\n");
    }

    fn struct_decl(&mut self, d: &StructDecl, indent: usize) {
        self.indent(indent);
        self.out.push_str("struct ");
        self.id_decl(&d.id);
        self.out.push_str("{\n");
        for field in &d.fields {
            self.var_decl(field, indent + INDENT_STEP);
        }
        self.indent(indent);
        self.out.push_str("};\n\n");
    }

    fn ty(&mut self, ty: &Type) {
        match ty {
            Type::Int => self.out.push_str("int"),
            Type::Bool => self.out.push_str("bool"),
            Type::Void => self.out.push_str("void"),
            Type::Struct(id) => {
                self.out.push_str("struct ");
                self.id_use(id);
            }
        }
    }

    // ==================== Statements ====================

    fn stmt(&mut self, stmt: &Stmt, indent: usize) {
        match stmt {
            Stmt::Assign(a) => {
                self.indent(indent);
                self.assign(a, false);
                self.out.push_str(";\n");
            }
            Stmt::PostInc(e) => {
                self.indent(indent);
                self.expr(e);
                self.out.push_str("++;\n");
            }
            Stmt::PostDec(e) => {
                self.indent(indent);
                self.expr(e);
                self.out.push_str("--;\n");
            }
            Stmt::Read(e) => {
                self.indent(indent);
                self.out.push_str("cin >> ");
                self.expr(e);
                self.out.push_str(";\n");
            }
            Stmt::Write(e) => {
                self.indent(indent);
                self.out.push_str("cout << ");
                self.expr(e);
                self.out.push_str(";\n");
            }
            Stmt::If(s) => {
                self.indent(indent);
                self.out.push_str("if (");
                self.expr(&s.cond);
                self.out.push_str(") {\n");
                self.block(&s.decls, &s.stmts, indent + INDENT_STEP);
                self.indent(indent);
                self.out.push_str("}\n");
            }
            Stmt::IfElse(s) => {
                self.indent(indent);
                self.out.push_str("if (");
                self.expr(&s.cond);
                self.out.push_str(") {\n");
                self.block(&s.then_decls, &s.then_stmts, indent + INDENT_STEP);
                self.indent(indent);
                self.out.push_str("}\n");
                self.indent(indent);
                self.out.push_str("else {\n");
                self.block(&s.else_decls, &s.else_stmts, indent + INDENT_STEP);
                self.indent(indent);
                self.out.push_str("}\n");
            }
            Stmt::While(s) => {
                self.indent(indent);
                self.out.push_str("while (");
                self.expr(&s.cond);
                self.out.push_str(") {\n");
                self.block(&s.decls, &s.stmts, indent + INDENT_STEP);
                self.indent(indent);
                self.out.push_str("}\n");
            }
            Stmt::Call(c) => {
                self.indent(indent);
                self.call(c);
                self.out.push_str(";\n");
            }
            Stmt::Return(e) => {
                self.indent(indent);
                self.out.push_str("return");
                if let Some(e) = e {
                    self.out.push(' ');
                    self.expr(e);
                }
                self.out.push_str(";\n");
            }
        }
    }

    fn block(&mut self, decls: &[VarDecl], stmts: &[Stmt], indent: usize) {
        for d in decls {
            self.var_decl(d, indent);
        }
        for s in stmts {
            self.stmt(s, indent);
        }
    }

    // ==================== Expressions ====================

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::IntLit(lit) => {
                let _ = write!(self.out, "{}", lit.value);
            }
            Expr::StrLit(lit) => self.out.push_str(&lit.value),
            Expr::True(_) => self.out.push_str("true"),
            Expr::False(_) => self.out.push_str("false"),
            Expr::Id(id) => self.id_use(id),
            Expr::Dot(d) => {
                self.out.push('(');
                self.expr(&d.loc);
                self.out.push_str(").");
                self.id_use(&d.field);
            }
            Expr::Assign(a) => self.assign(a, true),
            Expr::Call(c) => self.call(c),
            Expr::Unary { op, operand } => {
                self.out.push('(');
                self.out.push_str(match op {
                    UnOp::Neg => "-",
                    UnOp::Not => "!",
                });
                self.expr(operand);
                self.out.push(')');
            }
            Expr::Binary { op, lhs, rhs } => {
                self.out.push('(');
                self.expr(lhs);
                let _ = write!(self.out, " {} ", bin_op_str(*op));
                self.expr(rhs);
                self.out.push(')');
            }
        }
    }

    /// Assignments parenthesize as inner expressions but not at statement
    /// level
    fn assign(&mut self, a: &AssignExpr, parens: bool) {
        if parens {
            self.out.push('(');
        }
        self.expr(&a.lhs);
        self.out.push_str(" = ");
        self.expr(&a.rhs);
        if parens {
            self.out.push(')');
        }
    }

    fn call(&mut self, c: &CallExpr) {
        self.id_call(&c.callee);
        self.out.push('(');
        for (i, arg) in c.args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(arg);
        }
        self.out.push(')');
    }

    // ==================== Identifiers ====================

    /// A declared identifier renders bare
    fn id_decl(&mut self, id: &Id) {
        self.out.push_str(&id.name);
    }

    /// A resolved use renders `name(type)`; an unresolved one (already
    /// diagnosed) stays bare
    fn id_use(&mut self, id: &Id) {
        self.out.push_str(&id.name);
        if let Some(ty) = &id.resolved_ty {
            let _ = write!(self.out, "({ty})");
        }
    }

    /// A resolved call target renders `name(T1, T2->ret)`. A callee
    /// without a formal list (not a function) omits the list but keeps
    /// the arrow and type.
    fn id_call(&mut self, id: &Id) {
        self.out.push_str(&id.name);
        let Some(ty) = &id.resolved_ty else {
            return;
        };
        self.out.push('(');
        if let Some(formals) = id.sym.as_ref().and_then(|sym| sym.formal_types()) {
            for (i, formal) in formals.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                let _ = write!(self.out, "{formal}");
            }
        }
        let _ = write!(self.out, "->{ty})");
    }

    fn indent(&mut self, n: usize) {
        for _ in 0..n {
            self.out.push(' ');
        }
    }
}

fn bin_op_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Plus => "+",
        BinOp::Minus => "-",
        BinOp::Times => "*",
        BinOp::Divide => "/",
        BinOp::And => "&&",
        BinOp::Or => "||",
        BinOp::Equals => "==",
        BinOp::NotEquals => "!=",
        BinOp::Less => "<",
        BinOp::Greater => ">",
        BinOp::LessEq => "<=",
        BinOp::GreaterEq => ">=",
    }
}
