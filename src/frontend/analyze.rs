//! Name analysis for the harambe language
//!
//! Resolves every identifier occurrence against the scoped symbol table,
//! detects re-declarations and undeclared uses, and attaches symbols and
//! resolved-type strings to `Id` nodes. Diagnostics accumulate in the
//! sink; the walk never aborts on a source-program error.
//!
//! Which resolution rule applies to an identifier depends on its syntactic
//! context (declaration, use, dot-access side, call target), so the parent
//! node picks the role: the `decl_*` / `use_*` methods below take the `Id`
//! plus whatever context the role needs.

use std::rc::Rc;

use crate::frontend::ast::*;
use crate::frontend::diag::{Diag, DiagSink, NameErr};
use crate::frontend::symtab::{FieldMap, Sym, SymTable, TypeTag};

/// The name analyzer
pub struct NameAnalyzer {
    symtab: SymTable,
    diag: DiagSink,
}

impl NameAnalyzer {
    pub fn new() -> Self {
        Self {
            symtab: SymTable::new(),
            diag: DiagSink::new(),
        }
    }

    /// Analyze a program: open the global scope, walk every declaration,
    /// close it again
    pub fn analyze(&mut self, program: &mut Program) {
        self.symtab.push_scope();
        for decl in &mut program.decls {
            self.analyze_decl(decl);
        }
        self.pop_scope();
    }

    /// True once any diagnostic has been reported
    pub fn any_error(&self) -> bool {
        self.diag.any_error()
    }

    /// Diagnostics reported so far, in walk order
    pub fn diags(&self) -> &[Diag] {
        self.diag.diags()
    }

    /// Number of scopes currently open
    pub fn scope_depth(&self) -> usize {
        self.symtab.depth()
    }

    // ==================== Declarations ====================

    fn analyze_decl(&mut self, decl: &mut Decl) {
        match decl {
            Decl::Var(d) => self.analyze_var_decl(d),
            Decl::Fn(d) => self.analyze_fn_decl(d),
            Decl::Struct(d) => self.analyze_struct_decl(d),
        }
    }

    fn analyze_var_decl(&mut self, d: &mut VarDecl) {
        match &mut d.ty {
            Type::Struct(ty_id) => {
                let fields = self.use_struct_type(ty_id);
                let ty = TypeTag::Struct(ty_id.name.clone());
                self.decl_struct_var(&mut d.id, fields, ty);
            }
            Type::Int => self.decl_primitive(&mut d.id, TypeTag::Int),
            Type::Bool => self.decl_primitive(&mut d.id, TypeTag::Bool),
            Type::Void => self.decl_primitive(&mut d.id, TypeTag::Void),
        }
    }

    /// The function name is declared in the enclosing scope before the
    /// body's scope opens; formals declare into the body scope.
    fn analyze_fn_decl(&mut self, d: &mut FnDecl) {
        let ret = type_tag(&d.ret);
        let formal_tags = d.formals.iter().map(|f| type_tag(&f.ty)).collect();

        if let Type::Struct(ty_id) = &mut d.ret {
            self.use_struct_type(ty_id);
        }
        self.decl_fn(&mut d.id, formal_tags, ret);

        self.symtab.push_scope();
        for formal in &mut d.formals {
            if let Type::Struct(ty_id) = &mut formal.ty {
                self.use_struct_type(ty_id);
            }
            let tag = type_tag(&formal.ty);
            self.decl_primitive(&mut formal.id, tag);
        }
        for v in &mut d.body.decls {
            self.analyze_var_decl(v);
        }
        for s in &mut d.body.stmts {
            self.analyze_stmt(s);
        }
        self.pop_scope();
    }

    /// Field declarations are walked in a scratch scope; the scope's
    /// contents are then snapshotted, in declaration order, into the
    /// fields map that outlives it.
    fn analyze_struct_decl(&mut self, d: &mut StructDecl) {
        self.symtab.push_scope();
        for field in &mut d.fields {
            self.analyze_var_decl(field);
        }

        let mut fields: FieldMap = Vec::new();
        for field in &d.fields {
            let name = field.id.name.as_str();
            if fields.iter().any(|(n, _)| n == name) {
                continue;
            }
            if let Some(sym) = self.symtab.lookup_local(name) {
                fields.push((name.to_string(), sym.clone()));
            }
        }
        self.pop_scope();

        self.decl_struct(&mut d.id, fields);
    }

    // ==================== Statements ====================

    fn analyze_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Assign(a) => self.analyze_assign(a),
            Stmt::PostInc(e) | Stmt::PostDec(e) => self.analyze_expr(e),
            Stmt::Read(e) | Stmt::Write(e) => self.analyze_expr(e),
            Stmt::If(s) => {
                self.analyze_expr(&mut s.cond);
                self.analyze_block(&mut s.decls, &mut s.stmts);
            }
            Stmt::IfElse(s) => {
                self.analyze_expr(&mut s.cond);
                self.analyze_block(&mut s.then_decls, &mut s.then_stmts);
                self.analyze_block(&mut s.else_decls, &mut s.else_stmts);
            }
            Stmt::While(s) => {
                self.analyze_expr(&mut s.cond);
                self.analyze_block(&mut s.decls, &mut s.stmts);
            }
            Stmt::Call(c) => self.analyze_call(c),
            Stmt::Return(Some(e)) => self.analyze_expr(e),
            Stmt::Return(None) => {}
        }
    }

    fn analyze_block(&mut self, decls: &mut [VarDecl], stmts: &mut [Stmt]) {
        self.symtab.push_scope();
        for d in decls {
            self.analyze_var_decl(d);
        }
        for s in stmts {
            self.analyze_stmt(s);
        }
        self.pop_scope();
    }

    // ==================== Expressions ====================

    fn analyze_expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::IntLit(_) | Expr::StrLit(_) | Expr::True(_) | Expr::False(_) => {}
            Expr::Id(id) => self.use_plain(id),
            Expr::Dot(d) => self.analyze_dot(d),
            Expr::Assign(a) => self.analyze_assign(a),
            Expr::Call(c) => self.analyze_call(c),
            Expr::Unary { operand, .. } => self.analyze_expr(operand),
            Expr::Binary { lhs, rhs, .. } => {
                self.analyze_expr(lhs);
                self.analyze_expr(rhs);
            }
        }
    }

    fn analyze_assign(&mut self, a: &mut AssignExpr) {
        self.analyze_expr(&mut a.lhs);
        self.analyze_expr(&mut a.rhs);
    }

    fn analyze_call(&mut self, c: &mut CallExpr) {
        self.use_fn_call(&mut c.callee);
        for arg in &mut c.args {
            self.analyze_expr(arg);
        }
    }

    /// A dot access resolves its location first. A plain-identifier
    /// location is checked as a dot LHS and the field resolved through the
    /// location's symbol; a nested dot recurses and hands the inner
    /// field's map forward. The grammar permits nothing else on the left
    /// of a dot.
    fn analyze_dot(&mut self, d: &mut DotAccess) {
        match &mut d.loc {
            Expr::Id(lhs) => {
                self.use_lhs_of_dot(lhs);
                let lhs_name = lhs.name.clone();
                self.use_dot_rhs_by_name(&mut d.field, &lhs_name);
            }
            Expr::Dot(inner) => {
                self.analyze_dot(inner);
                let fields = inner.field.fields.clone();
                self.use_dot_rhs_by_fields(&mut d.field, fields);
            }
            _ => {}
        }
    }

    // ==================== Identifier roles ====================

    /// Declare a variable or formal of primitive (or struct-name) type.
    /// `void` is only legal on functions; the binding is withheld so later
    /// uses fault as undeclared rather than half-typed.
    fn decl_primitive(&mut self, id: &mut Id, ty: TypeTag) {
        if ty == TypeTag::Void {
            self.diag.report(id.pos, NameErr::NonFnVoid);
            return;
        }
        if self.symtab.lookup_local(&id.name).is_none() {
            self.declare(&id.name, Sym::var(ty));
        } else {
            self.diag.report(id.pos, NameErr::MultiplyDeclared);
        }
    }

    /// Declare a variable of a previously defined struct type. An
    /// unresolved struct type was already diagnosed at the type name; the
    /// variable is silently withheld to avoid cascading errors.
    fn decl_struct_var(&mut self, id: &mut Id, fields: Option<Rc<FieldMap>>, ty: TypeTag) {
        let Some(fields) = fields else {
            return;
        };
        if self.symtab.lookup_local(&id.name).is_none() {
            self.declare(&id.name, Sym::struct_var(ty, fields));
        } else {
            self.diag.report(id.pos, NameErr::MultiplyDeclared);
        }
    }

    /// Declare a function in the enclosing scope
    fn decl_fn(&mut self, id: &mut Id, formals: Vec<TypeTag>, ret: TypeTag) {
        if self.symtab.lookup_local(&id.name).is_none() {
            self.declare(&id.name, Sym::func(ret, formals));
        } else {
            self.diag.report(id.pos, NameErr::MultiplyDeclared);
        }
    }

    /// Declare a struct type, which owns its snapshotted field map
    fn decl_struct(&mut self, id: &mut Id, fields: FieldMap) {
        if self.symtab.lookup_local(&id.name).is_none() {
            self.declare(&id.name, Sym::struct_ty(fields));
        } else {
            self.diag.report(id.pos, NameErr::MultiplyDeclared);
        }
    }

    /// An ordinary use: resolve globally and record symbol and type
    fn use_plain(&mut self, id: &mut Id) {
        match self.symtab.lookup_global(&id.name).cloned() {
            Some(sym) => {
                id.resolved_ty = Some(sym.type_str());
                id.sym = Some(sym);
            }
            None => self.diag.report(id.pos, NameErr::Undeclared),
        }
    }

    /// The type name in `struct T x;`. Returns the struct's field map for
    /// the declaration role that follows.
    fn use_struct_type(&mut self, id: &mut Id) -> Option<Rc<FieldMap>> {
        match self.symtab.lookup_global(&id.name).cloned() {
            Some(sym) => {
                id.resolved_ty = Some(sym.type_str());
                let fields = sym.fields().cloned();
                id.sym = Some(sym);
                fields
            }
            None => {
                self.diag.report(id.pos, NameErr::InvalidStructType);
                None
            }
        }
    }

    /// The identifier on the left of a dot. Its resolved type must itself
    /// name something in scope, otherwise it cannot have fields.
    fn use_lhs_of_dot(&mut self, id: &mut Id) {
        match self.symtab.lookup_global(&id.name).cloned() {
            Some(sym) => {
                id.resolved_ty = Some(sym.type_str());
                if self.symtab.lookup_global(&sym.type_str()).is_none() {
                    self.diag.report(id.pos, NameErr::DotNonStruct);
                }
                id.sym = Some(sym);
            }
            None => self.diag.report(id.pos, NameErr::Undeclared),
        }
    }

    /// The field of a dot whose location is a plain identifier: resolve
    /// through the location's symbol. An unresolved location already
    /// reported; a location without fields cannot contain the name.
    fn use_dot_rhs_by_name(&mut self, id: &mut Id, lhs_name: &str) {
        let Some(sym) = self.symtab.lookup_global(lhs_name).cloned() else {
            return;
        };
        match sym.fields().cloned() {
            Some(fields) => self.resolve_field(id, &fields),
            None => self.diag.report(id.pos, NameErr::InvalidFieldName),
        }
    }

    /// The field of a dot whose location is itself a dot access: resolve
    /// against the map the inner field exposed
    fn use_dot_rhs_by_fields(&mut self, id: &mut Id, fields: Option<Rc<FieldMap>>) {
        match fields {
            Some(fields) => self.resolve_field(id, &fields),
            None => self.diag.report(id.pos, NameErr::DotNonStruct),
        }
    }

    /// Shared tail of both dot-RHS roles: find the field, record its type,
    /// and expose its own map when the field is struct-typed so a chained
    /// access can continue
    fn resolve_field(&mut self, id: &mut Id, fields: &Rc<FieldMap>) {
        match fields.iter().find(|(name, _)| name == &id.name) {
            Some((_, fsym)) => {
                id.resolved_ty = Some(fsym.type_str());
                id.fields = fsym.fields().cloned();
                id.sym = Some(fsym.clone());
            }
            None => self.diag.report(id.pos, NameErr::InvalidFieldName),
        }
    }

    /// A call target: resolve globally; the symbol carries the formal
    /// types the unparser annotates the call site with
    fn use_fn_call(&mut self, id: &mut Id) {
        match self.symtab.lookup_global(&id.name).cloned() {
            Some(sym) => {
                id.resolved_ty = Some(sym.type_str());
                id.sym = Some(sym);
            }
            None => self.diag.report(id.pos, NameErr::Undeclared),
        }
    }

    // ==================== Internal plumbing ====================

    /// Table errors here mean an analyzer bug (the roles check for
    /// duplicates before declaring); log and keep walking.
    fn declare(&mut self, name: &str, sym: Sym) {
        if let Err(err) = self.symtab.declare(name, Rc::new(sym)) {
            log::error!("declare of `{name}` failed: {err}");
        }
    }

    fn pop_scope(&mut self) {
        if let Err(err) = self.symtab.pop_scope() {
            log::error!("scope pop failed: {err}");
        }
    }
}

impl Default for NameAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn type_tag(ty: &Type) -> TypeTag {
    match ty {
        Type::Int => TypeTag::Int,
        Type::Bool => TypeTag::Bool,
        Type::Void => TypeTag::Void,
        Type::Struct(id) => TypeTag::Struct(id.name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;
    use crate::utils::Pos;

    fn analyze(source: &str) -> (Program, NameAnalyzer) {
        let mut program = Parser::new(Lexer::new(source))
            .parse_program()
            .expect("test source should parse");
        let mut analyzer = NameAnalyzer::new();
        analyzer.analyze(&mut program);
        (program, analyzer)
    }

    fn errs(analyzer: &NameAnalyzer) -> Vec<NameErr> {
        analyzer.diags().iter().map(|d| d.err).collect()
    }

    fn main_body(program: &Program) -> &FnBody {
        let f = program
            .decls
            .iter()
            .find_map(|d| match d {
                Decl::Fn(f) if f.id.name == "main" => Some(f),
                _ => None,
            })
            .expect("main function");
        &f.body
    }

    #[test]
    fn test_clean_program_has_no_diagnostics() {
        let (_, analyzer) = analyze("int main() { int x; x = 3; }");

        assert!(!analyzer.any_error());
        assert!(analyzer.diags().is_empty());
    }

    #[test]
    fn test_multiply_declared() {
        let (_, analyzer) = analyze("int main() { int x; int x; }");

        assert_eq!(errs(&analyzer), vec![NameErr::MultiplyDeclared]);
        // reported at the second x
        assert_eq!(analyzer.diags()[0].pos, Pos::new(1, 25));
    }

    #[test]
    fn test_undeclared_use() {
        let (_, analyzer) = analyze("int main() { y = 1; }");

        assert_eq!(errs(&analyzer), vec![NameErr::Undeclared]);
        assert_eq!(analyzer.diags()[0].pos, Pos::new(1, 14));
    }

    #[test]
    fn test_void_variable_not_declared() {
        let (_, analyzer) = analyze("void x; int main() { x = 3; }");

        // the void declaration is refused, so the later use is undeclared
        assert_eq!(errs(&analyzer), vec![NameErr::NonFnVoid, NameErr::Undeclared]);
    }

    #[test]
    fn test_invalid_struct_field() {
        let (_, analyzer) =
            analyze("struct P { int a; }; int main() { struct P p; p.a = 1; p.b = 2; }");

        assert_eq!(errs(&analyzer), vec![NameErr::InvalidFieldName]);
        // reported at b
        assert_eq!(analyzer.diags()[0].pos, Pos::new(1, 58));
    }

    #[test]
    fn test_undeclared_struct_type() {
        let (_, analyzer) = analyze("int main() { struct Q q; }");

        // only the type name faults; q is silently withheld
        assert_eq!(errs(&analyzer), vec![NameErr::InvalidStructType]);
        assert_eq!(analyzer.diags()[0].pos, Pos::new(1, 21));
    }

    #[test]
    fn test_scope_balance_after_analysis() {
        let (_, analyzer) =
            analyze("struct P { int a; }; int f(int n) { if (true) { int y; } } int main() { }");

        assert_eq!(analyzer.scope_depth(), 1);
    }

    #[test]
    fn test_shadowing_resolves_to_innermost() {
        let (program, analyzer) =
            analyze("int main() { int x; if (true) { bool x; x = true; } x = 3; }");

        assert!(!analyzer.any_error());
        let body = main_body(&program);

        let Stmt::If(if_stmt) = &body.stmts[0] else {
            panic!("expected if");
        };
        let Stmt::Assign(inner) = &if_stmt.stmts[0] else {
            panic!()
        };
        let Expr::Id(inner_x) = &inner.lhs else {
            panic!()
        };
        assert_eq!(inner_x.resolved_ty.as_deref(), Some("bool"));

        let Stmt::Assign(outer) = &body.stmts[1] else {
            panic!()
        };
        let Expr::Id(outer_x) = &outer.lhs else {
            panic!()
        };
        assert_eq!(outer_x.resolved_ty.as_deref(), Some("int"));
    }

    #[test]
    fn test_duplicate_keeps_original_binding() {
        let (program, analyzer) = analyze("int main() { int x; bool x; x = 3; }");

        assert_eq!(errs(&analyzer), vec![NameErr::MultiplyDeclared]);
        let body = main_body(&program);
        let Stmt::Assign(assign) = &body.stmts[0] else {
            panic!()
        };
        let Expr::Id(x) = &assign.lhs else {
            panic!()
        };
        assert_eq!(x.resolved_ty.as_deref(), Some("int"));
    }

    #[test]
    fn test_dot_access_of_non_struct() {
        let (_, analyzer) = analyze("int main() { int x; x.a = 1; }");

        // the location faults, then the field cannot resolve either
        assert_eq!(
            errs(&analyzer),
            vec![NameErr::DotNonStruct, NameErr::InvalidFieldName]
        );
    }

    #[test]
    fn test_chained_dot_access() {
        let (program, analyzer) = analyze(
            "struct Inner { int i; }; \
             struct Outer { struct Inner nested; }; \
             int main() { struct Outer o; o.nested.i = 3; }",
        );

        assert!(!analyzer.any_error());
        let body = main_body(&program);
        let Stmt::Assign(assign) = &body.stmts[0] else {
            panic!()
        };
        let Expr::Dot(outer) = &assign.lhs else {
            panic!()
        };
        assert_eq!(outer.field.resolved_ty.as_deref(), Some("int"));
        let Expr::Dot(inner) = &outer.loc else {
            panic!()
        };
        assert_eq!(inner.field.resolved_ty.as_deref(), Some("Inner"));
        assert!(inner.field.fields.is_some());
    }

    #[test]
    fn test_chained_dot_through_non_struct_field() {
        let (_, analyzer) = analyze(
            "struct P { int a; }; int main() { struct P p; p.a.b = 1; }",
        );

        // a is an int field, so the chained access has no map to search
        assert_eq!(errs(&analyzer), vec![NameErr::DotNonStruct]);
    }

    #[test]
    fn test_call_records_formal_types() {
        let (program, analyzer) =
            analyze("int f(int a, bool b) { return a; } int main() { f(1, true); }");

        assert!(!analyzer.any_error());
        let body = main_body(&program);
        let Stmt::Call(call) = &body.stmts[0] else {
            panic!()
        };
        assert_eq!(call.callee.resolved_ty.as_deref(), Some("int"));
        let formals = call.callee.sym.as_ref().unwrap().formal_types().unwrap();
        assert_eq!(formals, &[TypeTag::Int, TypeTag::Bool][..]);
    }

    #[test]
    fn test_undeclared_call_target() {
        let (_, analyzer) = analyze("int main() { f(); }");

        assert_eq!(errs(&analyzer), vec![NameErr::Undeclared]);
    }

    #[test]
    fn test_function_sees_itself_recursively() {
        let (_, analyzer) = analyze("int f(int n) { return f(n - 1); }");

        assert!(!analyzer.any_error());
    }

    #[test]
    fn test_formals_declare_into_body_scope() {
        let (_, analyzer) = analyze("int f(int n) { int n; } int main() { }");

        // the body-local n collides with the formal
        assert_eq!(errs(&analyzer), vec![NameErr::MultiplyDeclared]);
    }

    #[test]
    fn test_void_formal_reported() {
        let (_, analyzer) = analyze("int f(void v) { } int main() { }");

        assert_eq!(errs(&analyzer), vec![NameErr::NonFnVoid]);
    }

    #[test]
    fn test_struct_field_duplicate_keeps_first() {
        let (_, analyzer) = analyze(
            "struct P { int a; bool a; }; int main() { struct P p; p.a = 1; }",
        );

        // one report inside the struct body; p.a still resolves to the
        // first (int) field
        assert_eq!(errs(&analyzer), vec![NameErr::MultiplyDeclared]);
    }

    #[test]
    fn test_struct_name_usable_after_decl_only() {
        // a struct cannot reference itself while being declared
        let (_, analyzer) = analyze("struct R { struct R r; }; int main() { }");

        assert_eq!(errs(&analyzer), vec![NameErr::InvalidStructType]);
    }

    #[test]
    fn test_sibling_order_no_forward_references() {
        let (_, analyzer) = analyze("int main() { g(); } void g() { }");

        // g is declared after main, and source order is significant
        assert_eq!(errs(&analyzer), vec![NameErr::Undeclared]);
    }

    #[test]
    fn test_diagnostics_in_walk_order() {
        let (_, analyzer) = analyze("int main() { int x; int x; a = 1; b = 2; }");

        assert_eq!(
            errs(&analyzer),
            vec![
                NameErr::MultiplyDeclared,
                NameErr::Undeclared,
                NameErr::Undeclared
            ]
        );
        let positions: Vec<_> = analyzer.diags().iter().map(|d| d.pos.col).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_if_else_branches_scope_independently() {
        let (_, analyzer) = analyze(
            "int main() { if (true) { int y; } else { int y; } }",
        );

        assert!(!analyzer.any_error());
    }

    #[test]
    fn test_block_scope_closes() {
        let (_, analyzer) = analyze("int main() { while (true) { int y; } y = 1; }");

        assert_eq!(errs(&analyzer), vec![NameErr::Undeclared]);
    }
}
