//! Abstract syntax tree for the harambe language
//!
//! The parser builds the tree; name analysis fills the resolution fields
//! of `Id` nodes exactly once and never changes the tree's shape. No node
//! other than `Id` carries a symbol reference.

use std::rc::Rc;

use crate::frontend::symtab::{FieldMap, Sym};
use crate::utils::Pos;

/// A complete program (compilation unit)
#[derive(Debug)]
pub struct Program {
    pub decls: Vec<Decl>,
}

/// Top-level declarations
#[derive(Debug)]
pub enum Decl {
    Var(VarDecl),
    Fn(FnDecl),
    Struct(StructDecl),
}

/// Variable declaration: `int x;` or `struct P p;`
#[derive(Debug)]
pub struct VarDecl {
    pub ty: Type,
    pub id: Id,
    /// Size tag reserved for later phases: `NOT_STRUCT` for primitive
    /// declarations, 0 for struct-typed ones
    pub size: i32,
}

impl VarDecl {
    pub const NOT_STRUCT: i32 = -1;
}

/// Function declaration
#[derive(Debug)]
pub struct FnDecl {
    pub ret: Type,
    pub id: Id,
    pub formals: Vec<FormalDecl>,
    pub body: FnBody,
}

/// Formal parameter
#[derive(Debug)]
pub struct FormalDecl {
    pub ty: Type,
    pub id: Id,
}

/// Function body: local declarations followed by statements. The body does
/// not open its own scope; the enclosing declaration does.
#[derive(Debug)]
pub struct FnBody {
    pub decls: Vec<VarDecl>,
    pub stmts: Vec<Stmt>,
}

/// Struct type declaration
#[derive(Debug)]
pub struct StructDecl {
    pub id: Id,
    pub fields: Vec<VarDecl>,
}

/// Type syntax
#[derive(Debug)]
pub enum Type {
    Int,
    Bool,
    Void,
    Struct(Id),
}

/// Statements. `If`, `IfElse` and `While` blocks carry their own
/// declaration list and open a block scope.
#[derive(Debug)]
pub enum Stmt {
    Assign(AssignExpr),
    PostInc(Expr),
    PostDec(Expr),
    Read(Expr),
    Write(Expr),
    If(IfStmt),
    IfElse(IfElseStmt),
    While(WhileStmt),
    Call(CallExpr),
    Return(Option<Expr>),
}

#[derive(Debug)]
pub struct IfStmt {
    pub cond: Expr,
    pub decls: Vec<VarDecl>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug)]
pub struct IfElseStmt {
    pub cond: Expr,
    pub then_decls: Vec<VarDecl>,
    pub then_stmts: Vec<Stmt>,
    pub else_decls: Vec<VarDecl>,
    pub else_stmts: Vec<Stmt>,
}

#[derive(Debug)]
pub struct WhileStmt {
    pub cond: Expr,
    pub decls: Vec<VarDecl>,
    pub stmts: Vec<Stmt>,
}

/// Expressions
#[derive(Debug)]
pub enum Expr {
    IntLit(IntLit),
    StrLit(StrLit),
    True(Pos),
    False(Pos),
    Id(Id),
    Dot(Box<DotAccess>),
    Assign(Box<AssignExpr>),
    Call(CallExpr),
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Integer literal
#[derive(Debug)]
pub struct IntLit {
    pub value: i32,
    pub pos: Pos,
}

/// String literal; holds the raw lexeme, quotes included
#[derive(Debug)]
pub struct StrLit {
    pub value: String,
    pub pos: Pos,
}

/// Field access: `(loc).field`
#[derive(Debug)]
pub struct DotAccess {
    pub loc: Expr,
    pub field: Id,
}

/// Assignment: `loc = exp`
#[derive(Debug)]
pub struct AssignExpr {
    pub lhs: Expr,
    pub rhs: Expr,
}

/// Function call: the callee is always a plain identifier
#[derive(Debug)]
pub struct CallExpr {
    pub callee: Id,
    pub args: Vec<Expr>,
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Logical not (!)
    Not,
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Plus,
    Minus,
    Times,
    Divide,
    And,
    Or,
    Equals,
    NotEquals,
    Less,
    Greater,
    LessEq,
    GreaterEq,
}

/// An identifier occurrence, with the resolution results attached by name
/// analysis
#[derive(Debug)]
pub struct Id {
    pub name: String,
    pub pos: Pos,
    /// Resolved symbol, if the occurrence resolved
    pub sym: Option<Rc<Sym>>,
    /// Resolved type string, rendered in unparse annotations
    pub resolved_ty: Option<String>,
    /// Field map of this occurrence's struct type; set on the right-hand
    /// identifier of a dot access to allow chained accesses to continue
    pub fields: Option<Rc<FieldMap>>,
}

impl Id {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Self {
            name: name.into(),
            pos,
            sym: None,
            resolved_ty: None,
            fields: None,
        }
    }
}
