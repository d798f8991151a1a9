//! Symbol records and the scoped symbol table
//!
//! Symbols describe named program elements (variables, functions, struct
//! types). Variables of struct type share their struct's field map by
//! reference; the map itself is owned by the struct-type symbol.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Declared type of a symbol, kept as a tag until rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    Int,
    Bool,
    Void,
    /// An instance of the struct type with the given name
    Struct(String),
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Int => write!(f, "int"),
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::Void => write!(f, "void"),
            TypeTag::Struct(name) => write!(f, "{name}"),
        }
    }
}

/// Field layout of a struct type: name/symbol pairs in declaration order.
/// Declaration order is what makes diagnostics reproducible, so this is a
/// vector rather than a map.
pub type FieldMap = Vec<(String, Rc<Sym>)>;

/// A symbol-table record
#[derive(Debug)]
pub enum Sym {
    /// A variable or formal. `fields` is populated when the declared type
    /// is a struct, and shares the struct symbol's map.
    Var {
        ty: TypeTag,
        fields: Option<Rc<FieldMap>>,
    },
    /// A function, with its return type and formal types in declaration
    /// order
    Fn { ret: TypeTag, formals: Vec<TypeTag> },
    /// A struct type declaration, owning the field layout
    Struct { fields: Rc<FieldMap> },
}

impl Sym {
    pub fn var(ty: TypeTag) -> Sym {
        Sym::Var { ty, fields: None }
    }

    pub fn struct_var(ty: TypeTag, fields: Rc<FieldMap>) -> Sym {
        Sym::Var {
            ty,
            fields: Some(fields),
        }
    }

    pub fn func(ret: TypeTag, formals: Vec<TypeTag>) -> Sym {
        Sym::Fn { ret, formals }
    }

    pub fn struct_ty(fields: FieldMap) -> Sym {
        Sym::Struct {
            fields: Rc::new(fields),
        }
    }

    /// The type string attached to uses of this symbol: the declared type
    /// for variables, the return type for functions, and the literal
    /// `struct` for struct-type names.
    pub fn type_str(&self) -> String {
        match self {
            Sym::Var { ty, .. } => ty.to_string(),
            Sym::Fn { ret, .. } => ret.to_string(),
            Sym::Struct { .. } => "struct".to_string(),
        }
    }

    /// Formal types, for function symbols only
    pub fn formal_types(&self) -> Option<&[TypeTag]> {
        match self {
            Sym::Fn { formals, .. } => Some(formals),
            _ => None,
        }
    }

    /// The field map, for struct-type symbols and struct-typed variables
    pub fn fields(&self) -> Option<&Rc<FieldMap>> {
        match self {
            Sym::Var { fields, .. } => fields.as_ref(),
            Sym::Struct { fields } => Some(fields),
            Sym::Fn { .. } => None,
        }
    }
}

/// Symbol-table contract violations. These signal analyzer bugs, not
/// source-program errors, and callers catch them at the call site.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymTabError {
    #[error("no scope is currently open")]
    EmptyScopeStack,
    #[error("`{0}` is already declared in the innermost scope")]
    DuplicateInScope(String),
    #[error("empty declaration name")]
    EmptyName,
}

/// A stack of lexical scopes, each mapping names to symbols. The innermost
/// scope is the last element.
#[derive(Debug)]
pub struct SymTable {
    scopes: Vec<HashMap<String, Rc<Sym>>>,
}

impl Default for SymTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymTable {
    /// Create a table with a single empty scope
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// Open a fresh innermost scope
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Close the innermost scope
    pub fn pop_scope(&mut self) -> Result<(), SymTabError> {
        self.scopes.pop().map(|_| ()).ok_or(SymTabError::EmptyScopeStack)
    }

    /// Declare a symbol in the innermost scope. Never touches outer
    /// scopes, and refuses to replace an existing binding.
    pub fn declare(&mut self, name: &str, sym: Rc<Sym>) -> Result<(), SymTabError> {
        if name.is_empty() {
            return Err(SymTabError::EmptyName);
        }
        let scope = self.scopes.last_mut().ok_or(SymTabError::EmptyScopeStack)?;
        if scope.contains_key(name) {
            return Err(SymTabError::DuplicateInScope(name.to_string()));
        }
        scope.insert(name.to_string(), sym);
        Ok(())
    }

    /// Look a name up in the innermost scope only
    pub fn lookup_local(&self, name: &str) -> Option<&Rc<Sym>> {
        self.scopes.last().and_then(|scope| scope.get(name))
    }

    /// Look a name up from the innermost scope outward; inner bindings
    /// shadow outer ones
    pub fn lookup_global(&self, name: &str) -> Option<&Rc<Sym>> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Number of open scopes
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}
