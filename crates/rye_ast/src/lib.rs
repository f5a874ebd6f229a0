//! Rye AST definitions
//!
//! This crate defines the abstract syntax tree (AST) for the Rye language.
//! It serves as the contract between the parser and the compiler core.

use std::ops::Range;

/// Represents a source code span as a byte range.
pub type Span = Range<usize>;

/// A parsed compilation unit: the ordered list of top-level definitions.
#[derive(Debug, Clone)]
pub struct Program {
    pub defs: Vec<Definition>,
    pub span: Span,
}

/// Top-level definitions.
#[derive(Debug, Clone)]
pub enum Definition {
    Variable(VarDef),
    Class(ClassDef),
    Function(FnDef),
    Import(ImportDef),
}

/// An identifier occurrence with its source location.
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// Top-level (or class member) variable definition: one type, one or more names.
#[derive(Debug, Clone)]
pub struct VarDef {
    pub ty: TypeExpr,
    pub names: Vec<Ident>,
    pub span: Span,
}

/// Class definition. The body is a list of member definitions; constructor
/// parameters are carried through from the parser but have no semantics in
/// the core pipeline yet.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub ident: Ident,
    pub params: Vec<Param>,
    pub body: Vec<Definition>,
    pub span: Span,
}

/// Function definition.
#[derive(Debug, Clone)]
pub struct FnDef {
    pub ident: Ident,
    pub return_type: TypeExpr,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A typed formal parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub ident: Ident,
    pub ty: TypeExpr,
    pub span: Span,
}

/// Import of another compilation unit by path.
#[derive(Debug, Clone)]
pub struct ImportDef {
    pub path: String,
    pub span: Span,
}

/// Type syntax as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExprKind {
    Int,
    Bool,
    Float,
    Void,
    /// A named (user-defined) type, resolved against the lexical stack.
    Named(String),
    /// A function type `fn(params) -> ret`, resolved structurally.
    Function {
        ret: Box<TypeExpr>,
        params: Vec<TypeExpr>,
    },
}

/// Statements.
#[derive(Debug, Clone)]
pub enum Stmt {
    Block(BlockStmt),
    Decl(DeclStmt),
    Return(ReturnStmt),
    If(IfStmt),
    While(WhileStmt),
    For(Box<ForStmt>),
    Expr(ExprStmt),
    Break(BreakStmt),
}

/// Braced statement block; opens a lexical scope.
#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// Local declaration `T name [= init];`.
#[derive(Debug, Clone)]
pub struct DeclStmt {
    pub ident: Ident,
    pub ty: TypeExpr,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Return statement with an optional value.
#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub arg: Option<Expr>,
    pub span: Span,
}

/// If statement.
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub test: Expr,
    pub cons: Box<Stmt>,
    pub alt: Option<Box<Stmt>>,
    pub span: Span,
}

/// While statement.
#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub test: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

/// For statement; every header slot is optional.
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub test: Option<Expr>,
    pub update: Option<Expr>,
    pub body: Box<Stmt>,
    pub span: Span,
}

/// Expression statement.
#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

/// Break out of the innermost enclosing loop.
#[derive(Debug, Clone)]
pub struct BreakStmt {
    pub span: Span,
}

/// Expressions.
#[derive(Debug, Clone)]
pub enum Expr {
    Int(IntLit),
    Id(IdExpr),
    Assign(Box<AssignExpr>),
    Bin(Box<BinExpr>),
    Call(Box<CallExpr>),
    Lambda(Box<LambdaExpr>),
    Index(Box<IndexExpr>),
}

impl Expr {
    /// The source span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(e) => e.span.clone(),
            Expr::Id(e) => e.span.clone(),
            Expr::Assign(e) => e.span.clone(),
            Expr::Bin(e) => e.span.clone(),
            Expr::Call(e) => e.span.clone(),
            Expr::Lambda(e) => e.span.clone(),
            Expr::Index(e) => e.span.clone(),
        }
    }
}

/// Integer literal.
#[derive(Debug, Clone)]
pub struct IntLit {
    pub value: i64,
    pub span: Span,
}

/// Identifier expression carrying a (possibly qualified) name.
#[derive(Debug, Clone)]
pub struct IdExpr {
    pub id: ConstId,
    pub span: Span,
}

/// A qualified identifier. `absolute` marks a leading path separator; only
/// the first path segment participates in name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstId {
    pub absolute: bool,
    pub path: Vec<String>,
}

impl ConstId {
    pub fn plain(name: impl Into<String>) -> Self {
        ConstId {
            absolute: false,
            path: vec![name.into()],
        }
    }

    /// The first path segment, the only one consulted by name lookup.
    pub fn head(&self) -> &str {
        &self.path[0]
    }
}

/// Assignment expression `target op value`.
#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub op: AssignOp,
    pub target: Expr,
    pub value: Expr,
    pub span: Span,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// Plain `=`.
    Assign,
    /// Compound `+=`; parsed but not lowered.
    AddAssign,
}

/// Binary expression.
#[derive(Debug, Clone)]
pub struct BinExpr {
    pub op: BinOp,
    pub left: Expr,
    pub right: Expr,
    pub span: Span,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
}

/// Call expression `callee(args...)`; also covers `T()` constructor syntax.
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Expr,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// Lambda expression `(params) -> body`.
#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub params: Vec<Param>,
    pub body: Stmt,
    pub span: Span,
}

/// Index expression `object[index]`.
#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub object: Expr,
    pub index: Expr,
    pub span: Span,
}
