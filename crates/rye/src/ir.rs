//! The typed, block-structured SSA intermediate representation.
//!
//! This is the compiler's output contract: a self-contained data model the
//! backend printer/assembler consumes. The shapes mirror a small subset of
//! LLVM's module structure (type aliases, globals, fastcc functions made of
//! labelled basic blocks), but the types here carry no backend handles; the
//! [`fmt::Display`] impls render an assembler-oriented text form used by
//! tests and debugging output.

use std::fmt;

/// Basic block label. Fresh labels come from the compilation-wide
/// uniqueness counter.
pub type Label = u32;

/// IR-level types.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// 1-bit integer (booleans, branch conditions).
    I1,
    /// 32-bit integer (the source `int`).
    I32,
    /// 64-bit double (the source `float`).
    F64,
    Void,
    /// Pointer to a pointee type.
    Ptr(Box<Type>),
    /// A named type alias (one per class).
    Alias(String),
    /// Function type.
    Function { ret: Box<Type>, params: Vec<Type> },
}

impl Type {
    pub fn ptr(self) -> Type {
        Type::Ptr(Box::new(self))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::I1 => write!(f, "i1"),
            Type::I32 => write!(f, "i32"),
            Type::F64 => write!(f, "double"),
            Type::Void => write!(f, "void"),
            Type::Ptr(inner) => write!(f, "{}*", inner),
            Type::Alias(name) => write!(f, "%{}", name),
            Type::Function { ret, params } => {
                write!(f, "{} (", ret)?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// An SSA operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A function-local SSA name.
    Local(String),
    /// A module-level symbol (function or global slot).
    Global(String),
    ConstInt { ty: Type, value: i64 },
    ConstFloat(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Local(name) => write!(f, "%{}", name),
            Value::Global(name) => write!(f, "@{}", name),
            Value::ConstInt { value, .. } => write!(f, "{}", value),
            Value::ConstFloat(v) => write!(f, "{:?}", v),
        }
    }
}

/// Integer comparison conditions (signed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Slt,
    Sle,
    Sgt,
    Sge,
    Eq,
    Ne,
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cond::Slt => "slt",
            Cond::Sle => "sle",
            Cond::Sgt => "sgt",
            Cond::Sge => "sge",
            Cond::Eq => "eq",
            Cond::Ne => "ne",
        };
        write!(f, "{}", s)
    }
}

/// The right-hand side of an SSA assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Add { ty: Type, lhs: Value, rhs: Value },
    Sub { ty: Type, lhs: Value, rhs: Value },
    Mul { ty: Type, lhs: Value, rhs: Value },
    ICmp { cond: Cond, ty: Type, lhs: Value, rhs: Value },
    Load { ty: Type, addr: Value },
    /// Fastcc call; `ret` may be `Void`, in which case the assignment's
    /// destination is vacuous and elided from the rendering.
    Call { ret: Type, callee: Value, args: Vec<(Type, Value)> },
    /// Heap allocation of `count` instances of a class alias.
    Malloc { alias: String, count: u64 },
    /// φ-node: one incoming `(value, predecessor label)` pair per edge.
    Phi { ty: Type, incoming: Vec<(Value, Label)> },
}

/// Basic block statements. The last statement of every finalised block is
/// exactly one terminator.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { dst: String, expr: Expr },
    Store { ty: Type, value: Value, addr: Value },
    Ret { value: Option<(Type, Value)> },
    Br { target: Label },
    BrIf { cond: Value, then_label: Label, else_label: Label },
    Unreachable,
}

impl Stmt {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Stmt::Ret { .. } | Stmt::Br { .. } | Stmt::BrIf { .. } | Stmt::Unreachable
        )
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { dst, expr } => match expr {
                Expr::Add { ty, lhs, rhs } => {
                    write!(f, "%{} = add {} {}, {}", dst, ty, lhs, rhs)
                }
                Expr::Sub { ty, lhs, rhs } => {
                    write!(f, "%{} = sub {} {}, {}", dst, ty, lhs, rhs)
                }
                Expr::Mul { ty, lhs, rhs } => {
                    write!(f, "%{} = mul {} {}, {}", dst, ty, lhs, rhs)
                }
                Expr::ICmp { cond, ty, lhs, rhs } => {
                    write!(f, "%{} = icmp {} {} {}, {}", dst, cond, ty, lhs, rhs)
                }
                Expr::Load { ty, addr } => {
                    write!(f, "%{} = load {}, {}* {}", dst, ty, ty, addr)
                }
                Expr::Call { ret, callee, args } => {
                    if !ret.eq(&Type::Void) {
                        write!(f, "%{} = ", dst)?;
                    }
                    write!(f, "call fastcc {} {}(", ret, callee)?;
                    for (i, (ty, v)) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{} {}", ty, v)?;
                    }
                    write!(f, ")")
                }
                Expr::Malloc { alias, count } => {
                    write!(f, "%{} = malloc %{}, i32 {}", dst, alias, count)
                }
                Expr::Phi { ty, incoming } => {
                    write!(f, "%{} = phi {} ", dst, ty)?;
                    for (i, (v, label)) in incoming.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "[ {}, %L{} ]", v, label)?;
                    }
                    Ok(())
                }
            },
            Stmt::Store { ty, value, addr } => {
                write!(f, "store {} {}, {}* {}", ty, value, ty, addr)
            }
            Stmt::Ret { value: Some((ty, v)) } => write!(f, "ret {} {}", ty, v),
            Stmt::Ret { value: None } => write!(f, "ret void"),
            Stmt::Br { target } => write!(f, "br label %L{}", target),
            Stmt::BrIf {
                cond,
                then_label,
                else_label,
            } => write!(
                f,
                "br i1 {}, label %L{}, label %L{}",
                cond, then_label, else_label
            ),
            Stmt::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// A labelled basic block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub label: Label,
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn terminator(&self) -> Option<&Stmt> {
        self.stmts.last().filter(|s| s.is_terminator())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallConv {
    Fast,
}

/// A defined function: declaration fields plus named parameters, optional
/// attributes, and a basic-block body.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    pub callconv: CallConv,
    pub ret: Type,
    pub params: Vec<(Type, String)>,
    pub variadic: bool,
    pub align: Option<u32>,
    /// Collector tag; `"shadow-stack"` for top-level source functions.
    pub gc: Option<String>,
    pub section: Option<String>,
    pub blocks: Vec<Block>,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "define fastcc {} @{}(", self.ret, self.name)?;
        for (i, (ty, name)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} %{}", ty, name)?;
        }
        write!(f, ")")?;
        if let Some(gc) = &self.gc {
            write!(f, " gc \"{}\"", gc)?;
        }
        if let Some(section) = &self.section {
            write!(f, " section \"{}\"", section)?;
        }
        writeln!(f, " {{")?;
        for block in &self.blocks {
            writeln!(f, "L{}:", block.label)?;
            for stmt in &block.stmts {
                writeln!(f, "  {}", stmt)?;
            }
        }
        write!(f, "}}")
    }
}

/// A forward declaration of an external function.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub ret: Type,
    pub params: Vec<Type>,
    pub variadic: bool,
}

impl fmt::Display for FunctionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "declare fastcc {} @{}(", self.ret, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        if self.variadic {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ")")
    }
}

/// A named structural type alias; one per class.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAlias {
    pub name: String,
    pub fields: Vec<Type>,
}

impl fmt::Display for TypeAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{} = type {{ ", self.name)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, " }}")
    }
}

/// A zero-initialised module-level slot; one per top-level variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub ty: Type,
}

impl fmt::Display for Global {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} = global {} zeroinitializer", self.name, self.ty)
    }
}

/// A complete IR module in assembler-ready order: comments, aliases,
/// forward declarations, globals, functions.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub comments: Vec<String>,
    pub aliases: Vec<TypeAlias>,
    pub declarations: Vec<FunctionDecl>,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn alias(&self, name: &str) -> Option<&TypeAlias> {
        self.aliases.iter().find(|a| a.name == name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for comment in &self.comments {
            writeln!(f, "; {}", comment)?;
        }
        for alias in &self.aliases {
            writeln!(f, "{}", alias)?;
        }
        for decl in &self.declarations {
            writeln!(f, "{}", decl)?;
        }
        for global in &self.globals {
            writeln!(f, "{}", global)?;
        }
        for func in &self.functions {
            writeln!(f, "{}", func)?;
        }
        Ok(())
    }
}
