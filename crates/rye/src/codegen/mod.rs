//! IR lowering.
//!
//! [`CodeGen`] is the single context threaded by reference through all of
//! lowering: the compilation-wide uniqueness counter, the lexical stack, a
//! read-only view of the class table, the append-only list of lifted lambda
//! functions, and the stack of enclosing loop exit labels. The submodules
//! split the work the same way the pipeline does: `expr` lowers
//! expressions, `stmt` lowers statements and loops, `emit` emits functions
//! and assembles the final module.

use crate::diagnostics::{Diagnostic, DiagnosticKind, did_you_mean};
use crate::ir;
use crate::types::{ClassTable, RyeType, Stack, StackRef};
use rye_ast as ast;

pub mod emit;
pub mod expr;
pub mod stmt;

pub use expr::{Calc, Outcome};

/// The lowering context for one compilation.
pub struct CodeGen<'a> {
    pub classes: &'a ClassTable,
    pub stack: Stack,
    /// Lambda functions lifted out of expression context, in lift order.
    pub lifted: Vec<ir::Function>,
    /// Monotonic counter behind every fresh label and SSA name. Survives
    /// stack shadowing and the loop engine's snapshot/restore.
    uniq: u32,
    /// Counter behind `lambda{k}` names; separate so lifted names stay
    /// dense.
    lambda_id: u32,
    /// Exit labels of the enclosing loops, innermost last.
    loop_ends: Vec<ir::Label>,
}

impl<'a> CodeGen<'a> {
    pub fn new(classes: &'a ClassTable) -> Self {
        CodeGen {
            classes,
            stack: Stack::new(),
            lifted: Vec::new(),
            uniq: 0,
            lambda_id: 0,
            loop_ends: Vec::new(),
        }
    }

    fn next_uniq(&mut self) -> u32 {
        let n = self.uniq;
        self.uniq += 1;
        n
    }

    pub(crate) fn fresh_label(&mut self) -> ir::Label {
        self.next_uniq()
    }

    /// A fresh SSA temporary name.
    pub(crate) fn fresh_tmp(&mut self) -> String {
        format!("t.{}", self.next_uniq())
    }

    /// A fresh SSA name derived from a source name.
    pub(crate) fn fresh_name(&mut self, base: &str) -> String {
        format!("{}.{}", base, self.next_uniq())
    }

    pub(crate) fn fresh_lambda_name(&mut self) -> String {
        let k = self.lambda_id;
        self.lambda_id += 1;
        format!("lambda{}", k)
    }

    /// Rebind `name` in the innermost scope under a fresh internal name;
    /// this is the SSA rename applied by declarations and assignments.
    pub(crate) fn stack_put(&mut self, name: &str, refr: StackRef) -> String {
        let internal = self.fresh_name(name);
        self.stack.define(name, &internal, refr);
        internal
    }

    /// Run `f` with the stack swapped for an empty one (lambda bodies see
    /// no enclosing locals). The uniqueness counter is untouched.
    pub(crate) fn shadowed<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::take(&mut self.stack);
        let out = f(self);
        self.stack = saved;
        out
    }

    pub(crate) fn push_loop_end(&mut self, end: ir::Label) {
        self.loop_ends.push(end);
    }

    pub(crate) fn pop_loop_end(&mut self) {
        self.loop_ends.pop();
    }

    /// The innermost loop's exit label. `break` outside a loop is a
    /// programmer error, not a user diagnostic.
    pub(crate) fn innermost_loop_end(&self) -> ir::Label {
        *self
            .loop_ends
            .last()
            .expect("'break' outside of a loop")
    }

    pub(crate) fn map_type(&self, t: &RyeType) -> ir::Type {
        map_type(self.classes, t)
    }

    /// Fail-fast type resolution against the current stack, for types
    /// written inside function bodies (declarations, lambda parameters).
    pub(crate) fn resolve_type(&mut self, t: &ast::TypeExpr) -> Result<RyeType, Diagnostic> {
        match &t.kind {
            ast::TypeExprKind::Int => Ok(RyeType::Int),
            ast::TypeExprKind::Bool => Ok(RyeType::Bool),
            ast::TypeExprKind::Float => Ok(RyeType::Float),
            ast::TypeExprKind::Void => Ok(RyeType::Void),
            ast::TypeExprKind::Function { ret, params } => {
                let ret = self.resolve_type(ret)?;
                let params = params
                    .iter()
                    .map(|p| self.resolve_type(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RyeType::Function(Box::new(ret), params))
            }
            ast::TypeExprKind::Named(name) => match self.stack.lookup(name) {
                Some(entry) => match &entry.refr {
                    StackRef::Class(id) => Ok(RyeType::Class(*id)),
                    _ => Err(Diagnostic::with_span(
                        DiagnosticKind::NotAClass { name: name.clone() },
                        t.span.clone(),
                    )),
                },
                None => Err(self.lookup_failure(name, t.span.clone())),
            },
        }
    }

    /// A lookup-failure diagnostic with a suggestion note when a visible
    /// name is a near miss.
    pub(crate) fn lookup_failure(&self, name: &str, span: ast::Span) -> Diagnostic {
        let mut d = Diagnostic::with_span(
            DiagnosticKind::LookupFailure {
                name: name.to_string(),
            },
            span,
        );
        if let Some(note) = did_you_mean(name, self.stack.visible_names()) {
            d = d.note(note);
        }
        d
    }
}

/// Map a resolved type to its IR representation. Classes become pointers
/// to their alias; function types become function pointers.
pub(crate) fn map_type(classes: &ClassTable, t: &RyeType) -> ir::Type {
    match t {
        RyeType::Int => ir::Type::I32,
        RyeType::Bool => ir::Type::I1,
        RyeType::Float => ir::Type::F64,
        RyeType::Void => ir::Type::Void,
        RyeType::Class(id) => ir::Type::Alias(classes.get(*id).internal.clone()).ptr(),
        RyeType::Function(ret, params) => ir::Type::Function {
            ret: Box::new(map_type(classes, ret)),
            params: params.iter().map(|p| map_type(classes, p)).collect(),
        }
        .ptr(),
    }
}

/// Whether a value of type `actual` satisfies the expectation `expected`.
/// Exact structural equality, with one carve-out: a void-returning function
/// expectation accepts any return type over the same argument list, so
/// lambdas with inferred returns fit function-typed slots.
pub(crate) fn types_match(expected: &RyeType, actual: &RyeType) -> bool {
    if expected == actual {
        return true;
    }
    match (expected, actual) {
        (RyeType::Function(ret_e, params_e), RyeType::Function(_, params_a)) => {
            ret_e.is_void() && params_e == params_a
        }
        _ => false,
    }
}

/// A function body under construction: basic blocks in emission order, the
/// last one open for appends. Blocks are allocated lazily so a construct
/// that emits nothing contributes no block at all.
#[derive(Debug, Default)]
pub(crate) struct Blocks {
    blocks: Vec<ir::Block>,
}

impl Blocks {
    pub fn new() -> Self {
        Blocks::default()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Open a new block with the given label; subsequent appends land in it.
    pub fn open(&mut self, label: ir::Label) {
        self.blocks.push(ir::Block {
            label,
            stmts: Vec::new(),
        });
    }

    /// Append statements to the current block, allocating a fresh block
    /// when none is open. Appending nothing allocates nothing, so constructs
    /// that lower to pure renames leave no block behind.
    pub fn append(&mut self, cg: &mut CodeGen, stmts: Vec<ir::Stmt>) {
        if stmts.is_empty() {
            return;
        }
        if self.blocks.is_empty() {
            let label = cg.fresh_label();
            self.open(label);
        }
        self.blocks
            .last_mut()
            .expect("current block")
            .stmts
            .extend(stmts);
    }

    /// The label of the current block, allocating an empty one when the
    /// list is empty.
    pub fn current_label(&mut self, cg: &mut CodeGen) -> ir::Label {
        if self.blocks.is_empty() {
            let label = cg.fresh_label();
            self.open(label);
        }
        self.blocks.last().expect("current block").label
    }

    /// Whether the current block already ends in a terminator.
    pub fn current_terminated(&self) -> bool {
        self.blocks
            .last()
            .is_some_and(|b| b.terminator().is_some())
    }

    /// Terminate the current block with `term` unless it already has a
    /// terminator; allocates a block when the list is empty.
    pub fn seal(&mut self, cg: &mut CodeGen, term: ir::Stmt) {
        if self.blocks.is_empty() {
            let label = cg.fresh_label();
            self.open(label);
        }
        let last = self.blocks.last_mut().expect("current block");
        if last.terminator().is_none() {
            last.stmts.push(term);
        }
    }

    pub fn first_label(&self) -> Option<ir::Label> {
        self.blocks.first().map(|b| b.label)
    }

    pub fn last_label(&self) -> Option<ir::Label> {
        self.blocks.last().map(|b| b.label)
    }

    /// Splice another block list after the current block; its last block
    /// becomes current.
    pub fn extend(&mut self, other: Blocks) {
        self.blocks.extend(other.blocks);
    }

    /// Finalise a function body: guarantee at least one block, close a
    /// fallen-through tail with an implicit `ret void` for void functions,
    /// and terminate every remaining open block with `unreachable`.
    pub fn finish(mut self, cg: &mut CodeGen, void_ret: bool) -> Vec<ir::Block> {
        if self.blocks.is_empty() {
            let label = cg.fresh_label();
            self.open(label);
        }
        let last = self.blocks.len() - 1;
        for (i, block) in self.blocks.iter_mut().enumerate() {
            if block.terminator().is_none() {
                if i == last && void_ret {
                    block.stmts.push(ir::Stmt::Ret { value: None });
                } else {
                    block.stmts.push(ir::Stmt::Unreachable);
                }
            }
        }
        self.blocks
    }
}
