//! Top-level name resolution.
//!
//! Walks the definition list and produces the top scope plus the class
//! table, or every diagnostic the walk collected. Unlike lowering, the
//! resolver never short-circuits: a broken definition is recorded and the
//! walk continues, so one pass reports all top-level problems.
//!
//! Class bodies may refer to their own class and to sibling classes. The
//! walk therefore runs in two phases per definition list: first every class
//! name is bound to a freshly allocated class ID, then bodies and
//! signatures are resolved with those bindings already in scope.

use crate::diagnostics::{Diagnostic, DiagnosticKind, did_you_mean};
use crate::types::{ClassId, ClassTable, RyeType, Scope, Stack, StackRef};
use rye_ast as ast;

/// Resolve a program's top-level definitions.
pub fn resolve_program(defs: &[ast::Definition]) -> Result<(Scope, ClassTable), Vec<Diagnostic>> {
    let mut r = Resolver {
        stack: Stack::new(),
        classes: ClassTable::new(),
        errors: Vec::new(),
    };
    let top = r.resolve_defs(defs);
    if r.errors.is_empty() {
        Ok((top, r.classes))
    } else {
        Err(r.errors)
    }
}

struct Resolver {
    stack: Stack,
    classes: ClassTable,
    errors: Vec<Diagnostic>,
}

impl Resolver {
    /// Resolve one definition list into a scope. Used for the top level
    /// and, recursively, for class bodies (where the returned scope is the
    /// member scope).
    fn resolve_defs(&mut self, defs: &[ast::Definition]) -> Scope {
        self.stack.push();

        // Phase one: bind every class name before walking any body, so a
        // class can reference itself and later siblings.
        let mut class_ids: Vec<Option<ClassId>> = Vec::with_capacity(defs.len());
        for def in defs {
            if let ast::Definition::Class(c) = def {
                let id = self.classes.alloc(&c.ident.name, &c.ident.name);
                self.stack
                    .define(&c.ident.name, &c.ident.name, StackRef::Class(id));
                class_ids.push(Some(id));
            } else {
                class_ids.push(None);
            }
        }

        // Phase two: resolve bodies and signatures with the class bindings
        // in scope.
        for (def, id) in defs.iter().zip(class_ids) {
            match def {
                ast::Definition::Variable(v) => {
                    if let Some(tp) = self.resolve_type(&v.ty) {
                        for name in &v.names {
                            self.stack.alloc(&name.name, tp.clone());
                        }
                    }
                }
                ast::Definition::Class(c) => {
                    let members = self.resolve_defs(&c.body);
                    self.classes
                        .set_members(id.expect("class id allocated in phase one"), members);
                }
                ast::Definition::Function(fd) => {
                    let ret = self.resolve_type(&fd.return_type);
                    let mut params = Vec::with_capacity(fd.params.len());
                    for p in &fd.params {
                        params.push(self.resolve_type(&p.ty));
                    }
                    if let Some(ret) = ret
                        && let Some(params) = params.into_iter().collect::<Option<Vec<_>>>()
                    {
                        self.stack.define(
                            &fd.ident.name,
                            &fd.ident.name,
                            StackRef::Function(ret, params),
                        );
                    }
                }
                ast::Definition::Import(_) => {
                    // Imports contribute nothing; cross-unit linking is
                    // handled outside the core.
                }
            }
        }

        self.stack.pop_owned()
    }

    /// Resolve written type syntax against the ambient stack. Returns
    /// `None` after recording a diagnostic.
    fn resolve_type(&mut self, t: &ast::TypeExpr) -> Option<RyeType> {
        match &t.kind {
            ast::TypeExprKind::Int => Some(RyeType::Int),
            ast::TypeExprKind::Bool => Some(RyeType::Bool),
            ast::TypeExprKind::Float => Some(RyeType::Float),
            ast::TypeExprKind::Void => Some(RyeType::Void),
            ast::TypeExprKind::Function { ret, params } => {
                let ret = self.resolve_type(ret);
                let params: Option<Vec<_>> =
                    params.iter().map(|p| self.resolve_type(p)).collect();
                match (ret, params) {
                    (Some(ret), Some(params)) => {
                        Some(RyeType::Function(Box::new(ret), params))
                    }
                    _ => None,
                }
            }
            ast::TypeExprKind::Named(name) => match self.stack.lookup(name) {
                Some(entry) => match &entry.refr {
                    StackRef::Class(id) => Some(RyeType::Class(*id)),
                    _ => {
                        self.errors.push(Diagnostic::with_span(
                            DiagnosticKind::NotAClass { name: name.clone() },
                            t.span.clone(),
                        ));
                        None
                    }
                },
                None => {
                    let mut d = Diagnostic::with_span(
                        DiagnosticKind::LookupFailure { name: name.clone() },
                        t.span.clone(),
                    );
                    if let Some(note) = did_you_mean(name, self.stack.visible_names()) {
                        d = d.note(note);
                    }
                    self.errors.push(d);
                    None
                }
            },
        }
    }
}
