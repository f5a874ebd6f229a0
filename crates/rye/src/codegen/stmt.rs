//! Statement lowering and the loop/φ engine.
//!
//! Statements accumulate into a [`Blocks`] builder; control-flow statements
//! terminate the current block and open fresh ones. Loops are the involved
//! case: the set of names written inside the loop is discovered
//! syntactically up front, each such local is rebound to a fresh φ variable
//! before the body is lowered, and the φ-nodes joining the pre-entry and
//! back-edge values are emitted into the loop's test block.

use super::{Blocks, CodeGen};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::ir;
use crate::types::{RyeType, Stack, StackRef};
use rye_ast as ast;

impl CodeGen<'_> {
    /// Lower a statement sequence. Statements after a terminator are
    /// unreachable and skipped.
    pub(crate) fn lower_stmts(
        &mut self,
        b: &mut Blocks,
        stmts: &[ast::Stmt],
        ret: &mut Option<RyeType>,
    ) -> Result<(), Diagnostic> {
        for stmt in stmts {
            self.lower_stmt(b, stmt, ret)?;
            if b.current_terminated() {
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn lower_stmt(
        &mut self,
        b: &mut Blocks,
        stmt: &ast::Stmt,
        ret: &mut Option<RyeType>,
    ) -> Result<(), Diagnostic> {
        match stmt {
            ast::Stmt::Block(block) => {
                self.stack.push();
                let result = self.lower_stmts(b, &block.stmts, ret);
                // The pop happens whether or not the body lowered.
                self.stack.pop();
                result
            }
            ast::Stmt::Decl(decl) => {
                let tp = self.resolve_type(&decl.ty)?;
                let value = match &decl.init {
                    Some(init) => {
                        let calc = self.lower_value(init, Some(&tp))?;
                        b.append(self, calc.prelude);
                        calc.value
                    }
                    None => default_value(&tp),
                };
                self.stack_put(&decl.ident.name, StackRef::Variable(tp, value));
                Ok(())
            }
            ast::Stmt::Return(ret_stmt) => match &ret_stmt.arg {
                None => match ret {
                    None | Some(RyeType::Void) => {
                        b.append(self, vec![ir::Stmt::Ret { value: None }]);
                        *ret = Some(RyeType::Void);
                        Ok(())
                    }
                    Some(expected) => Err(Diagnostic::with_span(
                        DiagnosticKind::WrongReturnType {
                            actual: RyeType::Void,
                            expected: expected.clone(),
                        },
                        ret_stmt.span.clone(),
                    )),
                },
                Some(arg) => {
                    let expect = ret.clone();
                    let calc = self.lower_value(arg, expect.as_ref())?;
                    let mut stmts = calc.prelude;
                    let value = if calc.ty.is_void() {
                        None
                    } else {
                        Some((self.map_type(&calc.ty), calc.value))
                    };
                    stmts.push(ir::Stmt::Ret { value });
                    b.append(self, stmts);
                    *ret = Some(calc.ty);
                    Ok(())
                }
            },
            ast::Stmt::Expr(expr_stmt) => {
                let calc = self.lower_value(&expr_stmt.expr, None)?;
                b.append(self, calc.prelude);
                Ok(())
            }
            ast::Stmt::Break(_) => {
                let end = self.innermost_loop_end();
                b.append(self, vec![ir::Stmt::Br { target: end }]);
                Ok(())
            }
            ast::Stmt::If(if_stmt) => self.lower_if(b, if_stmt, ret),
            ast::Stmt::While(while_stmt) => self.lower_loop(
                b,
                None,
                Some(&while_stmt.test),
                &[while_stmt.body.as_ref()],
                ret,
            ),
            ast::Stmt::For(for_stmt) => self.lower_for(b, for_stmt, ret),
        }
    }

    fn lower_if(
        &mut self,
        b: &mut Blocks,
        if_stmt: &ast::IfStmt,
        ret: &mut Option<RyeType>,
    ) -> Result<(), Diagnostic> {
        let end = self.fresh_label();
        let cond = self.lower_value(&if_stmt.test, Some(&RyeType::Bool))?;

        self.stack.push();
        let mut then_blocks = Blocks::new();
        let result = self.lower_stmt(&mut then_blocks, &if_stmt.cons, ret);
        self.stack.pop();
        result?;
        // A side that emitted nothing falls straight through to the end
        // block.
        let then_entry = if then_blocks.is_empty() {
            end
        } else {
            then_blocks.seal(self, ir::Stmt::Br { target: end });
            then_blocks.first_label().expect("then side has a block")
        };

        let mut else_blocks = Blocks::new();
        let else_entry = match &if_stmt.alt {
            Some(alt) => {
                self.stack.push();
                let result = self.lower_stmt(&mut else_blocks, alt, ret);
                self.stack.pop();
                result?;
                if else_blocks.is_empty() {
                    end
                } else {
                    else_blocks.seal(self, ir::Stmt::Br { target: end });
                    else_blocks.first_label().expect("else side has a block")
                }
            }
            None => end,
        };

        let mut stmts = cond.prelude;
        stmts.push(ir::Stmt::BrIf {
            cond: cond.value,
            then_label: then_entry,
            else_label: else_entry,
        });
        b.append(self, stmts);
        b.extend(then_blocks);
        b.extend(else_blocks);
        b.open(end);
        Ok(())
    }

    /// `for` desugars to `while`: init lowers first as a plain statement,
    /// the update is appended to the body, and the current block's label
    /// becomes the loop's start label so control enters the test without an
    /// intervening branch. A missing condition means an always-true test.
    fn lower_for(
        &mut self,
        b: &mut Blocks,
        for_stmt: &ast::ForStmt,
        ret: &mut Option<RyeType>,
    ) -> Result<(), Diagnostic> {
        if let Some(init) = &for_stmt.init {
            self.lower_stmt(b, init, ret)?;
        }
        let start = b.current_label(self);
        let update_stmt = for_stmt.update.as_ref().map(|u| {
            ast::Stmt::Expr(ast::ExprStmt {
                expr: u.clone(),
                span: u.span(),
            })
        });
        let mut body: Vec<&ast::Stmt> = vec![for_stmt.body.as_ref()];
        if let Some(u) = &update_stmt {
            body.push(u);
        }
        self.lower_loop(b, Some(start), for_stmt.test.as_ref(), &body, ret)
    }

    /// The while engine. `start` is the pre-entry predecessor label when
    /// inherited from `for`; otherwise a fresh start block is emitted.
    fn lower_loop(
        &mut self,
        b: &mut Blocks,
        start: Option<ir::Label>,
        cond: Option<&ast::Expr>,
        body: &[&ast::Stmt],
        ret: &mut Option<RyeType>,
    ) -> Result<(), Diagnostic> {
        let (start_label, fresh_start) = match start {
            Some(label) => (label, false),
            None => (self.fresh_label(), true),
        };
        let test_label = self.fresh_label();
        let end_label = self.fresh_label();

        // Names assigned anywhere in the condition or body, discovered
        // syntactically before anything is lowered.
        let mut writes = Vec::new();
        if let Some(c) = cond {
            expr_writes(c, &mut writes);
        }
        for s in body {
            stmt_writes(s, &mut writes);
        }

        // Rebind each written local to a fresh φ variable; the pre-entry
        // value is remembered for the φ's first incoming edge.
        let mut phis: Vec<(String, RyeType, ir::Value, String)> = Vec::new();
        for w in &writes {
            if let Some(entry) = self.stack.lookup(w)
                && let StackRef::Variable(tp, pre) = &entry.refr
            {
                let (tp, pre) = (tp.clone(), pre.clone());
                let phi_name = self.fresh_name(w);
                self.stack.define(
                    w,
                    &phi_name,
                    StackRef::Variable(tp.clone(), ir::Value::Local(phi_name.clone())),
                );
                phis.push((w.clone(), tp, pre, phi_name));
            }
        }
        let snapshot = self.stack.clone();

        self.push_loop_end(end_label);
        let mut body_blocks = Blocks::new();
        let mut result = Ok(());
        for s in body {
            result = self.lower_stmt(&mut body_blocks, s, ret);
            if result.is_err() || body_blocks.current_terminated() {
                break;
            }
        }
        self.pop_loop_end();
        result?;
        body_blocks.seal(self, ir::Stmt::Br { target: test_label });
        let loop_entry = body_blocks.first_label().expect("loop body has a block");
        let loop_tail = body_blocks.last_label().expect("loop body has a block");

        // Read the post-iteration value of every φ'd name; a name the body
        // never actually rebound joins with the φ value itself.
        let changes = Stack::diff(&snapshot, &self.stack);
        let mut test_stmts = Vec::new();
        for (name, tp, pre, phi_name) in &phis {
            let post = changes
                .iter()
                .rev()
                .find_map(|scope| scope.get(name))
                .and_then(|(_, new)| match new {
                    StackRef::Variable(_, value) => Some(value.clone()),
                    _ => None,
                })
                .unwrap_or(ir::Value::Local(phi_name.clone()));
            test_stmts.push(ir::Stmt::Assign {
                dst: phi_name.clone(),
                expr: ir::Expr::Phi {
                    ty: self.map_type(tp),
                    incoming: vec![(pre.clone(), start_label), (post, loop_tail)],
                },
            });
        }

        // Undo the body's rebinds but keep the φ bindings: the condition
        // and everything after the loop see the φ values. The uniqueness
        // counter is not part of the stack and keeps counting.
        self.stack = snapshot;

        let cond_value = match cond {
            Some(c) => {
                let calc = self.lower_value(c, Some(&RyeType::Bool))?;
                test_stmts.extend(calc.prelude);
                calc.value
            }
            None => ir::Value::ConstInt {
                ty: ir::Type::I1,
                value: 1,
            },
        };
        test_stmts.push(ir::Stmt::BrIf {
            cond: cond_value,
            then_label: loop_entry,
            else_label: end_label,
        });

        if fresh_start {
            b.append(self, vec![ir::Stmt::Br { target: start_label }]);
            b.open(start_label);
            b.append(self, vec![ir::Stmt::Br { target: test_label }]);
        } else {
            // Inherited from `for`: the init block itself enters the test.
            b.seal(self, ir::Stmt::Br { target: test_label });
        }
        b.extend(body_blocks);
        b.open(test_label);
        b.append(self, test_stmts);
        b.open(end_label);
        Ok(())
    }
}

/// The default value a declaration without an initialiser binds. Types
/// without a defined default cannot be declared uninitialised.
fn default_value(tp: &RyeType) -> ir::Value {
    match tp {
        RyeType::Int => ir::Value::ConstInt {
            ty: ir::Type::I32,
            value: 0,
        },
        RyeType::Bool => ir::Value::ConstInt {
            ty: ir::Type::I1,
            value: 0,
        },
        RyeType::Float => ir::Value::ConstFloat(0.0),
        other => panic!("no default initialiser for `{}`", other),
    }
}

/// Collect the names a statement assigns, in first-seen order.
fn stmt_writes(stmt: &ast::Stmt, out: &mut Vec<String>) {
    match stmt {
        ast::Stmt::Block(block) => {
            for s in &block.stmts {
                stmt_writes(s, out);
            }
        }
        ast::Stmt::Decl(decl) => {
            if let Some(init) = &decl.init {
                expr_writes(init, out);
            }
        }
        ast::Stmt::Return(ret) => {
            if let Some(arg) = &ret.arg {
                expr_writes(arg, out);
            }
        }
        ast::Stmt::If(if_stmt) => {
            expr_writes(&if_stmt.test, out);
            stmt_writes(&if_stmt.cons, out);
            if let Some(alt) = &if_stmt.alt {
                stmt_writes(alt, out);
            }
        }
        ast::Stmt::While(while_stmt) => {
            expr_writes(&while_stmt.test, out);
            stmt_writes(&while_stmt.body, out);
        }
        ast::Stmt::For(for_stmt) => {
            if let Some(init) = &for_stmt.init {
                stmt_writes(init, out);
            }
            if let Some(test) = &for_stmt.test {
                expr_writes(test, out);
            }
            if let Some(update) = &for_stmt.update {
                expr_writes(update, out);
            }
            stmt_writes(&for_stmt.body, out);
        }
        ast::Stmt::Expr(expr_stmt) => expr_writes(&expr_stmt.expr, out),
        ast::Stmt::Break(_) => {}
    }
}

/// Collect the names an expression assigns. Lambda bodies are lifted out
/// of the surrounding control flow and excluded.
fn expr_writes(expr: &ast::Expr, out: &mut Vec<String>) {
    match expr {
        ast::Expr::Int(_) | ast::Expr::Id(_) => {}
        ast::Expr::Assign(assign) => {
            if let ast::Expr::Id(target) = &assign.target {
                let name = target.id.head();
                if !out.iter().any(|n| n == name) {
                    out.push(name.to_string());
                }
            } else {
                expr_writes(&assign.target, out);
            }
            expr_writes(&assign.value, out);
        }
        ast::Expr::Bin(bin) => {
            expr_writes(&bin.left, out);
            expr_writes(&bin.right, out);
        }
        ast::Expr::Call(call) => {
            expr_writes(&call.callee, out);
            for arg in &call.args {
                expr_writes(arg, out);
            }
        }
        ast::Expr::Lambda(_) => {}
        ast::Expr::Index(index) => {
            expr_writes(&index.object, out);
            expr_writes(&index.index, out);
        }
    }
}
