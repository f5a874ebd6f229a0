//! Expression lowering.
//!
//! Every expression lowers to either an ordinary value ([`Calc`]: prelude
//! statements, result value, result type) or a class outcome, which is only
//! legal as the callee of a call (constructor syntax). An optional expected
//! type threads through lowering; produced values are checked against it.

use super::CodeGen;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::ir;
use crate::types::{RyeType, StackRef};
use rye_ast as ast;

/// An ordinary lowered value.
#[derive(Debug, Clone)]
pub struct Calc {
    /// Statements that must execute before `value` is available.
    pub prelude: Vec<ir::Stmt>,
    pub value: ir::Value,
    pub ty: RyeType,
}

/// The outcome of lowering one expression.
#[derive(Debug, Clone)]
pub enum Outcome {
    Calc(Calc),
    /// The expression denotes a class, not a value.
    Class(crate::types::ClassId),
}

impl CodeGen<'_> {
    pub(crate) fn lower_expr(
        &mut self,
        expr: &ast::Expr,
        expect: Option<&RyeType>,
    ) -> Result<Outcome, Diagnostic> {
        match expr {
            ast::Expr::Int(lit) => self.lower_int(lit, expect),
            ast::Expr::Id(id) => self.lower_id(id, expect),
            ast::Expr::Assign(assign) => self.lower_assign(assign, expect),
            ast::Expr::Bin(bin) => self.lower_bin(bin, expect),
            ast::Expr::Call(call) => self.lower_call(call, expect),
            ast::Expr::Lambda(lambda) => self.lower_lambda(lambda, expect),
            ast::Expr::Index(index) => Err(Diagnostic::with_span(
                DiagnosticKind::Unsupported {
                    construct: "index expressions".to_string(),
                },
                index.span.clone(),
            )),
        }
    }

    /// Lower an expression that must produce a value; a class outcome here
    /// is a misuse.
    pub(crate) fn lower_value(
        &mut self,
        expr: &ast::Expr,
        expect: Option<&RyeType>,
    ) -> Result<Calc, Diagnostic> {
        match self.lower_expr(expr, expect)? {
            Outcome::Calc(calc) => Ok(calc),
            Outcome::Class(id) => Err(Diagnostic::with_span(
                DiagnosticKind::MisuseOfClass {
                    context: "as a value".to_string(),
                    class: self.classes.get(id).name.clone(),
                },
                expr.span(),
            )),
        }
    }

    /// Check a produced type against the threaded expectation.
    fn check_expect(
        &self,
        actual: &RyeType,
        expect: Option<&RyeType>,
        span: ast::Span,
    ) -> Result<(), Diagnostic> {
        match expect {
            Some(expected) if !super::types_match(expected, actual) => {
                Err(Diagnostic::with_span(
                    DiagnosticKind::TypeMismatch {
                        actual: actual.clone(),
                        expected: expected.clone(),
                    },
                    span,
                ))
            }
            _ => Ok(()),
        }
    }

    /// Integer literals are `int` unless a `float` expectation narrows them
    /// to a double constant.
    fn lower_int(
        &mut self,
        lit: &ast::IntLit,
        expect: Option<&RyeType>,
    ) -> Result<Outcome, Diagnostic> {
        match expect {
            None | Some(RyeType::Int) => Ok(Outcome::Calc(Calc {
                prelude: vec![],
                value: ir::Value::ConstInt {
                    ty: ir::Type::I32,
                    value: lit.value,
                },
                ty: RyeType::Int,
            })),
            Some(RyeType::Float) => Ok(Outcome::Calc(Calc {
                prelude: vec![],
                value: ir::Value::ConstFloat(lit.value as f64),
                ty: RyeType::Float,
            })),
            Some(expected) => Err(Diagnostic::with_span(
                DiagnosticKind::TypeMismatch {
                    actual: RyeType::Int,
                    expected: expected.clone(),
                },
                lit.span.clone(),
            )),
        }
    }

    fn lower_id(
        &mut self,
        id: &ast::IdExpr,
        expect: Option<&RyeType>,
    ) -> Result<Outcome, Diagnostic> {
        let name = id.id.head();
        let Some(entry) = self.stack.lookup(name) else {
            return Err(self.lookup_failure(name, id.span.clone()));
        };
        let internal = entry.internal.clone();
        let refr = entry.refr.clone();

        let calc = match refr {
            StackRef::Variable(tp, value) => Calc {
                prelude: vec![],
                value,
                ty: tp,
            },
            StackRef::Pointer(tp) => {
                let ty = self.map_type(&tp);
                let dst = self.fresh_tmp();
                Calc {
                    prelude: vec![ir::Stmt::Assign {
                        dst: dst.clone(),
                        expr: ir::Expr::Load {
                            ty,
                            addr: ir::Value::Global(internal),
                        },
                    }],
                    value: ir::Value::Local(dst),
                    ty: tp,
                }
            }
            StackRef::Function(ret, params) => Calc {
                prelude: vec![],
                value: ir::Value::Global(internal),
                ty: RyeType::Function(Box::new(ret), params),
            },
            StackRef::Class(class_id) => return Ok(Outcome::Class(class_id)),
        };
        self.check_expect(&calc.ty, expect, id.span.clone())?;
        Ok(Outcome::Calc(calc))
    }

    /// Assignments to `Variable` bindings rename; assignments to `Pointer`
    /// bindings store. The expression's result is the right-hand value.
    fn lower_assign(
        &mut self,
        assign: &ast::AssignExpr,
        expect: Option<&RyeType>,
    ) -> Result<Outcome, Diagnostic> {
        if assign.op != ast::AssignOp::Assign {
            return Err(Diagnostic::with_span(
                DiagnosticKind::Unsupported {
                    construct: "compound assignment operators".to_string(),
                },
                assign.span.clone(),
            ));
        }
        let ast::Expr::Id(target) = &assign.target else {
            return Err(Diagnostic::with_span(
                DiagnosticKind::Unsupported {
                    construct: "assignment targets other than identifiers".to_string(),
                },
                assign.target.span(),
            ));
        };
        let name = target.id.head().to_string();
        let Some(entry) = self.stack.lookup(&name) else {
            return Err(self.lookup_failure(&name, target.span.clone()));
        };
        let internal = entry.internal.clone();
        let refr = entry.refr.clone();

        let calc = match refr {
            StackRef::Variable(tp, _) => {
                let rhs = self.lower_value(&assign.value, Some(&tp))?;
                self.stack_put(&name, StackRef::Variable(tp.clone(), rhs.value.clone()));
                Calc {
                    prelude: rhs.prelude,
                    value: rhs.value,
                    ty: tp,
                }
            }
            StackRef::Pointer(tp) => {
                let rhs = self.lower_value(&assign.value, Some(&tp))?;
                let mut prelude = rhs.prelude;
                prelude.push(ir::Stmt::Store {
                    ty: self.map_type(&tp),
                    value: rhs.value.clone(),
                    addr: ir::Value::Global(internal),
                });
                Calc {
                    prelude,
                    value: rhs.value,
                    ty: tp,
                }
            }
            StackRef::Class(id) => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::MisuseOfClass {
                        context: "as an assignment target".to_string(),
                        class: self.classes.get(id).name.clone(),
                    },
                    target.span.clone(),
                ));
            }
            StackRef::Function(..) => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::Unsupported {
                        construct: "assignments to function bindings".to_string(),
                    },
                    target.span.clone(),
                ));
            }
        };
        self.check_expect(&calc.ty, expect, assign.span.clone())?;
        Ok(Outcome::Calc(calc))
    }

    /// Operands must be homogeneous: the left side lowers unconstrained and
    /// its type becomes the expectation for the right side.
    fn lower_bin(
        &mut self,
        bin: &ast::BinExpr,
        expect: Option<&RyeType>,
    ) -> Result<Outcome, Diagnostic> {
        let lhs = self.lower_value(&bin.left, None)?;
        let rhs = self.lower_value(&bin.right, Some(&lhs.ty))?;

        let operand_ty = self.map_type(&lhs.ty);
        let (expr, ty) = match bin.op {
            ast::BinOp::Add => (
                ir::Expr::Add {
                    ty: operand_ty,
                    lhs: lhs.value.clone(),
                    rhs: rhs.value.clone(),
                },
                lhs.ty.clone(),
            ),
            ast::BinOp::Sub => (
                ir::Expr::Sub {
                    ty: operand_ty,
                    lhs: lhs.value.clone(),
                    rhs: rhs.value.clone(),
                },
                lhs.ty.clone(),
            ),
            ast::BinOp::Mul => (
                ir::Expr::Mul {
                    ty: operand_ty,
                    lhs: lhs.value.clone(),
                    rhs: rhs.value.clone(),
                },
                lhs.ty.clone(),
            ),
            ast::BinOp::Lt
            | ast::BinOp::Le
            | ast::BinOp::Gt
            | ast::BinOp::Ge
            | ast::BinOp::EqEq
            | ast::BinOp::NotEq => {
                let cond = match bin.op {
                    ast::BinOp::Lt => ir::Cond::Slt,
                    ast::BinOp::Le => ir::Cond::Sle,
                    ast::BinOp::Gt => ir::Cond::Sgt,
                    ast::BinOp::Ge => ir::Cond::Sge,
                    ast::BinOp::EqEq => ir::Cond::Eq,
                    _ => ir::Cond::Ne,
                };
                (
                    ir::Expr::ICmp {
                        cond,
                        ty: operand_ty,
                        lhs: lhs.value.clone(),
                        rhs: rhs.value.clone(),
                    },
                    RyeType::Bool,
                )
            }
        };

        let dst = self.fresh_tmp();
        let mut prelude = lhs.prelude;
        prelude.extend(rhs.prelude);
        prelude.push(ir::Stmt::Assign {
            dst: dst.clone(),
            expr,
        });
        self.check_expect(&ty, expect, bin.span.clone())?;
        Ok(Outcome::Calc(Calc {
            prelude,
            value: ir::Value::Local(dst),
            ty,
        }))
    }

    /// Calls through function values, plus `T()` constructor syntax when
    /// the callee denotes a class.
    fn lower_call(
        &mut self,
        call: &ast::CallExpr,
        expect: Option<&RyeType>,
    ) -> Result<Outcome, Diagnostic> {
        match self.lower_expr(&call.callee, None)? {
            Outcome::Class(id) => {
                let alias = self.classes.get(id).internal.clone();
                let dst = self.fresh_tmp();
                let prelude = vec![ir::Stmt::Assign {
                    dst: dst.clone(),
                    expr: ir::Expr::Malloc { alias, count: 1 },
                }];
                let ty = RyeType::Class(id);
                self.check_expect(&ty, expect, call.span.clone())?;
                Ok(Outcome::Calc(Calc {
                    prelude,
                    value: ir::Value::Local(dst),
                    ty,
                }))
            }
            Outcome::Calc(callee) => {
                let RyeType::Function(ret, params) = callee.ty.clone() else {
                    return Err(Diagnostic::with_span(
                        DiagnosticKind::NotAFunction { actual: callee.ty },
                        call.callee.span(),
                    ));
                };
                if call.args.len() != params.len() {
                    return Err(Diagnostic::with_span(
                        DiagnosticKind::WrongNumberOfArguments {
                            got: call.args.len(),
                            expected: params.len(),
                        },
                        call.span.clone(),
                    ));
                }
                let mut prelude = callee.prelude;
                let mut args = Vec::with_capacity(call.args.len());
                for (arg, param_ty) in call.args.iter().zip(&params) {
                    let lowered = self.lower_value(arg, Some(param_ty))?;
                    prelude.extend(lowered.prelude);
                    args.push((self.map_type(param_ty), lowered.value));
                }
                let dst = self.fresh_tmp();
                prelude.push(ir::Stmt::Assign {
                    dst: dst.clone(),
                    expr: ir::Expr::Call {
                        ret: self.map_type(&ret),
                        callee: callee.value,
                        args,
                    },
                });
                self.check_expect(&ret, expect, call.span.clone())?;
                Ok(Outcome::Calc(Calc {
                    prelude,
                    value: ir::Value::Local(dst),
                    ty: *ret,
                }))
            }
        }
    }

    /// Lambdas lift to module-level functions. The body is lowered under a
    /// shadowed stack so it sees no enclosing locals; its returns determine
    /// the return type.
    fn lower_lambda(
        &mut self,
        lambda: &ast::LambdaExpr,
        expect: Option<&RyeType>,
    ) -> Result<Outcome, Diagnostic> {
        let name = self.fresh_lambda_name();

        // Parameter types resolve against the ambient stack, before it is
        // shadowed away from the body.
        let mut params = Vec::with_capacity(lambda.params.len());
        for p in &lambda.params {
            params.push((p.ident.name.clone(), self.resolve_type(&p.ty)?));
        }

        // A surrounding function-typed expectation seeds the return hint,
        // unless it is void-returning: those slots accept any return type,
        // so the body stays free to decide.
        let ret_hint = match expect {
            Some(RyeType::Function(ret, _)) if !ret.is_void() => Some((**ret).clone()),
            _ => None,
        };

        let (func, final_ret) = self.shadowed(|cg| {
            cg.lower_function(
                &name,
                &params,
                ret_hint,
                std::slice::from_ref(&lambda.body),
                None,
            )
        })?;
        self.lifted.push(func);

        let param_tys = params.into_iter().map(|(_, tp)| tp).collect();
        let ty = RyeType::Function(Box::new(final_ret), param_tys);
        self.check_expect(&ty, expect, lambda.span.clone())?;
        Ok(Outcome::Calc(Calc {
            prelude: vec![],
            value: ir::Value::Global(name),
            ty,
        }))
    }
}
