//! Function emission and module assembly.
//!
//! This is the entry point of lowering: every top-level function definition
//! is emitted here, and the final module is stitched together from class
//! aliases, top-level variable globals, lifted lambdas, and the emitted
//! functions.

use super::{Blocks, CodeGen, map_type};
use crate::diagnostics::Diagnostic;
use crate::ir;
use crate::resolve;
use crate::types::{ClassTable, RyeType, Scope, StackRef};
use rye_ast as ast;

/// The collector tag attached to every top-level source function. Lifted
/// lambdas carry none.
const SHADOW_STACK_GC: &str = "shadow-stack";

/// Compile a resolved-and-lowered program into an IR module, or the list of
/// diagnostics that stopped it. Resolution reports every problem it finds;
/// lowering stops at the first.
pub fn compile_program(defs: &[ast::Definition]) -> Result<ir::Module, Vec<Diagnostic>> {
    let (top, classes) = resolve::resolve_program(defs)?;
    let mut cg = CodeGen::new(&classes);
    cg.stack.add(top.clone());

    let mut functions = Vec::new();
    for def in defs {
        if let ast::Definition::Function(fd) = def {
            let func = lower_top_function(&mut cg, fd).map_err(|d| vec![d])?;
            functions.push(func);
        }
    }

    let lifted = std::mem::take(&mut cg.lifted);
    Ok(assemble_module(&classes, &top, lifted, functions))
}

fn lower_top_function(cg: &mut CodeGen, fd: &ast::FnDef) -> Result<ir::Function, Diagnostic> {
    let ret = cg.resolve_type(&fd.return_type)?;
    let mut params = Vec::with_capacity(fd.params.len());
    for p in &fd.params {
        params.push((p.ident.name.clone(), cg.resolve_type(&p.ty)?));
    }
    let (func, _) = cg.lower_function(
        &fd.ident.name,
        &params,
        Some(ret),
        &fd.body,
        Some(SHADOW_STACK_GC),
    )?;
    Ok(func)
}

impl CodeGen<'_> {
    /// Lower one function body to IR. Parameters are bound as SSA values
    /// under their source names; the return-type hint starts from the
    /// declared type for top-level functions and from the surrounding
    /// expectation (or nothing) for lambdas. Returns the emitted function
    /// and the settled return type.
    pub(crate) fn lower_function(
        &mut self,
        name: &str,
        params: &[(String, RyeType)],
        ret_hint: Option<RyeType>,
        body: &[ast::Stmt],
        gc: Option<&str>,
    ) -> Result<(ir::Function, RyeType), Diagnostic> {
        self.stack.push();
        for (pname, tp) in params {
            self.stack.define(
                pname,
                pname,
                StackRef::Variable(tp.clone(), ir::Value::Local(pname.clone())),
            );
        }
        // Loop labels belong to the enclosing function; a lambda lowered
        // mid-loop must not see them.
        let saved_loops = std::mem::take(&mut self.loop_ends);
        let mut blocks = Blocks::new();
        let mut ret = ret_hint;
        let result = self.lower_stmts(&mut blocks, body, &mut ret);
        self.loop_ends = saved_loops;
        self.stack.pop();
        result?;

        let final_ret = ret.unwrap_or(RyeType::Void);
        let body_blocks = blocks.finish(self, final_ret.is_void());
        let func = ir::Function {
            name: name.to_string(),
            linkage: ir::Linkage::External,
            callconv: ir::CallConv::Fast,
            ret: self.map_type(&final_ret),
            params: params
                .iter()
                .map(|(n, tp)| (self.map_type(tp), n.clone()))
                .collect(),
            variadic: false,
            align: None,
            gc: gc.map(str::to_string),
            section: None,
            blocks: body_blocks,
        };
        Ok((func, final_ret))
    }
}

/// Stitch the final module together. Lambdas precede top-level functions so
/// backends that disallow forward references see callees first.
fn assemble_module(
    classes: &ClassTable,
    top: &Scope,
    lifted: Vec<ir::Function>,
    functions: Vec<ir::Function>,
) -> ir::Module {
    let mut module = ir::Module::default();
    module.comments.push(format!(
        "rye module: {} function(s), {} class(es)",
        lifted.len() + functions.len(),
        classes.len()
    ));

    for (_, info) in classes.iter() {
        let fields = info
            .members
            .iter()
            .filter_map(|entry| match &entry.refr {
                StackRef::Pointer(tp) => Some(map_type(classes, tp).ptr()),
                _ => None,
            })
            .collect();
        module.aliases.push(ir::TypeAlias {
            name: info.internal.clone(),
            fields,
        });
    }

    for entry in top.iter() {
        if let StackRef::Pointer(tp) = &entry.refr {
            module.globals.push(ir::Global {
                name: entry.internal.clone(),
                ty: map_type(classes, tp),
            });
        }
    }

    module.functions = lifted;
    module.functions.extend(functions);
    module
}
