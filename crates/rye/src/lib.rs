//! Compiler core for the Rye language.
//!
//! The core is a two-pass pipeline over an in-memory AST: name/type
//! resolution ([`resolve`]) followed by SSA IR lowering ([`codegen`]). The
//! driver hands in a definition list and receives either a complete
//! [`ir::Module`] or the diagnostics that stopped compilation; nothing else
//! goes in or out.

pub mod codegen;
pub mod diagnostics;
pub mod ir;
pub mod resolve;
pub mod types;

pub use diagnostics::{Diagnostic, DiagnosticKind};

/// Compile a program's top-level definitions into an IR module.
///
/// Resolution accumulates and reports every top-level problem; lowering is
/// fail-fast and returns the first diagnostic it hits. On failure no
/// partial module is produced.
pub fn compile_program(
    defs: &[rye_ast::Definition],
) -> Result<ir::Module, Vec<Diagnostic>> {
    codegen::emit::compile_program(defs)
}
