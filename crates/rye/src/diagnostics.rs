//! Diagnostic reporting utilities for the Rye compiler.
//!
//! This module provides lightweight, rustc-style error reporting that emits
//! colored diagnostic messages to stderr, plus the structured [`Diagnostic`]
//! values the compilation pipeline propagates. The resolver accumulates
//! diagnostics; lowering is fail-fast and carries a single diagnostic out
//! through `Result`.

use crate::types::RyeType;
use rye_ast::Span;
use std::sync::atomic::{AtomicBool, Ordering};

/// The closed set of user-facing error kinds produced by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    /// An identifier did not resolve on the lexical stack.
    LookupFailure { name: String },
    /// A type annotation referred to a binding that is not a class.
    NotAClass { name: String },
    /// A call's callee is not function-typed.
    NotAFunction { actual: RyeType },
    /// A lowered value did not match the expected type.
    TypeMismatch { actual: RyeType, expected: RyeType },
    /// A call supplied the wrong number of arguments.
    WrongNumberOfArguments { got: usize, expected: usize },
    /// A return statement disagreed with the function's return type.
    WrongReturnType { actual: RyeType, expected: RyeType },
    /// A class name was used where a value is required.
    MisuseOfClass { context: String, class: String },
    /// A construct the core does not lower yet.
    Unsupported { construct: String },
}

/// Structured diagnostic container propagated through the pipeline.
///
/// Carries the error kind, an optional byte-range span into the source for
/// caret-highlighted reporting, and an optional free-form note (e.g. a
/// "did you mean" suggestion).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Option<Span>,
    pub note: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind) -> Self {
        Diagnostic {
            kind,
            span: None,
            note: None,
        }
    }

    pub fn with_span(kind: DiagnosticKind, span: Span) -> Self {
        Diagnostic {
            kind,
            span: Some(span),
            note: None,
        }
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Render the primary message for this diagnostic's kind.
    pub fn message(&self) -> String {
        match &self.kind {
            DiagnosticKind::LookupFailure { name } => {
                format!("cannot find `{}` in this scope", name)
            }
            DiagnosticKind::NotAClass { name } => format!("`{}` is not a class", name),
            DiagnosticKind::NotAFunction { actual } => {
                format!("call target is not a function (found `{}`)", actual)
            }
            DiagnosticKind::TypeMismatch { actual, expected } => {
                format!(
                    "mismatched types: expected `{}`, found `{}`",
                    expected, actual
                )
            }
            DiagnosticKind::WrongNumberOfArguments { got, expected } => {
                format!(
                    "this call takes {} argument(s) but {} were supplied",
                    expected, got
                )
            }
            DiagnosticKind::WrongReturnType { actual, expected } => {
                format!("wrong return type: expected `{}`, found `{}`", expected, actual)
            }
            DiagnosticKind::MisuseOfClass { context, class } => {
                format!("class `{}` cannot be used {}", class, context)
            }
            DiagnosticKind::Unsupported { construct } => {
                format!("{} are not supported", construct)
            }
        }
    }
}

const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";

/// Zero-based (line, column) of a byte offset into `source`.
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.bytes().filter(|b| *b == b'\n').count();
    let col = match before.rfind('\n') {
        Some(nl) => offset - nl - 1,
        None => offset,
    };
    (line, col)
}

fn note_line(note: Option<&str>) {
    if let Some(note) = note {
        eprintln!("{BLUE}note{RESET}: {note}");
    }
}

/// Print a compact, rustc-style diagnostic to stderr, with a short source
/// preview when the text is available.
pub fn report_error(file: Option<&str>, source: Option<&str>, message: &str, note: Option<&str>) {
    eprintln!("{RED}error{RESET}: {message}");
    if let Some(path) = file {
        eprintln!("  --> {path}");
    }
    if let Some(src) = source {
        for (n, text) in src.lines().take(6).enumerate() {
            eprintln!("{:4} | {}", n + 1, text);
        }
    }
    note_line(note);
}

/// Print a span-aware diagnostic: the offending line with one line of
/// context either side and a caret under the error column.
pub fn report_error_span(
    file: Option<&str>,
    source: &str,
    span_start: usize,
    message: &str,
    note: Option<&str>,
) {
    let (line, col) = line_col(source, span_start);

    eprintln!("{RED}error{RESET}: {message}");
    if let Some(path) = file {
        eprintln!("  --> {}:{}:{}", path, line + 1, col + 1);
    }

    let first = line.saturating_sub(1);
    for (n, text) in source.lines().enumerate().skip(first).take(line - first + 2) {
        eprintln!("{:4} | {}", n + 1, text);
        if n == line {
            eprintln!("     | {}^", " ".repeat(col));
        }
    }
    note_line(note);
}

/// Emits a diagnostic using the appropriate format for the available context.
pub fn emit_diagnostic(d: &Diagnostic, file: Option<&str>, source: Option<&str>) {
    if !DIAGNOSTICS_ENABLED.load(Ordering::SeqCst) {
        return;
    }
    let message = d.message();
    if let (Some(span), Some(src)) = (&d.span, source) {
        report_error_span(file, src, span.start, &message, d.note.as_deref());
    } else {
        report_error(file, source, &message, d.note.as_deref());
    }
}

/// Reports every diagnostic in a batch, then returns an `anyhow::Error` for
/// callers that terminate via `?`.
pub fn report_all_and_bail<T>(
    diags: &[Diagnostic],
    file: Option<&str>,
    source: Option<&str>,
) -> anyhow::Result<T> {
    for d in diags {
        emit_diagnostic(d, file, source);
    }
    let first = diags
        .first()
        .map(|d| d.message())
        .unwrap_or_else(|| "compilation failed".to_string());
    Err(anyhow::anyhow!("{}", first))
}

/// Return up to 3 near-miss candidates for `needle` by edit distance.
pub fn suggest(needle: &str, candidates: impl IntoIterator<Item = String>) -> Vec<String> {
    let needle = needle.trim();
    if needle.is_empty() {
        return vec![];
    }

    let mut scored: Vec<(usize, String)> = candidates
        .into_iter()
        .filter(|c| !c.is_empty() && c != needle)
        .map(|c| (strsim::levenshtein(needle, &c), c))
        .collect();

    let max_dist = match needle.len() {
        0..=3 => 1,
        4..=6 => 2,
        7..=10 => 3,
        _ => 4,
    };

    scored.retain(|(d, _)| *d <= max_dist);
    scored.sort_by(|(da, a), (db, b)| da.cmp(db).then(a.len().cmp(&b.len())).then(a.cmp(b)));

    scored.into_iter().take(3).map(|(_, s)| s).collect()
}

/// Format a "did you mean" note from the visible candidate names, if any
/// are close enough to be worth mentioning.
pub fn did_you_mean(needle: &str, candidates: impl IntoIterator<Item = String>) -> Option<String> {
    let v = suggest(needle, candidates);
    match v.len() {
        0 => None,
        1 => Some(format!("did you mean `{}`?", v[0])),
        _ => Some(format!(
            "did you mean one of: {}?",
            v.iter()
                .map(|s| format!("`{}`", s))
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Temporarily suppresses diagnostic output, e.g. while tests exercise
/// error paths. The returned guard restores the previous state on drop.
pub fn suppress() -> SuppressGuard {
    let prev = DIAGNOSTICS_ENABLED.swap(false, Ordering::SeqCst);
    SuppressGuard { prev }
}

/// RAII guard restoring the diagnostic output state.
pub struct SuppressGuard {
    prev: bool,
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        DIAGNOSTICS_ENABLED.store(self.prev, Ordering::SeqCst);
    }
}
