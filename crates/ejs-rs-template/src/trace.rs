//! Error context for render failures.
//!
//! When a template is compiled with `compile_debug`, a failing statement's
//! error is passed through [`annotate`], which attaches the template path, the
//! failing line and a numbered window of the surrounding source.

use ejs_rs_core::error::EjsError;

/// Lines shown on each side of the failing line.
const CONTEXT_LINES: usize = 3;

/// Wraps `error` with the source window around `line` of `input`.
///
/// Errors that already carry context are returned unchanged, so the innermost
/// failing statement decides the reported position.
pub fn annotate(error: EjsError, input: &str, filename: Option<&str>, line: usize) -> EjsError {
    if error.is_traced() {
        return error;
    }
    EjsError::Traced {
        path: filename.map(str::to_string),
        line,
        context: context_window(input, line),
        source: Box::new(error),
    }
}

/// Renders lines `line - 3 ..= line + 3` (clamped to the input) as
/// `N| text`, marking the failing line with ` >> `.
pub fn context_window(input: &str, line: usize) -> String {
    let lines: Vec<&str> = input.split('\n').collect();
    let start = line.saturating_sub(CONTEXT_LINES).max(1);
    let end = (line + CONTEXT_LINES).min(lines.len());
    (start..=end)
        .map(|n| {
            let marker = if n == line { " >> " } else { "    " };
            let text = lines.get(n - 1).copied().unwrap_or_default();
            format!("{marker}{n}| {text}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
