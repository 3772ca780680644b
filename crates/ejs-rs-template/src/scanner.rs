//! Template scanner.
//!
//! A single forward pass turns template text into a [`CodeBuffer`]. Literal
//! text becomes text fragments; each tag becomes a code fragment chosen by the
//! character after the opening delimiter:
//!
//! | tag              | fragment                          |
//! |------------------|-----------------------------------|
//! | `<%= expr %>`    | escaped output                    |
//! | `<%- expr %>`    | raw output                        |
//! | `<% code %>`     | statement                         |
//! | `<%include p %>` | included template, invoked inline |
//! | `<%block n%>`    | inline block, invoked inline      |
//!
//! A tag ending in `-%>` swallows the newline that follows it, and a tag body
//! starting with `:` is rewritten through the filter pipe syntax
//! (`<%=: items | first | capitalize %>`). Templates starting with an extend
//! tag are resolved against their layout before scanning.

use std::sync::Arc;

use ejs_rs_core::error::EjsError;

use crate::buffer::{CodeBuffer, Fragment};
use crate::include::resolve_include;
use crate::inheritance::{is_extending, resolve_extend};
use crate::loaders::TemplateLoader;
use crate::options::CompileOptions;

/// Scans `source` into a code buffer using `options` and `loader`.
///
/// # Errors
///
/// - `ConfigurationError` when an include or extend tag appears and
///   `options.filename` is unset
/// - `TemplateSyntaxError` for unterminated tags or blocks, unknown layout
///   blocks, or nesting deeper than `options.max_depth`
/// - `TemplateDoesNotExist` when a layout or include cannot be loaded
pub fn scan(
    source: &str,
    options: &CompileOptions,
    loader: &dyn TemplateLoader,
) -> Result<CodeBuffer, EjsError> {
    Scanner::new(options, loader).scan(source)
}

/// Which fragment a tag produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Escaped,
    Raw,
    Statement,
}

/// Scans templates, following includes and layouts through a loader.
pub struct Scanner<'a> {
    options: &'a CompileOptions,
    loader: &'a dyn TemplateLoader,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner.
    pub fn new(options: &'a CompileOptions, loader: &'a dyn TemplateLoader) -> Self {
        Self { options, loader }
    }

    /// Returns the options in effect.
    pub const fn options(&self) -> &CompileOptions {
        self.options
    }

    /// Returns the loader used for layouts and includes.
    pub fn loader(&self) -> &dyn TemplateLoader {
        self.loader
    }

    /// Scans a top-level template.
    pub fn scan(&self, source: &str) -> Result<CodeBuffer, EjsError> {
        self.scan_file(
            source,
            self.options.filename.clone(),
            self.options.scope_binding,
            0,
        )
    }

    /// Fails when `depth` exceeds the configured nesting limit.
    pub fn check_depth(&self, depth: usize) -> Result<(), EjsError> {
        if depth > self.options.max_depth {
            return Err(EjsError::TemplateSyntaxError(format!(
                "Maximum include/extend depth of {} exceeded",
                self.options.max_depth
            )));
        }
        Ok(())
    }

    /// Resolves any layout chain, then scans the resulting text.
    pub(crate) fn scan_file(
        &self,
        source: &str,
        filename: Option<String>,
        scope_binding: bool,
        depth: usize,
    ) -> Result<CodeBuffer, EjsError> {
        let mut text = source.to_string();
        let mut filename = filename;
        let mut depth = depth;
        while is_extending(&text, &self.options.open) {
            depth += 1;
            self.check_depth(depth)?;
            let resolved = resolve_extend(&text, filename.as_deref(), self.options, self.loader)?;
            text = resolved.source;
            filename = Some(resolved.filename);
        }
        let origin: Arc<str> = Arc::from(text.as_str());
        self.scan_text(&text, filename.as_deref(), &origin, 1, scope_binding, depth)
    }

    /// Scans `text`, whose first line is line `first_line` of `origin`.
    fn scan_text(
        &self,
        text: &str,
        filename: Option<&str>,
        origin: &Arc<str>,
        first_line: usize,
        scope_binding: bool,
        depth: usize,
    ) -> Result<CodeBuffer, EjsError> {
        let (open, close) = (self.options.open.as_str(), self.options.close.as_str());
        let mut buf = CodeBuffer::new(filename.map(str::to_string), Arc::clone(origin), scope_binding);
        let mut line = first_line;
        let mut consume_newline = false;
        let mut pos = 0;

        while pos < text.len() {
            let rest = &text[pos..];
            if !rest.starts_with(open) {
                let Some(c) = rest.chars().next() else { break };
                pos += c.len_utf8();
                match c {
                    '\r' => {}
                    '\n' => {
                        line += 1;
                        if consume_newline {
                            consume_newline = false;
                        } else {
                            buf.push_char('\n');
                        }
                    }
                    c => {
                        consume_newline = false;
                        buf.push_char(c);
                    }
                }
                continue;
            }

            consume_newline = false;
            let tag_line = line;
            pos += open.len();
            let kind = match text[pos..].chars().next() {
                Some('=') => TagKind::Escaped,
                Some('-') => TagKind::Raw,
                _ => TagKind::Statement,
            };
            if kind != TagKind::Statement {
                pos += 1;
            }

            let end = text[pos..].find(close).map(|i| pos + i).ok_or_else(|| {
                EjsError::TemplateSyntaxError(format!(
                    "Could not find matching close tag for \"{open}\" on line {tag_line}"
                ))
            })?;
            let mut body = &text[pos..end];
            let after_tag = end + close.len();
            line += body.matches('\n').count();

            if let Some(stripped) = body.strip_suffix('-') {
                body = stripped;
                consume_newline = true;
            }

            let trimmed = body.trim_start();
            if let Some(reference) = keyword_arg(trimmed, "include") {
                let unit = resolve_include(self, reference, filename, depth)?;
                buf.push(Fragment::Unit(Box::new(unit)));
                pos = after_tag;
            } else if keyword_arg(trimmed, "block").is_some() {
                self.check_depth(depth + 1)?;
                let end_marker = format!("{open}/block");
                let inner_end = text[after_tag..]
                    .find(&end_marker)
                    .map(|i| after_tag + i)
                    .ok_or_else(|| {
                        EjsError::TemplateSyntaxError(format!(
                            "Could not find matching \"{end_marker}\" for block on line {tag_line}"
                        ))
                    })?;
                let inner = &text[after_tag..inner_end];
                let unit = self.scan_text(inner, filename, origin, line, false, depth + 1)?;
                buf.push(Fragment::Unit(Box::new(unit)));

                let marker_end = inner_end + end_marker.len();
                let close_at = text[marker_end..]
                    .find(close)
                    .map(|i| marker_end + i)
                    .ok_or_else(|| {
                        EjsError::TemplateSyntaxError(format!(
                            "Could not find matching close tag for \"{end_marker}\" on line {tag_line}"
                        ))
                    })?;
                line += text[after_tag..close_at].matches('\n').count();
                pos = close_at + close.len();
            } else {
                let code = if trimmed.starts_with(':') {
                    rewrite_filters(trimmed)
                } else {
                    body.to_string()
                };
                if !code.trim().is_empty() {
                    tracing::trace!(line = tag_line, kind = ?kind, "code fragment");
                    buf.push(match kind {
                        TagKind::Escaped => Fragment::Escaped { code, line: tag_line },
                        TagKind::Raw => Fragment::Raw { code, line: tag_line },
                        TagKind::Statement => Fragment::Statement { code, line: tag_line },
                    });
                }
                pos = after_tag;
            }
        }

        Ok(buf)
    }
}

/// Returns the rest of `body` if it starts with `word` as a whole word.
fn keyword_arg<'b>(body: &'b str, word: &str) -> Option<&'b str> {
    let rest = body.strip_prefix(word)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

/// Rewrites filter pipe syntax into nested filter calls.
///
/// `:expr | f1:a1 | f2` becomes `filters.f2(filters.f1(expr, a1))`. Text after
/// the first `:` of a stage is forwarded verbatim as the trailing arguments.
///
/// # Examples
///
/// ```
/// use ejs_rs_template::scanner::rewrite_filters;
///
/// assert_eq!(
///     rewrite_filters(":x|upper|truncate:20"),
///     "filters.truncate(filters.upper(x), 20)"
/// );
/// ```
pub fn rewrite_filters(body: &str) -> String {
    let body = body.strip_prefix(':').unwrap_or(body);
    let mut stages = body.split('|');
    let mut code = stages.next().unwrap_or_default().to_string();
    for stage in stages {
        let (name, args) = stage.split_once(':').unwrap_or((stage, ""));
        let name = name.trim();
        code = if args.trim().is_empty() {
            format!("filters.{name}({code})")
        } else {
            format!("filters.{name}({code}, {args})")
        };
    }
    code
}
