//! The code buffer produced by scanning a template.
//!
//! A [`CodeBuffer`] is an append-only list of typed [`Fragment`]s. It is lowered
//! into a [`Program`](crate::parser::Program) for execution; its [`Display`]
//! implementation renders the classic JavaScript-style program listing used by
//! the `debug` option and the `ejs compile` command.

use std::fmt;
use std::sync::Arc;

/// One piece of a scanned template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Literal text, copied to the output unchanged.
    Text(String),
    /// An `<%= expr %>` interpolation, escaped on output.
    Escaped {
        /// The expression source.
        code: String,
        /// Template line of the opening delimiter.
        line: usize,
    },
    /// An `<%- expr %>` interpolation, emitted verbatim.
    Raw {
        /// The expression source.
        code: String,
        /// Template line of the opening delimiter.
        line: usize,
    },
    /// An `<% code %>` statement.
    Statement {
        /// The statement source.
        code: String,
        /// Template line of the opening delimiter.
        line: usize,
    },
    /// An included file or inline block, invoked in place.
    Unit(Box<CodeBuffer>),
}

/// The ordered fragments of one scanned template, with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBuffer {
    filename: Option<String>,
    source: Arc<str>,
    fragments: Vec<Fragment>,
    scope_binding: bool,
}

impl CodeBuffer {
    /// Creates an empty buffer for `source`, which came from `filename`.
    pub fn new(filename: Option<String>, source: Arc<str>, scope_binding: bool) -> Self {
        Self {
            filename,
            source,
            fragments: Vec::new(),
            scope_binding,
        }
    }

    /// Appends literal text, merging with a preceding text fragment.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Fragment::Text(last)) = self.fragments.last_mut() {
            last.push_str(text);
        } else {
            self.fragments.push(Fragment::Text(text.to_string()));
        }
    }

    /// Appends a single literal character.
    pub fn push_char(&mut self, c: char) {
        if let Some(Fragment::Text(last)) = self.fragments.last_mut() {
            last.push(c);
        } else {
            self.fragments.push(Fragment::Text(c.to_string()));
        }
    }

    /// Appends a fragment.
    pub fn push(&mut self, fragment: Fragment) {
        match fragment {
            Fragment::Text(text) => self.push_text(&text),
            other => self.fragments.push(other),
        }
    }

    /// Returns the fragments in order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Returns the file this buffer was scanned from, if any.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Returns the full source text the buffer's line numbers refer to.
    pub fn source(&self) -> &Arc<str> {
        &self.source
    }

    /// Returns whether bare names resolve against the bindings record.
    pub const fn scope_binding(&self) -> bool {
        self.scope_binding
    }

    /// Returns `true` if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn write_body(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = " ".repeat(indent);
        for fragment in &self.fragments {
            match fragment {
                Fragment::Text(text) => writeln!(f, "{pad}buf.push('{}');", quote(text))?,
                Fragment::Escaped { code, .. } => writeln!(f, "{pad}buf.push(escape(({code})));")?,
                Fragment::Raw { code, .. } => writeln!(f, "{pad}buf.push(({code}));")?,
                Fragment::Statement { code, .. } => writeln!(f, "{pad}{code};")?,
                Fragment::Unit(unit) => {
                    writeln!(f, "{pad}buf.push((function(){{ var buf = [];")?;
                    unit.write_body(f, indent + 2)?;
                    writeln!(f, "{pad}  return buf.join('');")?;
                    writeln!(f, "{pad}}})());")?;
                }
            }
        }
        Ok(())
    }
}

/// Escapes text for a single-quoted listing string.
fn quote(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
}

impl fmt::Display for CodeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "var buf = [];")?;
        if self.scope_binding {
            writeln!(f, "with (locals || {{}}) {{ (function(){{")?;
            self.write_body(f, 1)?;
            writeln!(f, "}})();\n}}")?;
        } else {
            self.write_body(f, 1)?;
        }
        write!(f, "return buf.join('');")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(scope_binding: bool) -> CodeBuffer {
        CodeBuffer::new(None, Arc::from(""), scope_binding)
    }

    #[test]
    fn test_text_fragments_merge() {
        let mut buf = buffer(true);
        buf.push_text("ab");
        buf.push_char('c');
        buf.push(Fragment::Text("d".into()));
        assert_eq!(buf.fragments(), &[Fragment::Text("abcd".into())]);
    }

    #[test]
    fn test_empty_text_is_ignored() {
        let mut buf = buffer(true);
        buf.push_text("");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_listing_quotes_text() {
        let mut buf = buffer(false);
        buf.push_text("it's a\\b\n");
        let listing = buf.to_string();
        assert!(listing.contains(r"buf.push('it\'s a\\b\n');"));
    }

    #[test]
    fn test_listing_with_scope_binding() {
        let mut buf = buffer(true);
        buf.push(Fragment::Escaped {
            code: " name ".into(),
            line: 1,
        });
        buf.push(Fragment::Statement {
            code: " if (x) { ".into(),
            line: 1,
        });
        let listing = buf.to_string();
        assert!(listing.starts_with("var buf = [];\nwith (locals || {}) { (function(){"));
        assert!(listing.contains("buf.push(escape(( name )));"));
        assert!(listing.contains(" if (x) { ;"));
        assert!(listing.ends_with("return buf.join('');"));
    }

    #[test]
    fn test_listing_nests_units() {
        let mut inner = buffer(false);
        inner.push_text("inner");
        let mut outer = buffer(false);
        outer.push(Fragment::Unit(Box::new(inner)));
        let listing = outer.to_string();
        assert!(listing.contains("buf.push((function(){ var buf = [];"));
        assert!(listing.contains("   buf.push('inner');"));
    }
}
