//! Template inclusion.
//!
//! `<%include partials/header %>` splices another template into the current
//! one. The reference is resolved relative to the including file, loaded,
//! scanned as an independent template and invoked in place, sharing the
//! caller's names:
//!
//! ```text
//! <ul>
//!   <% users.forEach(function(user){ %>
//!     <%include user/show %>
//!   <% }) %>
//! </ul>
//! ```

use std::path::{Component, Path, PathBuf};

use ejs_rs_core::error::EjsError;

use crate::buffer::CodeBuffer;
use crate::scanner::Scanner;

/// Resolves a template reference relative to the file that contains it.
///
/// The reference is joined onto the directory of `filename`, `.` and `..`
/// components are normalised away, and `extension` is appended when the
/// result has none. Absolute references are used as-is.
///
/// # Examples
///
/// ```
/// use ejs_rs_template::include::resolve_path;
///
/// assert_eq!(resolve_path("user/show", "views/users.ejs", "ejs"), "views/user/show.ejs");
/// assert_eq!(resolve_path("../layout.html", "views/a/b.ejs", "ejs"), "views/layout.html");
/// ```
pub fn resolve_path(reference: &str, filename: &str, extension: &str) -> String {
    let base = Path::new(filename).parent().unwrap_or_else(|| Path::new(""));
    let mut path = normalize(&base.join(reference));
    if path.extension().is_none() && !extension.is_empty() {
        path.set_extension(extension.trim_start_matches('.'));
    }
    path.to_string_lossy().into_owned()
}

/// Lexically removes `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Strips one pair of matching surrounding quotes.
pub fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

/// Loads and scans the template named by an include tag.
///
/// The included template is scanned without scope binding: it runs inside the
/// caller's environment.
///
/// # Errors
///
/// - `ConfigurationError` when the including template has no filename
/// - `TemplateSyntaxError` when the nesting depth limit is exceeded
/// - any error from loading or scanning the included file
pub fn resolve_include(
    scanner: &Scanner<'_>,
    reference: &str,
    filename: Option<&str>,
    depth: usize,
) -> Result<CodeBuffer, EjsError> {
    let filename = filename.ok_or_else(|| {
        EjsError::ConfigurationError("filename option is required for includes".to_string())
    })?;
    let options = scanner.options();
    scanner.check_depth(depth + 1)?;

    let path = resolve_path(strip_quotes(reference.trim()), filename, &options.extension);
    tracing::debug!(from = filename, include = %path, "resolving include");
    let text = scanner.loader().load(&path)?;
    scanner.scan_file(&text, Some(path), false, depth + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Fragment;
    use crate::loaders::StringLoader;
    use crate::options::CompileOptions;

    #[test]
    fn test_resolve_path_relative() {
        assert_eq!(resolve_path("header", "views/index.ejs", "ejs"), "views/header.ejs");
        assert_eq!(resolve_path("./header.ejs", "views/index.ejs", "ejs"), "views/header.ejs");
        assert_eq!(resolve_path("../shared/nav", "views/admin/index.ejs", "ejs"), "views/shared/nav.ejs");
    }

    #[test]
    fn test_resolve_path_without_directory() {
        assert_eq!(resolve_path("header", "index.ejs", "ejs"), "header.ejs");
        assert_eq!(resolve_path("../header", "index.ejs", "ejs"), "../header.ejs");
    }

    #[test]
    fn test_resolve_path_absolute_and_extensions() {
        assert_eq!(resolve_path("/tpl/a", "views/index.ejs", "ejs"), "/tpl/a.ejs");
        assert_eq!(resolve_path("a.html", "index.ejs", "ejs"), "a.html");
        assert_eq!(resolve_path("a", "index.ejs", ".tpl"), "a.tpl");
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"a\""), "a");
        assert_eq!(strip_quotes("'a'"), "a");
        assert_eq!(strip_quotes("'a\""), "'a\"");
        assert_eq!(strip_quotes("a"), "a");
    }

    #[test]
    fn test_resolve_include_scans_without_scope_binding() {
        let loader = StringLoader::new();
        loader.add("views/part.ejs", "Hi <%= name %>");
        let options = CompileOptions::default();
        let scanner = Scanner::new(&options, &loader);
        let buffer = resolve_include(&scanner, " part ", Some("views/index.ejs"), 0).unwrap();
        assert!(!buffer.scope_binding());
        assert_eq!(buffer.filename(), Some("views/part.ejs"));
        assert_eq!(buffer.fragments()[0], Fragment::Text("Hi ".into()));
    }

    #[test]
    fn test_resolve_include_requires_filename() {
        let loader = StringLoader::new();
        let options = CompileOptions::default();
        let scanner = Scanner::new(&options, &loader);
        let err = resolve_include(&scanner, "part", None, 0).unwrap_err();
        assert!(err.to_string().contains("filename option is required for includes"));
    }
}
