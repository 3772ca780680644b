//! Core error types for ejs-rs.
//!
//! This module provides the error enum [`EjsError`] shared by every stage of
//! the template pipeline: configuration, scanning and layout resolution,
//! loading, rendering, and the contextualised wrapper produced when a traced
//! render fails.

use thiserror::Error;

/// The primary error type for ejs-rs.
///
/// Compile-time failures surface synchronously from `compile`/`parse`;
/// render-time failures surface from invoking a compiled template. When line
/// tracing is enabled a render failure is wrapped in [`EjsError::Traced`],
/// which carries the file, the failing line and a window of surrounding source.
#[derive(Error, Debug)]
pub enum EjsError {
    // ── Configuration ────────────────────────────────────────────────

    /// A required option is missing or options contradict each other.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Templates ────────────────────────────────────────────────────

    /// The template (or code embedded in it) is malformed.
    #[error("Template syntax error: {0}")]
    TemplateSyntaxError(String),

    /// A template referenced by an include or extend tag could not be loaded.
    #[error("Template does not exist: {0}")]
    TemplateDoesNotExist(String),

    // ── Rendering ────────────────────────────────────────────────────

    /// Evaluating embedded code failed at render time.
    #[error("Render error: {0}")]
    RenderError(String),

    /// A render failure decorated with its source location.
    #[error(
        "{}:{}\n{}\n\n{}",
        .path.as_deref().unwrap_or("ejs"),
        .line,
        .context,
        .source
    )]
    Traced {
        /// The file the failing line belongs to, if known.
        path: Option<String>,
        /// The 1-based failing line.
        line: usize,
        /// The numbered source window around `line`.
        context: String,
        /// The undecorated error.
        source: Box<EjsError>,
    },

    // ── Serialization ────────────────────────────────────────────────

    /// Binding data or settings could not be (de)serialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EjsError {
    /// Returns the file a traced error was raised in.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Traced { path, .. } => path.as_deref(),
            _ => None,
        }
    }

    /// Returns the failing line of a traced error.
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::Traced { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Returns the undecorated error beneath any tracing wrappers.
    pub fn root(&self) -> &Self {
        match self {
            Self::Traced { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns `true` if this error already carries source context.
    pub const fn is_traced(&self) -> bool {
        matches!(self, Self::Traced { .. })
    }
}

impl From<serde_json::Error> for EjsError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// A convenience type alias for `Result<T, EjsError>`.
pub type EjsResult<T> = Result<T, EjsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EjsError::TemplateSyntaxError("unclosed tag".into());
        assert_eq!(err.to_string(), "Template syntax error: unclosed tag");
    }

    #[test]
    fn test_traced_display() {
        let err = EjsError::Traced {
            path: Some("views/index.ejs".into()),
            line: 2,
            context: "    1| a\n >> 2| b".into(),
            source: Box::new(EjsError::RenderError("foo is not defined".into())),
        };
        assert_eq!(
            err.to_string(),
            "views/index.ejs:2\n    1| a\n >> 2| b\n\nRender error: foo is not defined"
        );
        assert_eq!(err.path(), Some("views/index.ejs"));
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_traced_display_without_path() {
        let err = EjsError::Traced {
            path: None,
            line: 1,
            context: " >> 1| x".into(),
            source: Box::new(EjsError::RenderError("boom".into())),
        };
        assert!(err.to_string().starts_with("ejs:1\n"));
        assert!(err.path().is_none());
    }

    #[test]
    fn test_root_unwraps_traced() {
        let err = EjsError::Traced {
            path: None,
            line: 1,
            context: String::new(),
            source: Box::new(EjsError::RenderError("inner".into())),
        };
        assert!(err.is_traced());
        assert!(matches!(err.root(), EjsError::RenderError(m) if m == "inner"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: EjsError = io_err.into();
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: EjsError = json_err.into();
        assert!(matches!(err, EjsError::SerializationError(_)));
    }
}
