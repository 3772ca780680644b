//! Settings for ejs-rs.
//!
//! This module provides the [`Settings`] struct, which holds process-level
//! configuration (debug mode, log level), and [`TemplateSettings`], the
//! defaults an engine compiles templates with. Settings are plain values
//! passed to the components that need them; there is no global instance.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Template compiler configuration.
///
/// Every field maps onto a compile option; an engine built from these settings
/// uses them as the defaults for each compilation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateSettings {
    /// The opening tag delimiter.
    pub open: String,
    /// The closing tag delimiter.
    pub close: String,
    /// Extension appended to include/extend references that have none.
    pub extension: String,
    /// Whether compiled templates record line numbers for error context.
    pub compile_debug: bool,
    /// Whether the generated program listing is logged at compile time.
    pub debug: bool,
    /// Whether bare names resolve against the bindings record.
    pub scope_binding: bool,
    /// Whether compiled templates and file sources are cached by filename.
    pub cache: bool,
    /// Directories searched for template files. Empty means paths are used as-is.
    pub dirs: Vec<PathBuf>,
    /// Maximum include/extend nesting depth.
    pub max_depth: usize,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            open: "<%".to_string(),
            close: "%>".to_string(),
            extension: "ejs".to_string(),
            compile_debug: true,
            debug: false,
            scope_binding: true,
            cache: false,
            dirs: Vec::new(),
            max_depth: 32,
        }
    }
}

/// The complete set of ejs-rs settings.
///
/// # Examples
///
/// ```
/// use ejs_rs_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(!settings.debug);
/// assert_eq!(settings.templates.open, "<%");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level filter (e.g. "info", "ejs_rs_template=debug").
    pub log_level: String,

    // ── Templates ────────────────────────────────────────────────────

    /// Template compiler configuration.
    pub templates: TemplateSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            templates: TemplateSettings::default(),
        }
    }
}
