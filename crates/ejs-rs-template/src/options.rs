//! Compile options.
//!
//! [`CompileOptions`] carries everything that influences how a template is
//! scanned, compiled and rendered. An [`Engine`](crate::engine::Engine) holds
//! a default set, usually built from
//! [`TemplateSettings`](ejs_rs_core::settings::TemplateSettings).

use std::fmt;

use ejs_rs_core::settings::TemplateSettings;

use crate::context::{default_escape, EscapeFn};

/// Options controlling compilation and rendering of one template.
#[derive(Clone)]
pub struct CompileOptions {
    /// Opening delimiter, `<%` by default.
    pub open: String,
    /// Closing delimiter, `%>` by default.
    pub close: String,
    /// The template's path; required for includes, layouts and caching.
    pub filename: Option<String>,
    /// Annotate render errors with the failing line and its surroundings.
    pub compile_debug: bool,
    /// Log the generated program listing at debug level.
    pub debug: bool,
    /// Resolve bare names against the bindings record.
    pub scope_binding: bool,
    /// Produce a unit that must be rendered with explicit filters and escape.
    pub client: bool,
    /// Escape function for `<%= %>`; HTML escaping when unset.
    pub escape: Option<EscapeFn>,
    /// Extension appended to include and layout references that have none.
    pub extension: String,
    /// Maximum include/layout/block nesting depth.
    pub max_depth: usize,
    /// Reuse compiled units keyed by filename.
    pub cache: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            open: "<%".to_string(),
            close: "%>".to_string(),
            filename: None,
            compile_debug: true,
            debug: false,
            scope_binding: true,
            client: false,
            escape: None,
            extension: "ejs".to_string(),
            max_depth: 32,
            cache: false,
        }
    }
}

impl CompileOptions {
    /// Creates options with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds options from template settings.
    pub fn from_settings(settings: &TemplateSettings) -> Self {
        Self {
            open: settings.open.clone(),
            close: settings.close.clone(),
            compile_debug: settings.compile_debug,
            debug: settings.debug,
            scope_binding: settings.scope_binding,
            extension: settings.extension.clone(),
            max_depth: settings.max_depth,
            cache: settings.cache,
            ..Self::default()
        }
    }

    /// Sets the template filename.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Sets the delimiters.
    #[must_use]
    pub fn with_delimiters(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.open = open.into();
        self.close = close.into();
        self
    }

    /// Enables or disables error annotation.
    #[must_use]
    pub const fn with_compile_debug(mut self, enabled: bool) -> Self {
        self.compile_debug = enabled;
        self
    }

    /// Enables or disables logging of the program listing.
    #[must_use]
    pub const fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Enables or disables scope binding.
    #[must_use]
    pub const fn with_scope_binding(mut self, enabled: bool) -> Self {
        self.scope_binding = enabled;
        self
    }

    /// Enables or disables client mode.
    #[must_use]
    pub const fn with_client(mut self, enabled: bool) -> Self {
        self.client = enabled;
        self
    }

    /// Sets the escape function.
    #[must_use]
    pub fn with_escape<F>(mut self, escape: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.escape = Some(std::sync::Arc::new(escape));
        self
    }

    /// Enables or disables caching.
    #[must_use]
    pub const fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    /// Returns the configured escape function, or HTML escaping.
    pub fn escape_fn(&self) -> EscapeFn {
        self.escape.clone().unwrap_or_else(default_escape)
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("open", &self.open)
            .field("close", &self.close)
            .field("filename", &self.filename)
            .field("compile_debug", &self.compile_debug)
            .field("debug", &self.debug)
            .field("scope_binding", &self.scope_binding)
            .field("client", &self.client)
            .field("escape", &self.escape.as_ref().map(|_| "<fn>"))
            .field("extension", &self.extension)
            .field("max_depth", &self.max_depth)
            .field("cache", &self.cache)
            .finish()
    }
}
