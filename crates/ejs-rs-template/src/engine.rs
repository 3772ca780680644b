//! Template engine: compiling, caching and rendering templates.
//!
//! The [`Engine`] is the central entry point. It owns default
//! [`CompileOptions`], the [`TemplateLoader`] used for layouts, includes and
//! `render_file`, the filter registry bound into compiled templates, and a
//! [`TemplateCache`].

use std::fmt;
use std::sync::Arc;

use ejs_rs_core::error::EjsError;
use ejs_rs_core::logging::render_span;
use ejs_rs_core::settings::TemplateSettings;

use crate::buffer::CodeBuffer;
use crate::cache::TemplateCache;
use crate::context::{Context, EscapeFn, Value};
use crate::filters::{default_registry, Filter, FilterRegistry};
use crate::interpreter::execute;
use crate::loaders::{FileSystemLoader, TemplateLoader};
use crate::options::CompileOptions;
use crate::parser::{parse_buffer, Program};
use crate::scanner::scan;

/// A compiled template.
///
/// Templates are immutable and can be rendered any number of times, from any
/// number of threads.
pub struct Template {
    program: Arc<Program>,
    listing: String,
    filters: FilterRegistry,
    escape: EscapeFn,
    client: bool,
    compile_debug: bool,
}

impl Template {
    /// Renders the template with its bound filters and escape function.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for client-mode templates, which must be
    /// rendered through [`Template::render_with`], and any render error.
    pub fn render(&self, context: &Context) -> Result<String, EjsError> {
        if self.client {
            return Err(EjsError::ConfigurationError(
                "client-mode templates must be rendered with explicit filters".to_string(),
            ));
        }
        self.render_with(context, &self.filters, None)
    }

    /// Renders the template with caller-supplied filters and escape function.
    ///
    /// A missing escape function falls back to the one the template was
    /// compiled with.
    pub fn render_with(
        &self,
        context: &Context,
        filters: &FilterRegistry,
        escape: Option<&EscapeFn>,
    ) -> Result<String, EjsError> {
        let _span = render_span(self.filename()).entered();
        execute(
            &self.program,
            context,
            filters,
            escape.unwrap_or(&self.escape),
            self.compile_debug,
        )
    }

    /// Returns the program listing of the scanned template.
    pub fn listing(&self) -> &str {
        &self.listing
    }

    /// Returns the file the template was compiled from.
    pub fn filename(&self) -> Option<&str> {
        self.program.origin.filename.as_deref()
    }

    /// Returns `true` if the template was compiled in client mode.
    pub const fn is_client(&self) -> bool {
        self.client
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("filename", &self.filename())
            .field("client", &self.client)
            .field("compile_debug", &self.compile_debug)
            .finish_non_exhaustive()
    }
}

/// The template engine. Manages the loader, filters, cache and rendering.
///
/// # Examples
///
/// ```
/// use ejs_rs_template::engine::Engine;
/// use ejs_rs_template::context::Context;
/// use ejs_rs_template::options::CompileOptions;
///
/// let engine = Engine::new();
/// let mut ctx = Context::new();
/// ctx.set("name", "World");
///
/// let out = engine.render("Hello <%= name %>!", &CompileOptions::default(), &ctx).unwrap();
/// assert_eq!(out, "Hello World!");
/// ```
pub struct Engine {
    options: CompileOptions,
    loader: Arc<dyn TemplateLoader>,
    filters: FilterRegistry,
    cache: TemplateCache,
}

impl Engine {
    /// Creates an engine reading templates from the filesystem.
    pub fn new() -> Self {
        Self {
            options: CompileOptions::default(),
            loader: Arc::new(FileSystemLoader::default()),
            filters: default_registry().clone(),
            cache: TemplateCache::new(),
        }
    }

    /// Creates an engine from the given settings.
    pub fn from_settings(settings: &TemplateSettings) -> Self {
        Self {
            options: CompileOptions::from_settings(settings),
            loader: Arc::new(FileSystemLoader::new(settings.dirs.clone())),
            ..Self::new()
        }
    }

    /// Replaces the template loader.
    #[must_use]
    pub fn with_loader(mut self, loader: impl TemplateLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    /// Registers a filter for templates compiled from now on.
    pub fn register_filter(&mut self, filter: Box<dyn Filter>) {
        self.filters.register(filter);
    }

    /// Registers a closure as a filter.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EjsError> + Send + Sync + 'static,
    {
        self.filters.register_fn(name, func);
    }

    /// Returns the engine's default compile options.
    pub const fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Returns the engine's default compile options for modification.
    pub fn options_mut(&mut self) -> &mut CompileOptions {
        &mut self.options
    }

    /// Returns the filters bound into compiled templates.
    pub const fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// Returns the template loader.
    pub fn loader(&self) -> &dyn TemplateLoader {
        &*self.loader
    }

    /// Returns the compiled-unit cache.
    pub const fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Scans a template into its code buffer, resolving layouts and includes.
    pub fn parse(&self, source: &str, options: &CompileOptions) -> Result<CodeBuffer, EjsError> {
        scan(source, options, &*self.loader)
    }

    /// Compiles a template.
    ///
    /// With `options.cache` the compiled template is stored under
    /// `options.filename` and reused by later compiles of the same file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` when caching is requested without a
    /// filename, and any scan, load or syntax error.
    pub fn compile(&self, source: &str, options: &CompileOptions) -> Result<Arc<Template>, EjsError> {
        if !options.cache {
            return Ok(Arc::new(self.build(source, options)?));
        }
        let filename = options.filename.as_deref().ok_or_else(|| {
            EjsError::ConfigurationError("filename option is required for caching".to_string())
        })?;
        if let Some(template) = self.cache.get(filename) {
            tracing::debug!(filename, "template cache hit");
            return Ok(template);
        }
        let template = Arc::new(self.build(source, options)?);
        tracing::debug!(filename, "caching compiled template");
        Ok(self.cache.insert(filename, template))
    }

    fn build(&self, source: &str, options: &CompileOptions) -> Result<Template, EjsError> {
        tracing::debug!(filename = ?options.filename, "compiling template");
        let buffer = self.parse(source, options)?;
        let listing = buffer.to_string();
        if options.debug {
            tracing::debug!(filename = ?options.filename, "program listing:\n{listing}");
        }
        let program = parse_buffer(&buffer)?;
        Ok(Template {
            program: Arc::new(program),
            listing,
            filters: self.filters.clone(),
            escape: options.escape_fn(),
            client: options.client,
            compile_debug: options.compile_debug,
        })
    }

    /// Compiles and renders a template in one step.
    pub fn render(&self, source: &str, options: &CompileOptions, context: &Context) -> Result<String, EjsError> {
        self.compile(source, options)?.render(context)
    }

    /// Reads a template through the loader and renders it.
    ///
    /// `path` becomes the template's filename. With `options.cache` the raw
    /// text is cached under `path:string` and the compiled unit under `path`.
    pub fn render_file(&self, path: &str, options: &CompileOptions, context: &Context) -> Result<String, EjsError> {
        let options = options.clone().with_filename(path);
        let source = if options.cache {
            match self.cache.get_source(path) {
                Some(source) => source,
                None => self
                    .cache
                    .insert_source(path, Arc::from(self.loader.load(path)?)),
            }
        } else {
            Arc::from(self.loader.load(path)?)
        };
        self.render(&source, &options, context)
    }

    /// Drops every cached template and source.
    pub fn clear_cache(&self) {
        tracing::debug!(entries = self.cache.len(), "clearing template cache");
        self.cache.clear();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("filters", &self.filters)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Compiles a template with a fresh filesystem-backed engine.
pub fn compile(source: &str, options: &CompileOptions) -> Result<Arc<Template>, EjsError> {
    Engine::new().compile(source, options)
}

/// Compiles and renders a template with a fresh filesystem-backed engine.
pub fn render(source: &str, options: &CompileOptions, context: &Context) -> Result<String, EjsError> {
    Engine::new().render(source, options, context)
}
