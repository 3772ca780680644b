//! # ejs-rs-template
//!
//! Template compiler for ejs-rs. Turns text with embedded code tags into
//! reusable, thread-safe render units, with layout inheritance, includes,
//! filter pipes and line-traced render errors.
//!
//! ## Modules
//!
//! - [`scanner`] - Splits template text into a typed [`buffer::CodeBuffer`]
//! - [`inheritance`] - `<%+ layout %>` and `<%block%>` resolution
//! - [`include`] - `<%include%>` resolution and the template path rule
//! - [`lexer`] / [`parser`] - The embedded language's tokens and syntax tree
//! - [`interpreter`] - Executes parsed templates against a [`context::Context`]
//! - [`filters`] - The filter registry and built-in filters
//! - [`engine`] - Compiling, caching and rendering
//! - [`trace`] - Source-window annotation of render errors
//!
//! ## Quick start
//!
//! ```
//! use ejs_rs_template::{render, CompileOptions, Context};
//!
//! let mut ctx = Context::new();
//! ctx.set("items", vec!["a", "b"]);
//!
//! let out = render(
//!     "<% items.forEach(function(item){ %><li><%= item %></li><% }) %>",
//!     &CompileOptions::default(),
//!     &ctx,
//! )
//! .unwrap();
//! assert_eq!(out, "<li>a</li><li>b</li>");
//! ```

pub mod buffer;
pub mod cache;
pub mod context;
pub mod engine;
pub mod filters;
pub mod include;
pub mod inheritance;
pub mod interpreter;
pub mod lexer;
pub mod loaders;
pub mod options;
pub mod parser;
pub mod scanner;
pub mod trace;

pub use context::{Context, Value};
pub use engine::{compile, render, Engine, Template};
pub use filters::{Filter, FilterRegistry};
pub use loaders::{FileSystemLoader, StringLoader, TemplateLoader};
pub use options::CompileOptions;
