//! # ejs-rs
//!
//! Embedded-code text templates for Rust.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `ejs-rs` to get everything, or on individual crates for
//! finer-grained control.

/// Error types, settings and logging setup.
pub use ejs_rs_core as core;

/// Template scanning, layouts, includes, filters, compilation and rendering.
#[cfg(feature = "template")]
pub use ejs_rs_template as template;

/// The `ejs` command framework and built-in commands.
#[cfg(feature = "cli")]
pub use ejs_rs_cli as cli;

/// Third-party crates templates are commonly used with.
pub use serde_json;
pub use tracing;

/// The most commonly used types.
pub mod prelude {
    pub use ejs_rs_core::{EjsError, EjsResult, Settings, TemplateSettings};

    #[cfg(feature = "template")]
    pub use ejs_rs_template::{compile, render, CompileOptions, Context, Engine, Template, Value};
}
