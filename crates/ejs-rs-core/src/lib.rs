//! # ejs-rs-core
//!
//! Core types shared by the ejs-rs crates: the error enum, settings and their
//! loaders, and tracing-based logging setup.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Engine and template configuration
//! - [`settings_loader`] - Loading settings from TOML, JSON and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{EjsError, EjsResult};
pub use settings::{Settings, TemplateSettings};
