//! # ejs-rs-cli
//!
//! The `ejs` command-line tool.
//!
//! - `ejs render <file> [--data JSON] [--open D] [--close D] [--no-trace]`
//!   renders a template with JSON bindings
//! - `ejs compile <file>` prints the program listing of a template
//!
//! Both accept a global `--config <file>` naming a settings file.
//!
//! ```rust
//! use ejs_rs_cli::command::CommandRegistry;
//! use ejs_rs_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//! assert_eq!(registry.list_commands(), vec!["compile", "render"]);
//! ```

pub mod command;
pub mod commands;

pub use command::{CliCommand, CommandRegistry};
