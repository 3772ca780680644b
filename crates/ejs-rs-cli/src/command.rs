//! Command framework for the `ejs` binary.
//!
//! This module provides the [`CliCommand`] trait for defining subcommands and
//! [`CommandRegistry`] for registering them and dispatching parsed arguments.
//!
//! ## Defining a Custom Command
//!
//! ```rust
//! use std::io::Write;
//!
//! use ejs_rs_cli::command::CliCommand;
//! use ejs_rs_core::{EjsError, Settings};
//!
//! struct GreetCommand;
//!
//! impl CliCommand for GreetCommand {
//!     fn name(&self) -> &'static str { "greet" }
//!     fn help(&self) -> &'static str { "Say hello" }
//!
//!     fn handle(
//!         &self,
//!         _matches: &clap::ArgMatches,
//!         _settings: &Settings,
//!         out: &mut dyn Write,
//!     ) -> Result<(), EjsError> {
//!         writeln!(out, "Hello from ejs-rs!")?;
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::io::Write;

use ejs_rs_core::{EjsError, Settings};

/// A subcommand of the `ejs` binary.
pub trait CliCommand: Send + Sync {
    /// Returns the name used to invoke this command.
    fn name(&self) -> &'static str;

    /// Returns a short help description.
    fn help(&self) -> &'static str;

    /// Adds arguments to the clap subcommand.
    ///
    /// The default implementation returns the command unchanged.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Runs the command, writing its output to `out`.
    fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
        out: &mut dyn Write,
    ) -> Result<(), EjsError>;
}

/// A registry of subcommands, keyed by name.
pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn CliCommand>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Creates a new empty command registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Registers a command, replacing any command with the same name.
    pub fn register(&mut self, command: Box<dyn CliCommand>) {
        self.commands.insert(command.name(), command);
    }

    /// Returns the command with the given name, if registered.
    pub fn get(&self, name: &str) -> Option<&dyn CliCommand> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Returns the registered command names, sorted.
    pub fn list_commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Builds the top-level clap `Command` with every registered subcommand
    /// and the global `--config` option.
    pub fn build_cli(&self) -> clap::Command {
        let mut app = clap::Command::new("ejs")
            .about("Render and inspect embedded-code templates")
            .subcommand_required(true)
            .arg(
                clap::Arg::new("config")
                    .long("config")
                    .short('c')
                    .global(true)
                    .value_name("FILE")
                    .help("Settings file (TOML, or JSON with a .json extension)"),
            );

        let mut entries: Vec<_> = self.commands.values().collect();
        entries.sort_by_key(|cmd| cmd.name());
        for cmd in entries {
            let subcmd = clap::Command::new(cmd.name()).about(cmd.help());
            app = app.subcommand(cmd.add_arguments(subcmd));
        }
        app
    }

    /// Dispatches parsed arguments to the selected command.
    pub fn execute(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
        out: &mut dyn Write,
    ) -> Result<(), EjsError> {
        let (name, sub_matches) = matches.subcommand().ok_or_else(|| {
            EjsError::ConfigurationError("No subcommand specified".to_string())
        })?;
        let cmd = self
            .get(name)
            .ok_or_else(|| EjsError::ConfigurationError(format!("Unknown command: {name}")))?;
        tracing::debug!(command = name, "running command");
        cmd.handle(sub_matches, settings, out)
    }
}
