//! The `compile` command.
//!
//! Scans a template, resolving its layouts and includes, and prints the
//! program listing without rendering it.

use std::io::Write;

use ejs_rs_core::{EjsError, Settings};
use ejs_rs_template::Engine;

use super::{apply_delimiters, file_argument, template_arguments};
use crate::command::CliCommand;

/// Prints the program listing of a template file.
pub struct CompileCommand;

impl CliCommand for CompileCommand {
    fn name(&self) -> &'static str {
        "compile"
    }

    fn help(&self) -> &'static str {
        "Print the program listing of a template"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        template_arguments(cmd)
    }

    fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
        out: &mut dyn Write,
    ) -> Result<(), EjsError> {
        let file = file_argument(matches)?;
        let engine = Engine::from_settings(&settings.templates);
        let options = apply_delimiters(matches, engine.options().clone()).with_filename(file);

        let source = engine.loader().load(file)?;
        let buffer = engine.parse(&source, &options)?;
        write!(out, "{buffer}")?;
        Ok(())
    }
}
