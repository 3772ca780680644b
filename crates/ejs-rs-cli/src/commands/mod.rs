//! Built-in subcommands.
//!
//! Each command implements the [`CliCommand`](crate::command::CliCommand)
//! trait.

pub mod compile;
pub mod render;

pub use compile::CompileCommand;
pub use render::RenderCommand;

use ejs_rs_template::CompileOptions;

use crate::command::CommandRegistry;

/// Registers all built-in commands into the given registry.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(RenderCommand));
    registry.register(Box::new(CompileCommand));
}

/// Adds the template file argument and the delimiter overrides.
pub(crate) fn template_arguments(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        clap::Arg::new("file")
            .required(true)
            .value_name("FILE")
            .help("Template file to read"),
    )
    .arg(
        clap::Arg::new("open")
            .long("open")
            .value_name("DELIM")
            .help("Opening tag delimiter"),
    )
    .arg(
        clap::Arg::new("close")
            .long("close")
            .value_name("DELIM")
            .help("Closing tag delimiter"),
    )
}

/// Applies the delimiter overrides in `matches` to `options`.
pub(crate) fn apply_delimiters(matches: &clap::ArgMatches, mut options: CompileOptions) -> CompileOptions {
    if let Some(open) = matches.get_one::<String>("open") {
        options.open.clone_from(open);
    }
    if let Some(close) = matches.get_one::<String>("close") {
        options.close.clone_from(close);
    }
    options
}

/// Returns the required `file` argument.
pub(crate) fn file_argument(matches: &clap::ArgMatches) -> Result<&str, ejs_rs_core::EjsError> {
    matches
        .get_one::<String>("file")
        .map(String::as_str)
        .ok_or_else(|| ejs_rs_core::EjsError::ConfigurationError("No template file given".to_string()))
}
