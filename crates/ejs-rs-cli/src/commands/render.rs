//! The `render` command.
//!
//! Renders a template file with JSON bindings and writes the output.

use std::io::Write;

use ejs_rs_core::{EjsError, Settings};
use ejs_rs_template::{Context, Engine};

use super::{apply_delimiters, file_argument, template_arguments};
use crate::command::CliCommand;

/// Renders a template file to standard output.
pub struct RenderCommand;

/// Builds the bindings record from a `--data` value.
///
/// The value is a JSON object, or `@path` naming a file that contains one.
/// No value gives an empty record.
pub fn load_data(data: Option<&str>) -> Result<Context, EjsError> {
    let Some(data) = data else {
        return Ok(Context::new());
    };
    let text = match data.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => data.to_string(),
    };
    let value: serde_json::Value = serde_json::from_str(&text)?;
    Context::from_json(value)
}

impl CliCommand for RenderCommand {
    fn name(&self) -> &'static str {
        "render"
    }

    fn help(&self) -> &'static str {
        "Render a template with JSON bindings"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        template_arguments(cmd)
            .arg(
                clap::Arg::new("data")
                    .long("data")
                    .short('d')
                    .value_name("JSON")
                    .help("Bindings as a JSON object, or @FILE to read them from a file"),
            )
            .arg(
                clap::Arg::new("no-trace")
                    .long("no-trace")
                    .action(clap::ArgAction::SetTrue)
                    .help("Report render errors without source context"),
            )
    }

    fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
        out: &mut dyn Write,
    ) -> Result<(), EjsError> {
        let file = file_argument(matches)?;
        let engine = Engine::from_settings(&settings.templates);
        let mut options = apply_delimiters(matches, engine.options().clone());
        if matches.get_flag("no-trace") {
            options.compile_debug = false;
        }
        let context = load_data(matches.get_one::<String>("data").map(String::as_str))?;

        let rendered = engine.render_file(file, &options, &context)?;
        tracing::debug!(file, bytes = rendered.len(), "rendered template");
        out.write_all(rendered.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_data_inline() {
        let ctx = load_data(Some(r#"{"name": "Ann"}"#)).unwrap();
        assert_eq!(ctx.get("name").map(ToString::to_string).as_deref(), Some("Ann"));
    }

    #[test]
    fn test_load_data_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"n": 2}"#).unwrap();
        let ctx = load_data(Some(&format!("@{}", path.display()))).unwrap();
        assert!(ctx.contains("n"));
    }

    #[test]
    fn test_load_data_rejects_non_objects() {
        assert!(matches!(
            load_data(Some("[1, 2]")),
            Err(EjsError::SerializationError(_))
        ));
        assert!(load_data(None).unwrap().is_empty());
    }
}
