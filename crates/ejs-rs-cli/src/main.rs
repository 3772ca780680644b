use anyhow::Context as _;

use ejs_rs_cli::command::CommandRegistry;
use ejs_rs_cli::commands::register_builtin_commands;
use ejs_rs_core::logging::setup_logging;
use ejs_rs_core::settings_loader;

fn main() -> anyhow::Result<()> {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);
    let matches = registry.build_cli().get_matches();

    let settings = match matches.get_one::<String>("config") {
        Some(path) => settings_loader::from_file_with_env(path)
            .with_context(|| format!("failed to load settings from {path}"))?,
        None => settings_loader::from_env(),
    };
    setup_logging(&settings);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    registry.execute(&matches, &settings, &mut out)?;
    Ok(())
}
