//! Logging for the compiler and the `ejs` binary.
//!
//! Diagnostics always go to stderr so rendered output on stdout stays clean.
//! [`render_span`] groups the events of one render under its template path.

use crate::settings::Settings;

/// Environment variable that overrides `settings.log_level` entirely.
pub const LOG_ENV: &str = "EJS_LOG";

/// Crates whose events follow the configured level. Everything else is held
/// at `warn`.
const OWN_CRATES: [&str; 5] = ["ejs", "ejs_rs", "ejs_rs_core", "ejs_rs_template", "ejs_rs_cli"];

/// Builds the filter directives for a level setting.
///
/// A bare level such as `debug` applies to the ejs-rs crates only. A value
/// containing `=` or `,` is taken as a full directive list. `override_level`
/// (normally the value of [`LOG_ENV`]) wins over `level` when non-empty.
///
/// # Examples
///
/// ```
/// use ejs_rs_core::logging::filter_directives;
///
/// assert_eq!(
///     filter_directives("debug", None),
///     "warn,ejs=debug,ejs_rs=debug,ejs_rs_core=debug,ejs_rs_template=debug,ejs_rs_cli=debug"
/// );
/// assert_eq!(filter_directives("info", Some("ejs_rs_template=trace")), "ejs_rs_template=trace");
/// ```
pub fn filter_directives(level: &str, override_level: Option<&str>) -> String {
    let level = override_level
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| level.trim());
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    let level = if level.is_empty() { "info" } else { level };
    let scoped: Vec<String> = OWN_CRATES.iter().map(|krate| format!("{krate}={level}")).collect();
    format!("warn,{}", scoped.join(","))
}

/// Installs the global subscriber.
///
/// Debug settings get the pretty format with source locations; otherwise
/// events are written as JSON lines. A second call leaves the first
/// subscriber in place.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let override_level = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(&settings.log_level, override_level.as_deref());
    let filter =
        EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(filter_directives("info", None)));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if settings.debug {
        builder.with_file(true).with_line_number(true).pretty().try_init()
    } else {
        builder.with_target(false).json().try_init()
    };
    if installed.is_ok() {
        tracing::debug!(%directives, debug = settings.debug, "logging initialised");
    }
}

/// Creates a tracing span for rendering one template.
///
/// # Examples
///
/// ```
/// use ejs_rs_core::logging::render_span;
///
/// let span = render_span(Some("views/index.ejs"));
/// let _guard = span.enter();
/// tracing::info!("rendering");
/// ```
pub fn render_span(filename: Option<&str>) -> tracing::Span {
    tracing::debug_span!("render", filename = filename.unwrap_or("<anonymous>"))
}
