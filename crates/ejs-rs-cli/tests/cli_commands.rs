//! Integration tests for the `ejs` subcommands, run through the registry
//! against real template files.

use std::fs;
use std::path::Path;

use ejs_rs_cli::command::CommandRegistry;
use ejs_rs_cli::commands::register_builtin_commands;
use ejs_rs_core::{EjsError, Settings};

fn run(args: &[&str], settings: &Settings) -> Result<String, EjsError> {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);
    let matches = registry
        .build_cli()
        .try_get_matches_from(args)
        .map_err(|e| EjsError::ConfigurationError(e.to_string()))?;
    let mut out = Vec::new();
    registry.execute(&matches, settings, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

fn write(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_render_with_inline_data() {
    let dir = tempfile::tempdir().unwrap();
    let page = write(dir.path(), "page.ejs", "Hello <%= name %>!");
    let out = run(
        &["ejs", "render", &page, "--data", r#"{"name": "<Ann>"}"#],
        &Settings::default(),
    )
    .unwrap();
    assert_eq!(out, "Hello &lt;Ann&gt;!");
}

#[test]
fn test_render_with_layout_and_include() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "layout.ejs", "<main><%block body%><%/block%></main>");
    write(dir.path(), "nav.ejs", "<nav/>");
    let page = write(
        dir.path(),
        "page.ejs",
        "<%+ layout %><%block body%><%include nav %><%= title %><%/block%>",
    );
    let out = run(
        &["ejs", "render", &page, "-d", r#"{"title": "Home"}"#],
        &Settings::default(),
    )
    .unwrap();
    assert_eq!(out, "<main><nav/>Home</main>");
}

#[test]
fn test_render_with_custom_delimiters() {
    let dir = tempfile::tempdir().unwrap();
    let page = write(dir.path(), "page.ejs", "{{= 1 + 1 }}");
    let out = run(
        &["ejs", "render", &page, "--open", "{{", "--close", "}}"],
        &Settings::default(),
    )
    .unwrap();
    assert_eq!(out, "2");
}

#[test]
fn test_render_error_tracing_toggle() {
    let dir = tempfile::tempdir().unwrap();
    let page = write(dir.path(), "page.ejs", "a\n<%= missing %>");
    let traced = run(&["ejs", "render", &page], &Settings::default()).unwrap_err();
    assert_eq!(traced.line(), Some(2));

    let plain = run(&["ejs", "render", &page, "--no-trace"], &Settings::default()).unwrap_err();
    assert!(matches!(plain, EjsError::RenderError(_)));
}

#[test]
fn test_render_uses_settings_delimiters() {
    let dir = tempfile::tempdir().unwrap();
    let page = write(dir.path(), "page.ejs", "[[= x ]]");
    let mut settings = Settings::default();
    settings.templates.open = "[[".to_string();
    settings.templates.close = "]]".to_string();
    let out = run(&["ejs", "render", &page, "-d", r#"{"x": 5}"#], &settings).unwrap();
    assert_eq!(out, "5");
}

#[test]
fn test_compile_prints_listing() {
    let dir = tempfile::tempdir().unwrap();
    let page = write(dir.path(), "page.ejs", "Hi <%= name %>");
    let out = run(&["ejs", "compile", &page], &Settings::default()).unwrap();
    assert!(out.contains("buf.push('Hi ');"));
    assert!(out.contains("buf.push(escape(( name )));"));
    assert!(out.contains("return buf.join('');"));
}

#[test]
fn test_missing_template() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.ejs");
    let err = run(
        &["ejs", "render", &missing.to_string_lossy()],
        &Settings::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EjsError::TemplateDoesNotExist(_)));
}
