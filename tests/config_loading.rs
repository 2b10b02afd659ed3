//! Integration tests for sprocket.yml parsing and discovery

mod common;

use common::Project;
use sprocket::config::{
    find_config_file_from, load_config, parse_config, parse_config_file, validate_config,
    GridFormat,
};
use sprocket::error::{ConfigError, SprocketError};
use std::fs;

#[test]
fn test_parse_complete_config() {
    let yaml = r#"
paths:
  base: dist
  clean: dist
  html:
    src: "pages/*.html"
    watch: "pages/**/*.html"
    build: "dist/"
  js:
    src: "scripts/*.js"
    watch: "scripts/**/*.js"
    build: "dist/js/"
grid:
  enabled: false
  outputStyle: css
  columns: 16
server:
  host: 0.0.0.0
  port: 3000
  logPrefix: site
  baseDir: dist
  liveReload: false
options:
  browsers: ["defaults"]
  scriptTarget: es2017
  bundle: app.js
  jpegQuality: 70
  sourceMaps: false
"#;

    let config = parse_config(yaml).unwrap();
    validate_config(&config).unwrap();

    assert_eq!(config.paths.base, "dist");
    assert_eq!(config.paths.html.src.as_deref(), Some("pages/*.html"));
    assert_eq!(config.paths.js.build.as_deref(), Some("dist/js/"));
    // categories missing from the file keep the default layout
    assert_eq!(config.paths.style.src.as_deref(), Some("src/style/main.scss"));

    assert!(!config.grid.enabled);
    assert_eq!(config.grid.format, GridFormat::Css);
    assert_eq!(config.grid.columns, 16);

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.log_prefix, "site");
    assert!(!config.server.live_reload);

    assert_eq!(config.options.bundle, "app.js");
    assert_eq!(config.options.jpeg_quality, 70);
    assert!(!config.options.source_maps);
}

#[test]
fn test_empty_file_is_default_config() {
    let project = Project::with_config("");
    let config = parse_config_file(&project.root().join("sprocket.yml")).unwrap();
    assert_eq!(config, Default::default());
}

#[test]
fn test_invalid_yaml_is_reported() {
    let err = parse_config("paths: [unclosed").unwrap_err();
    assert!(matches!(err, SprocketError::Yaml(_)));
}

#[test]
fn test_source_without_build_dir_is_rejected() {
    let yaml = r#"
paths:
  img:
    src: "assets/*.png"
"#;
    let config = parse_config(yaml).unwrap();
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ConfigError::MissingBuildPath(ref c) if c == "img"));
}

#[test]
fn test_duplicate_breakpoint_widths_are_rejected() {
    let yaml = r#"
grid:
  breakPoints:
    md:
      width: 960px
    tablet:
      width: 960px
"#;
    let config = parse_config(yaml).unwrap();
    assert!(validate_config(&config).is_err());
}

#[test]
fn test_same_server_and_reload_port_is_rejected() {
    let config = parse_config("server:\n  port: 4000\n  reloadPort: 4000\n").unwrap();
    assert!(validate_config(&config).is_err());
}

#[test]
fn test_find_config_in_parent_directory() {
    let project = Project::with_config("server:\n  port: 9000\n");
    let nested = project.root().join("src/js");
    fs::create_dir_all(&nested).unwrap();

    let found = find_config_file_from(nested).unwrap();
    assert_eq!(found, project.root().join("sprocket.yml"));
}

#[test]
fn test_yaml_extension_is_found() {
    let project = Project::new();
    project.write("sprocket.yaml", "{}");
    let found = find_config_file_from(project.root().to_path_buf()).unwrap();
    assert_eq!(found.file_name().unwrap(), "sprocket.yaml");
}

#[test]
fn test_load_explicit_file_sets_root() {
    let project = Project::new();
    let path = project.write("site/sprocket.yml", "grid:\n  columns: 10\n");

    let (config, root) = load_config(Some(&path)).unwrap();
    assert_eq!(config.grid.columns, 10);
    assert_eq!(root, project.root().join("site"));
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let project = Project::new();
    let err = load_config(Some(&project.root().join("nope.yml"))).unwrap_err();
    assert!(matches!(err, SprocketError::Config(ConfigError::NotFound(_))));
}
