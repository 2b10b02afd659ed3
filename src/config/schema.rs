//! Configuration validation
//!
//! This module provides validation logic for configuration files.

use crate::config::types::{AssetCategory, BuildOptions, Config, GridSettings, PathTable, ServerConfig};
use crate::error::{ConfigError, ConfigResult};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static LENGTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?(?:\d+\.?\d*|\.\d+))([a-zA-Z%]*)$").unwrap());

/// A CSS length split into magnitude and unit (`30px` -> `30.0`, `px`)
#[derive(Debug, Clone, PartialEq)]
pub struct Length {
    pub value: f64,
    pub unit: String,
}

impl Length {
    /// Scale the magnitude, keeping the unit
    pub fn scaled(&self, factor: f64) -> Length {
        Length {
            value: self.value * factor,
            unit: self.unit.clone(),
        }
    }
}

impl std::fmt::Display for Length {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // trim float noise: 15.0 -> 15, 7.5 -> 7.5
        let rounded = (self.value * 10_000.0).round() / 10_000.0;
        write!(f, "{}{}", rounded, self.unit)
    }
}

/// Parse a CSS length such as `30px`, `2.5rem` or `10%`
pub fn parse_length(field: &str, value: &str) -> ConfigResult<Length> {
    let invalid = || ConfigError::InvalidLength {
        field: field.to_string(),
        value: value.to_string(),
    };

    let caps = LENGTH_RE.captures(value.trim()).ok_or_else(invalid)?;
    let number = caps[1].parse::<f64>().map_err(|_| invalid())?;

    Ok(Length {
        value: number,
        unit: caps[2].to_string(),
    })
}

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    validate_paths(&config.paths)?;
    validate_grid(&config.grid)?;
    validate_server(&config.server)?;
    validate_options(&config.options)?;
    Ok(())
}

/// Every category with a source glob needs an output directory, and all
/// globs must compile
pub fn validate_paths(paths: &PathTable) -> ConfigResult<()> {
    if paths.base.trim().is_empty() {
        return Err(ConfigError::Invalid("paths.base must not be empty".to_string()));
    }
    if paths.clean.trim().is_empty() {
        return Err(ConfigError::Invalid("paths.clean must not be empty".to_string()));
    }

    for category in AssetCategory::ALL {
        let entry = paths.category(category);

        if let Some(src) = &entry.src {
            validate_source_glob(src)?;
            match &entry.build {
                Some(build) if !build.trim().is_empty() => {}
                _ => return Err(ConfigError::MissingBuildPath(category.to_string())),
            }
        }

        if let Some(watch) = &entry.watch {
            validate_watch_glob(watch)?;
        }
    }

    Ok(())
}

fn validate_source_glob(pattern: &str) -> ConfigResult<()> {
    if pattern.trim().is_empty() {
        return Err(ConfigError::InvalidGlob {
            pattern: pattern.to_string(),
            error: "empty pattern".to_string(),
        });
    }
    glob::Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlob {
        pattern: pattern.to_string(),
        error: e.to_string(),
    })?;
    Ok(())
}

fn validate_watch_glob(pattern: &str) -> ConfigResult<()> {
    if pattern.trim().is_empty() {
        return Err(ConfigError::InvalidGlob {
            pattern: pattern.to_string(),
            error: "empty pattern".to_string(),
        });
    }
    globset::Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob {
        pattern: pattern.to_string(),
        error: e.to_string(),
    })?;
    Ok(())
}

/// Grid lengths must parse and breakpoint widths must be distinct
pub fn validate_grid(grid: &GridSettings) -> ConfigResult<()> {
    if grid.columns == 0 {
        return Err(ConfigError::Invalid("grid.columns must be at least 1".to_string()));
    }

    parse_length("grid.offset", &grid.offset)?;
    parse_length("grid.container.maxWidth", &grid.container.max_width)?;
    parse_length("grid.container.fields", &grid.container.fields)?;

    let mut widths = HashSet::new();
    for (name, breakpoint) in &grid.breakpoints {
        let width = parse_length(&format!("grid.breakPoints.{}.width", name), &breakpoint.width)?;
        if let Some(fields) = &breakpoint.fields {
            parse_length(&format!("grid.breakPoints.{}.fields", name), fields)?;
        }
        if let Some(offset) = &breakpoint.offset {
            parse_length(&format!("grid.breakPoints.{}.offset", name), offset)?;
        }

        if !widths.insert(width.to_string()) {
            return Err(ConfigError::Invalid(format!(
                "grid breakpoint '{}' repeats width {}",
                name, breakpoint.width
            )));
        }
    }

    Ok(())
}

/// Ports must be usable and distinct
pub fn validate_server(server: &ServerConfig) -> ConfigResult<()> {
    if server.host.trim().is_empty() {
        return Err(ConfigError::Invalid("server.host must not be empty".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Invalid("server.port must not be 0".to_string()));
    }
    if server.live_reload {
        if server.reload_port == 0 {
            return Err(ConfigError::Invalid("server.reloadPort must not be 0".to_string()));
        }
        if server.reload_port == server.port {
            return Err(ConfigError::Invalid(format!(
                "server.port and server.reloadPort are both {}",
                server.port
            )));
        }
    }
    Ok(())
}

fn validate_options(options: &BuildOptions) -> ConfigResult<()> {
    if options.browsers.is_empty() {
        return Err(ConfigError::Invalid("options.browsers must not be empty".to_string()));
    }
    if !(1..=100).contains(&options.jpeg_quality) {
        return Err(ConfigError::Invalid(format!(
            "options.jpegQuality must be between 1 and 100, got {}",
            options.jpeg_quality
        )));
    }
    if !options.bundle.ends_with(".js") || options.bundle.contains(['/', '\\']) {
        return Err(ConfigError::Invalid(format!(
            "options.bundle must be a plain .js file name, got '{}'",
            options.bundle
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{AssetPaths, Breakpoint};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_source_without_build_directory() {
        let mut config = Config::default();
        config.paths.img = AssetPaths {
            src: Some("src/img/*.png".to_string()),
            watch: None,
            build: None,
        };

        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::MissingBuildPath(ref c)) if c == "img"));
    }

    #[test]
    fn test_category_without_source_needs_no_build() {
        let mut config = Config::default();
        config.paths.fonts = AssetPaths::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_glob() {
        let mut config = Config::default();
        config.paths.js.src = Some("src/js/[*.js".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidGlob { .. })
        ));
    }

    #[test]
    fn test_zero_columns() {
        let mut config = Config::default();
        config.grid.columns = 0;
        assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_duplicate_breakpoint_widths() {
        let mut config = Config::default();
        config
            .grid
            .breakpoints
            .insert("tablet".to_string(), Breakpoint::new("960px"));
        assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_length() {
        let mut config = Config::default();
        config.grid.offset = "wide".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_same_http_and_reload_port() {
        let mut config = Config::default();
        config.server.reload_port = config.server.port;
        assert!(validate_config(&config).is_err());

        config.server.live_reload = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_bundle_name_must_be_js() {
        let mut config = Config::default();
        config.options.bundle = "js/app.js".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(
            parse_length("x", "30px").unwrap(),
            Length {
                value: 30.0,
                unit: "px".to_string()
            }
        );
        assert_eq!(parse_length("x", ".5rem").unwrap().value, 0.5);
        assert_eq!(parse_length("x", "10%").unwrap().unit, "%");
        assert_eq!(parse_length("x", "0").unwrap().unit, "");
        assert!(parse_length("x", "px").is_err());
    }

    #[test]
    fn test_length_display_trims_noise() {
        let half = parse_length("x", "15px").unwrap().scaled(0.5);
        assert_eq!(half.to_string(), "7.5px");
        assert_eq!(parse_length("x", "30px").unwrap().to_string(), "30px");
    }
}
