//! Core configuration types
//!
//! This module defines the data structures that represent a sprocket.yml file.
//! Every section is optional; missing sections fall back to the layout of a
//! conventional `src/` -> `build/` front-end project.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Source, watch and build locations per asset category
    pub paths: PathTable,

    /// Responsive grid generator settings
    pub grid: GridSettings,

    /// Development server settings
    pub server: ServerConfig,

    /// Tuning for the individual transforms
    pub options: BuildOptions,
}

/// Asset categories handled by the transform tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetCategory {
    Html,
    Js,
    Style,
    Img,
    Fonts,
}

impl AssetCategory {
    /// All categories, in the order their transforms are declared
    pub const ALL: [AssetCategory; 5] = [
        AssetCategory::Html,
        AssetCategory::Js,
        AssetCategory::Style,
        AssetCategory::Img,
        AssetCategory::Fonts,
    ];

    /// Key used for this category in the configuration file
    pub fn key(self) -> &'static str {
        match self {
            AssetCategory::Html => "html",
            AssetCategory::Js => "js",
            AssetCategory::Style => "style",
            AssetCategory::Img => "img",
            AssetCategory::Fonts => "fonts",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Static mapping from asset category to its locations
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PathTable {
    /// Base build directory (holds the revision manifest)
    pub base: String,

    /// Directory removed by the `clean` task
    pub clean: String,

    pub html: AssetPaths,
    pub js: AssetPaths,
    pub style: AssetPaths,
    pub img: AssetPaths,
    pub fonts: AssetPaths,
}

impl PathTable {
    /// Locations for one category
    pub fn category(&self, category: AssetCategory) -> &AssetPaths {
        match category {
            AssetCategory::Html => &self.html,
            AssetCategory::Js => &self.js,
            AssetCategory::Style => &self.style,
            AssetCategory::Img => &self.img,
            AssetCategory::Fonts => &self.fonts,
        }
    }
}

impl Default for PathTable {
    fn default() -> Self {
        PathTable {
            base: "build".to_string(),
            clean: "build".to_string(),
            html: AssetPaths::new("src/*.html", "src/**/*.html", "build/"),
            js: AssetPaths::new("src/js/*.js", "src/js/**/*.js", "build/js/"),
            style: AssetPaths::new("src/style/main.scss", "src/style/**/*.scss", "build/css/"),
            img: AssetPaths::new("src/img/**/*.*", "src/img/**/*.*", "build/img/"),
            fonts: AssetPaths::new("src/fonts/**/*.*", "src/fonts/**/*.*", "build/fonts/"),
        }
    }
}

/// Locations for a single asset category
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AssetPaths {
    /// Glob selecting the transform inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    /// Glob whose changes re-run the transform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch: Option<String>,

    /// Output directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
}

impl AssetPaths {
    pub fn new(src: &str, watch: &str, build: &str) -> Self {
        AssetPaths {
            src: Some(src.to_string()),
            watch: Some(watch.to_string()),
            build: Some(build.to_string()),
        }
    }
}

/// Output syntax of the generated grid partial
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GridFormat {
    /// Sass mixins, imported by the stylesheet entry point
    #[default]
    Scss,
    /// Ready-made utility classes
    Css,
}

/// Declarative responsive grid description
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridSettings {
    /// Generate the partial at startup
    pub enabled: bool,

    #[serde(rename = "outputStyle", alias = "format")]
    pub format: GridFormat,

    /// Number of grid columns
    pub columns: u32,

    /// Gutter width
    pub offset: String,

    /// Use `min-width` media features instead of `max-width`
    #[serde(rename = "mobileFirst", alias = "mobile_first")]
    pub mobile_first: bool,

    pub container: GridContainer,

    /// Directory the partial is written to
    pub output: String,

    #[serde(rename = "breakPoints", alias = "breakpoints")]
    pub breakpoints: BTreeMap<String, Breakpoint>,
}

impl Default for GridSettings {
    fn default() -> Self {
        let mut breakpoints = BTreeMap::new();
        breakpoints.insert("lg".to_string(), Breakpoint::new("1100px"));
        breakpoints.insert("md".to_string(), Breakpoint::new("960px"));
        breakpoints.insert(
            "sm".to_string(),
            Breakpoint {
                fields: Some("15px".to_string()),
                ..Breakpoint::new("780px")
            },
        );
        breakpoints.insert("xs".to_string(), Breakpoint::new("560px"));

        GridSettings {
            enabled: true,
            format: GridFormat::Scss,
            columns: 12,
            offset: "30px".to_string(),
            mobile_first: false,
            container: GridContainer::default(),
            output: "src/style/utils".to_string(),
            breakpoints,
        }
    }
}

/// Container sizing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridContainer {
    #[serde(rename = "maxWidth", alias = "max_width")]
    pub max_width: String,

    /// Side padding
    pub fields: String,
}

impl Default for GridContainer {
    fn default() -> Self {
        GridContainer {
            max_width: "1440px".to_string(),
            fields: "30px".to_string(),
        }
    }
}

/// A named screen-width threshold
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Breakpoint {
    pub width: String,

    /// Overrides `container.fields` below this width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,

    /// Overrides the gutter below this width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

impl Breakpoint {
    pub fn new(width: &str) -> Self {
        Breakpoint {
            width: width.to_string(),
            fields: None,
            offset: None,
        }
    }
}

/// Development server settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Prefix for server log lines
    #[serde(rename = "logPrefix", alias = "log_prefix")]
    pub log_prefix: String,

    /// Directory served as the site root
    #[serde(rename = "baseDir", alias = "base_dir")]
    pub base_dir: String,

    /// Inject the live-reload client and accept WebSocket listeners
    #[serde(rename = "liveReload", alias = "live_reload")]
    pub live_reload: bool,

    /// Port of the live-reload WebSocket
    #[serde(rename = "reloadPort", alias = "reload_port")]
    pub reload_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "localhost".to_string(),
            port: 8080,
            log_prefix: "frontend".to_string(),
            base_dir: "build".to_string(),
            live_reload: true,
            reload_port: 35729,
        }
    }
}

/// Knobs for the individual transforms
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Browserslist queries used for vendor prefixing
    pub browsers: Vec<String>,

    /// ECMAScript target of the transpiled bundle
    #[serde(rename = "scriptTarget", alias = "script_target")]
    pub script_target: String,

    /// File name of the concatenated script bundle
    pub bundle: String,

    /// JPEG re-encoding quality (1-100)
    #[serde(rename = "jpegQuality", alias = "jpeg_quality")]
    pub jpeg_quality: u8,

    /// Write `.map` files next to scripts and stylesheets
    #[serde(rename = "sourceMaps", alias = "source_maps")]
    pub source_maps: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            browsers: vec!["last 3 versions".to_string()],
            script_target: "es2015".to_string(),
            bundle: "main.js".to_string(),
            jpeg_quality: 80,
            source_maps: true,
        }
    }
}
