//! Sprocket - a front-end asset pipeline
//!
//! Sprocket expands HTML includes, compiles Sass, bundles and minifies
//! scripts, optimizes images, fingerprints CSS/JS for cache busting and
//! serves the result with live reload, all from one `sprocket.yml`.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;
pub mod server;
pub mod tasks;
pub mod ui;
pub mod watch;

// Re-export commonly used types
pub use error::{Result, SprocketError};

/// Current version of Sprocket
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
