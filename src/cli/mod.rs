//! Command line front end
//!
//! Every task is exposed as a subcommand; `completions` prints a shell
//! completion script.

pub mod app;

pub use app::{build_command, run, App};
