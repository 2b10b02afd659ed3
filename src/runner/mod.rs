//! Task execution engine
//!
//! This module lowers task names into dependency graphs and runs them,
//! in parallel where the composition allows it.

pub mod context;
pub mod executor;
pub mod graph;
pub mod pipeline;
pub mod task;

// Re-export main types
pub use context::*;
pub use executor::*;
pub use graph::*;
pub use pipeline::*;
pub use task::*;
