//! Project configuration
//!
//! `sprocket.yml` describes where each asset category is read from, watched
//! and written to, plus the grid, dev server and transform settings.
//! Every section is optional.

pub mod parse;
pub mod schema;
pub mod types;

pub use parse::*;
pub use schema::*;
pub use types::*;
