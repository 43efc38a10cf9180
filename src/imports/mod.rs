//! Import graph discovery.
//!
//! This module turns a project into its set of external dependencies:
//!
//! - **Parsing**: extract import declarations from source files
//! - **Roots**: hosting-convention rules for fetchable repository prefixes
//! - **Walking**: transitive breadth-first expansion and partitioning

mod parse;
mod roots;
mod walker;

pub use parse::ImportParser;
pub use roots::{import_root, is_standard};
pub use walker::{ImportSet, Walker};
