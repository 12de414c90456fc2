//! Variables loader.
//!
//! Reads `KEY=VALUE` files into a [`VariableMap`](crate::VariableMap). Blank
//! lines and lines without `=` are skipped; everything else splits at the
//! first `=` with both halves trimmed.

mod error;
mod loader;

pub use error::{LoadError, ReadError};
pub use loader::{LoadOptions, load_variables, parse_variables};
