//! CLI command implementations.

mod render;

pub use render::{RenderArgs, USAGE, run_render};
