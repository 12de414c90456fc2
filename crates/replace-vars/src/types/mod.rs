//! Core types shared by the loader and the template interpreter.

mod value;
mod variable_map;

pub use value::Value;
pub use variable_map::VariableMap;
