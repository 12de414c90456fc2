pub mod interpreter;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod types;
pub mod vars;

pub use interpreter::{Engine, Escape, ExecError, FunctionRegistry, RenderError};
pub use output::{OutputError, WriteMode, write_output};
pub use parser::{ParseError, parse_template};
pub use pipeline::{Error, ErrorKind, Job, Paths, Summary};
pub use types::{Value, VariableMap};
pub use vars::{LoadError, LoadOptions, load_variables, parse_variables};

/// Creates a [`VariableMap`] from key-value pairs.
///
/// Keys and values are trimmed like any other insertion.
///
/// # Example
///
/// ```
/// use replace_vars::vars;
///
/// let v = vars! { "name" => "World", " padded " => " x " };
/// assert_eq!(v.len(), 2);
/// assert_eq!(v.get("name"), Some("World"));
/// assert_eq!(v.get("padded"), Some("x"));
/// ```
#[macro_export]
macro_rules! vars {
    {} => {
        $crate::VariableMap::new()
    };
    { $($key:expr => $value:expr),+ $(,)? } => {
        {
            let mut map = $crate::VariableMap::new();
            $(
                map.insert($key, $value);
            )+
            map
        }
    };
}
