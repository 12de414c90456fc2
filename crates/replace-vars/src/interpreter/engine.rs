//! User-facing template engine.

use bon::Builder;
use thiserror::Error;
use tracing::debug;

use crate::interpreter::error::compute_suggestions;
use crate::interpreter::escape::Escape;
use crate::interpreter::evaluator::render;
use crate::interpreter::{ExecError, FunctionRegistry};
use crate::parser::{ParseError, Template, parse_template};
use crate::types::VariableMap;

/// Default limit on nested `{{template}}` calls.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Parses and renders templates with a fixed function set and escape mode.
///
/// # Example
///
/// ```
/// use replace_vars::{Engine, Escape, vars};
///
/// let engine = Engine::new();
/// let vars = vars! { "title" => "A & B <c>" };
/// assert_eq!(
///     engine.render_str("# {{.title}}", &vars).unwrap(),
///     "# A &amp; B &lt;c&gt;"
/// );
///
/// let verbatim = Engine::builder().escape(Escape::None).build();
/// assert_eq!(verbatim.render_str("# {{.title}}", &vars).unwrap(), "# A & B <c>");
/// ```
#[derive(Debug, Builder)]
pub struct Engine {
    /// Escaping applied to printed values.
    #[builder(default)]
    escape: Escape,

    /// Maximum nesting of `{{template}}` calls.
    #[builder(default = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Functions callable from templates.
    #[builder(default)]
    functions: FunctionRegistry,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::builder().build()
    }
}

/// Either stage of [`Engine::render_str`] failing.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl Engine {
    /// Create an engine with HTML escaping and the built-in functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable access for registering extra functions.
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    /// Parse a template and check that every function it calls exists.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UndefinedFunction`] (with spelling suggestions)
    /// for unknown function names, and any syntax error from
    /// [`parse_template`].
    pub fn parse(&self, source: &str) -> Result<Template, ParseError> {
        let template = parse_template(source)?;
        for (position, name) in template.functions() {
            if !self.functions.contains(name) {
                return Err(ParseError::UndefinedFunction {
                    line: position.line,
                    column: position.column,
                    name: name.to_string(),
                    suggestions: compute_suggestions(name, &self.functions.names()),
                });
            }
        }
        debug!(
            nodes = template.nodes.len(),
            definitions = template.definitions.len(),
            "parsed template"
        );
        Ok(template)
    }

    /// Render a parsed template against `vars`.
    ///
    /// The output is built fully in memory; on error nothing is returned.
    pub fn render(&self, template: &Template, vars: &VariableMap) -> Result<String, ExecError> {
        let output = render(template, &self.functions, self.escape, self.max_depth, vars)?;
        debug!(bytes = output.len(), "rendered template");
        Ok(output)
    }

    /// Parse and render in one step.
    pub fn render_str(&self, source: &str, vars: &VariableMap) -> Result<String, RenderError> {
        let template = self.parse(source)?;
        Ok(self.render(&template, vars)?)
    }
}
