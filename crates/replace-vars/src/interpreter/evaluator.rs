//! Template evaluation.
//!
//! Walks the parsed node tree, evaluating pipelines against the current dot
//! and writing text to an in-memory buffer. Values printed by actions are
//! escaped according to the engine's [`Escape`] mode unless marked raw.

use crate::interpreter::escape::{Escape, escape_html};
use crate::interpreter::{Arity, EvalContext, ExecError, ExecErrorKind, FunctionRegistry};
use crate::parser::ast::{Command, Node, Operand, Pipeline, Position, Template};
use crate::types::{Value, VariableMap};

/// Render `template` with the variable map as the initial dot.
///
/// # Errors
///
/// Returns an error if any action fails: field access on a non-map value,
/// arguments passed to a non-function, a function error, `range` over a
/// value that is not iterable, an undefined `{{template}}`, or template calls
/// nested deeper than `max_depth`.
pub(crate) fn render(
    template: &Template,
    functions: &FunctionRegistry,
    escape: Escape,
    max_depth: usize,
    vars: &VariableMap,
) -> Result<String, ExecError> {
    let root = Value::Map(vars);
    let mut evaluator = Evaluator {
        template,
        functions,
        escape,
        ctx: EvalContext::new(root.clone(), max_depth),
    };
    let mut output = String::new();
    evaluator.walk(&template.nodes, &root, &mut output)?;
    Ok(output)
}

struct Evaluator<'e, 'm> {
    template: &'e Template,
    functions: &'e FunctionRegistry,
    escape: Escape,
    ctx: EvalContext<'m>,
}

/// How a list of nodes finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

impl<'e, 'm> Evaluator<'e, 'm> {
    /// Walk `nodes`, stopping early at `{{break}}` or `{{continue}}` so the
    /// enclosing `range` can act on it.
    fn walk(
        &mut self,
        nodes: &'e [Node],
        dot: &Value<'m>,
        output: &mut String,
    ) -> Result<Flow, ExecError> {
        for node in nodes {
            let flow = match node {
                Node::Text(text) => {
                    output.push_str(text);
                    Flow::Normal
                }
                Node::Action { position, pipeline } => {
                    let value = self.pipeline(pipeline, dot).map_err(at(*position))?;
                    if pipeline.variables.is_empty() {
                        self.write_value(&value, output);
                    }
                    Flow::Normal
                }
                Node::If {
                    position,
                    condition,
                    then,
                    otherwise,
                } => {
                    let mark = self.ctx.mark();
                    let value = self.pipeline(condition, dot).map_err(at(*position))?;
                    let branch = if value.is_truthy() { then } else { otherwise };
                    let result = self.walk(branch, dot, output);
                    self.ctx.restore(mark);
                    result?
                }
                Node::With {
                    position,
                    pipeline,
                    body,
                    otherwise,
                } => {
                    let mark = self.ctx.mark();
                    let value = self.pipeline(pipeline, dot).map_err(at(*position))?;
                    let result = if value.is_truthy() {
                        self.walk(body, &value, output)
                    } else {
                        self.walk(otherwise, dot, output)
                    };
                    self.ctx.restore(mark);
                    result?
                }
                Node::Range {
                    position,
                    pipeline,
                    body,
                    otherwise,
                } => {
                    let mark = self.ctx.mark();
                    let result = self.range(*position, pipeline, body, otherwise, dot, output);
                    self.ctx.restore(mark);
                    result?
                }
                Node::Break => Flow::Break,
                Node::Continue => Flow::Continue,
                Node::Call {
                    position,
                    name,
                    argument,
                } => {
                    self.call_template(*position, name, argument.as_ref(), dot, output)?;
                    Flow::Normal
                }
            };
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    /// Iterate a map in key order or an integer `n` over `0..n`, one element
    /// at a time.
    fn range(
        &mut self,
        position: Position,
        pipeline: &Pipeline,
        body: &'e [Node],
        otherwise: &'e [Node],
        dot: &Value<'m>,
        output: &mut String,
    ) -> Result<Flow, ExecError> {
        let value = self.commands(pipeline, dot).map_err(at(position))?;
        let variables = pipeline.variables.as_slice();
        match value {
            Value::Map(map) if !map.is_empty() => {
                for (key, element) in map.sorted() {
                    let flow =
                        self.iteration(variables, body, Value::from(key), Value::from(element), output)?;
                    if flow == Flow::Break {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Value::Number(n) if n > 0 => {
                for i in 0..n {
                    let flow =
                        self.iteration(variables, body, Value::Number(i), Value::Number(i), output)?;
                    if flow == Flow::Break {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Value::Map(_) | Value::Number(_) | Value::Missing | Value::Nil => {
                self.walk(otherwise, dot, output)
            }
            other => Err(ExecError::at(
                position,
                ExecErrorKind::CannotIterate {
                    type_name: other.type_name(),
                },
            )),
        }
    }

    /// Run one `range` iteration with its loop variables bound.
    fn iteration(
        &mut self,
        variables: &[String],
        body: &'e [Node],
        key: Value<'m>,
        element: Value<'m>,
        output: &mut String,
    ) -> Result<Flow, ExecError> {
        let mark = self.ctx.mark();
        match variables {
            [value_var] => self.ctx.declare(value_var, element.clone()),
            [key_var, value_var] => {
                self.ctx.declare(key_var, key);
                self.ctx.declare(value_var, element.clone());
            }
            _ => {}
        }
        let result = self.walk(body, &element, output);
        self.ctx.restore(mark);
        result
    }

    fn call_template(
        &mut self,
        position: Position,
        name: &str,
        argument: Option<&Pipeline>,
        dot: &Value<'m>,
        output: &mut String,
    ) -> Result<(), ExecError> {
        let template = self.template;
        let body = template.definitions.get(name).ok_or_else(|| {
            ExecError::at(
                position,
                ExecErrorKind::NoSuchTemplate {
                    name: name.to_string(),
                },
            )
        })?;

        let new_dot = match argument {
            Some(pipeline) => self.pipeline(pipeline, dot).map_err(at(position))?,
            None => Value::Nil,
        };

        let saved = self
            .ctx
            .enter_template(new_dot.clone())
            .map_err(at(position))?;
        let result = self.walk(body, &new_dot, output);
        self.ctx.leave_template(saved);
        result?;
        Ok(())
    }

    fn write_value(&self, value: &Value<'m>, output: &mut String) {
        let text = value.to_string();
        if value.is_safe() || self.escape == Escape::None {
            output.push_str(&text);
        } else {
            output.push_str(&escape_html(&text));
        }
    }

    /// Evaluate a pipeline and bind its declared variables.
    fn pipeline(&mut self, pipeline: &Pipeline, dot: &Value<'m>) -> Result<Value<'m>, ExecErrorKind> {
        let value = self.commands(pipeline, dot)?;
        for name in &pipeline.variables {
            if pipeline.assign {
                self.ctx.assign(name, value.clone())?;
            } else {
                self.ctx.declare(name, value.clone());
            }
        }
        Ok(value)
    }

    /// Evaluate the commands of a pipeline, feeding each result into the next.
    fn commands(&mut self, pipeline: &Pipeline, dot: &Value<'m>) -> Result<Value<'m>, ExecErrorKind> {
        let mut piped = None;
        for command in &pipeline.commands {
            piped = Some(self.command(command, dot, piped)?);
        }
        Ok(piped.unwrap_or(Value::Missing))
    }

    fn command(
        &mut self,
        command: &Command,
        dot: &Value<'m>,
        piped: Option<Value<'m>>,
    ) -> Result<Value<'m>, ExecErrorKind> {
        let Some((first, rest)) = command.args.split_first() else {
            return Ok(Value::Missing);
        };

        if let Operand::Function(name) = first {
            if name == "and" || name == "or" {
                return self.logic(name, rest, dot, piped);
            }
            let mut args = rest
                .iter()
                .map(|operand| self.operand(operand, dot))
                .collect::<Result<Vec<_>, _>>()?;
            args.extend(piped);
            return self.functions.call(name, &args);
        }

        if !rest.is_empty() || piped.is_some() {
            return Err(ExecErrorKind::NotAFunction {
                operand: first.to_string(),
            });
        }
        self.operand(first, dot)
    }

    /// `and` and `or` evaluate their operands left to right and stop at the
    /// first one that decides the result. A piped value comes last.
    fn logic(
        &mut self,
        name: &str,
        operands: &[Operand],
        dot: &Value<'m>,
        piped: Option<Value<'m>>,
    ) -> Result<Value<'m>, ExecErrorKind> {
        if operands.is_empty() && piped.is_none() {
            return Err(ExecErrorKind::ArgumentCount {
                function: name.to_string(),
                expected: Arity::AtLeast(1).to_string(),
                got: 0,
            });
        }
        let stop_on_truthy = name == "or";
        let mut last = Value::Missing;
        for operand in operands {
            last = self.operand(operand, dot)?;
            if last.is_truthy() == stop_on_truthy {
                return Ok(last);
            }
        }
        Ok(piped.unwrap_or(last))
    }

    fn operand(&mut self, operand: &Operand, dot: &Value<'m>) -> Result<Value<'m>, ExecErrorKind> {
        match operand {
            Operand::Dot => Ok(dot.clone()),
            Operand::Field(fields) => resolve_fields(dot.clone(), fields),
            Operand::Variable { name, fields } => resolve_fields(self.ctx.get(name)?, fields),
            Operand::Function(name) => self.functions.call(name, &[]),
            Operand::Nested { pipeline, fields } => {
                let value = self.pipeline(pipeline, dot)?;
                resolve_fields(value, fields)
            }
            Operand::String(s) => Ok(Value::String(s.clone())),
            Operand::Number(n) => Ok(Value::Number(*n)),
            Operand::Float(x) => Ok(Value::Float(*x)),
            Operand::Bool(b) => Ok(Value::Bool(*b)),
            Operand::Nil => Ok(Value::Nil),
        }
    }
}

/// Follow a `.a.b` chain from `value`.
fn resolve_fields<'m>(mut value: Value<'m>, fields: &[String]) -> Result<Value<'m>, ExecErrorKind> {
    for field in fields {
        value = value
            .field(field)
            .ok_or_else(|| ExecErrorKind::CannotEvaluateField {
                field: field.clone(),
                type_name: value.type_name(),
            })?;
    }
    Ok(value)
}

/// Attach an action's position to an error kind.
fn at(position: Position) -> impl Fn(ExecErrorKind) -> ExecError {
    move |kind| ExecError::at(position, kind)
}
