//! Public AST types for parsed templates.

use std::collections::BTreeMap;
use std::fmt;

/// A 1-based line and column in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A parsed template: the main body plus named `{{define}}` blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub nodes: Vec<Node>,
    pub definitions: BTreeMap<String, Vec<Node>>,
}

/// A node in the template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, copied to the output unescaped.
    Text(String),

    /// `{{pipeline}}`: evaluates and prints unless it declares variables.
    Action {
        position: Position,
        pipeline: Pipeline,
    },

    /// `{{if}}`; `{{else if}}` chains nest in `otherwise`.
    If {
        position: Position,
        condition: Pipeline,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },

    /// `{{with}}`: rebinds dot to the pipeline value when it is truthy;
    /// `{{else with}}` chains nest in `otherwise`.
    With {
        position: Position,
        pipeline: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },

    /// `{{range}}`: runs the body once per element.
    Range {
        position: Position,
        pipeline: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },

    /// `{{break}}` inside a `range` body.
    Break,

    /// `{{continue}}` inside a `range` body.
    Continue,

    /// `{{template "name" pipeline}}`, also produced by `{{block}}`.
    Call {
        position: Position,
        name: String,
        argument: Option<Pipeline>,
    },
}

/// A chain of commands separated by `|`, optionally declaring variables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    /// Variable names (without `$`) on the left of `:=` or `=`.
    pub variables: Vec<String>,
    /// `true` for `$x = ...`, `false` for `$x := ...`.
    pub assign: bool,
    pub commands: Vec<Command>,
}

/// A single pipeline stage: an operand optionally followed by arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Operand>,
}

/// An operand within a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `.`
    Dot,
    /// `.a.b`
    Field(Vec<String>),
    /// `$`, `$x`, `$x.a`
    Variable { name: String, fields: Vec<String> },
    /// A function name such as `printf`.
    Function(String),
    /// `(pipeline).a`
    Nested {
        pipeline: Box<Pipeline>,
        fields: Vec<String>,
    },
    String(String),
    /// An integer or character constant.
    Number(i64),
    Float(f64),
    Bool(bool),
    Nil,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Dot => f.write_str("."),
            Operand::Field(fields) => write_fields(f, fields),
            Operand::Variable { name, fields } => {
                write!(f, "${name}")?;
                write_fields(f, fields)
            }
            Operand::Function(name) => f.write_str(name),
            Operand::Nested { fields, .. } => {
                f.write_str("(...)")?;
                write_fields(f, fields)
            }
            Operand::String(s) => write!(f, "{s:?}"),
            Operand::Number(n) => write!(f, "{n}"),
            Operand::Float(x) => write!(f, "{x}"),
            Operand::Bool(b) => write!(f, "{b}"),
            Operand::Nil => f.write_str("nil"),
        }
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[String]) -> fmt::Result {
    for field in fields {
        write!(f, ".{field}")?;
    }
    Ok(())
}

impl Template {
    /// Visit every function name used anywhere in the template, with the
    /// position of the action it appears in.
    pub fn functions(&self) -> Vec<(Position, &str)> {
        let mut found = Vec::new();
        collect_nodes(&self.nodes, &mut found);
        for nodes in self.definitions.values() {
            collect_nodes(nodes, &mut found);
        }
        found
    }
}

fn collect_nodes<'t>(nodes: &'t [Node], found: &mut Vec<(Position, &'t str)>) {
    for node in nodes {
        match node {
            Node::Text(_) | Node::Break | Node::Continue => {}
            Node::Action { position, pipeline } => collect_pipeline(*position, pipeline, found),
            Node::If {
                position,
                condition: pipeline,
                then: body,
                otherwise,
            }
            | Node::With {
                position,
                pipeline,
                body,
                otherwise,
            }
            | Node::Range {
                position,
                pipeline,
                body,
                otherwise,
            } => {
                collect_pipeline(*position, pipeline, found);
                collect_nodes(body, found);
                collect_nodes(otherwise, found);
            }
            Node::Call {
                position, argument, ..
            } => {
                if let Some(pipeline) = argument {
                    collect_pipeline(*position, pipeline, found);
                }
            }
        }
    }
}

fn collect_pipeline<'t>(
    position: Position,
    pipeline: &'t Pipeline,
    found: &mut Vec<(Position, &'t str)>,
) {
    for command in &pipeline.commands {
        for operand in &command.args {
            match operand {
                Operand::Function(name) => found.push((position, name.as_str())),
                Operand::Nested { pipeline, .. } => collect_pipeline(position, pipeline, found),
                _ => {}
            }
        }
    }
}
