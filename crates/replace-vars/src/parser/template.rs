//! Tree builder: turns lexed items into a nested [`Template`].
//!
//! Block actions (`if`, `with`, `range`, `define`, `block`) open a list that
//! runs until the matching `{{end}}`. Variable declarations are scoped to the
//! enclosing block, and every `$name` reference is checked against the names in
//! scope. `{{break}}` and `{{continue}}` are only accepted in a `range` body.

use std::collections::BTreeMap;
use std::mem;
use std::vec::IntoIter;

use super::ast::{Node, Operand, Pipeline, Position, Template};
use super::error::ParseError;
use super::lexer::{Action, Item, calculate_position, lex};

/// Parse a template string into an AST.
///
/// # Example
///
/// ```
/// use replace_vars::parser::{Node, parse_template};
///
/// let template = parse_template("Hello, {{.name}}!").unwrap();
/// assert_eq!(template.nodes.len(), 3);
/// assert_eq!(template.nodes[0], Node::Text("Hello, ".into()));
/// ```
pub fn parse_template(input: &str) -> Result<Template, ParseError> {
    let items = lex(input)?;
    let mut builder = TreeBuilder {
        input,
        items: items.into_iter(),
        scope: vec![String::new()],
        range_depth: 0,
        definitions: BTreeMap::new(),
    };

    let (nodes, end) = builder.parse_list(true)?;
    match end {
        ListEnd::Eof => Ok(Template {
            nodes,
            definitions: builder.definitions,
        }),
        ListEnd::End(offset)
        | ListEnd::Else(offset)
        | ListEnd::ElseIf(offset, _)
        | ListEnd::ElseWith(offset, _) => Err(builder.unexpected(offset, end.keyword())),
    }
}

/// How a node list was terminated.
enum ListEnd {
    Eof,
    End(usize),
    Else(usize),
    ElseIf(usize, Pipeline),
    ElseWith(usize, Pipeline),
}

impl ListEnd {
    fn keyword(&self) -> &'static str {
        match self {
            ListEnd::Eof => "EOF",
            ListEnd::End(_) => "end",
            ListEnd::Else(_) => "else",
            ListEnd::ElseIf(..) => "else if",
            ListEnd::ElseWith(..) => "else with",
        }
    }
}

struct TreeBuilder<'a> {
    input: &'a str,
    items: IntoIter<Item>,
    /// Variable names currently in scope; `""` is `$`.
    scope: Vec<String>,
    /// Number of `range` bodies enclosing the current list.
    range_depth: usize,
    definitions: BTreeMap<String, Vec<Node>>,
}

impl TreeBuilder<'_> {
    /// Parse nodes until EOF or a list-terminating keyword.
    fn parse_list(&mut self, top_level: bool) -> Result<(Vec<Node>, ListEnd), ParseError> {
        let mut nodes = Vec::new();
        while let Some(item) = self.items.next() {
            let (offset, action) = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Item::Action { offset, action } => (offset, action),
            };

            match action {
                Action::Comment => {}
                Action::Pipeline(pipeline) => {
                    self.declare(offset, &pipeline, false)?;
                    nodes.push(Node::Action {
                        position: self.position(offset),
                        pipeline,
                    });
                }
                Action::If(condition) => nodes.push(self.parse_if(offset, condition)?),
                Action::With(pipeline) => nodes.push(self.parse_with(offset, pipeline)?),
                Action::Range(pipeline) => nodes.push(self.parse_range(offset, pipeline)?),
                Action::Break if self.range_depth == 0 => {
                    return Err(self.unexpected(offset, "break"));
                }
                Action::Continue if self.range_depth == 0 => {
                    return Err(self.unexpected(offset, "continue"));
                }
                Action::Break => nodes.push(Node::Break),
                Action::Continue => nodes.push(Node::Continue),
                Action::Template { name, argument } => {
                    if let Some(pipeline) = &argument {
                        self.declare(offset, pipeline, false)?;
                    }
                    nodes.push(Node::Call {
                        position: self.position(offset),
                        name,
                        argument,
                    });
                }
                Action::Define(name) => {
                    if !top_level {
                        return Err(self.unexpected(offset, Action::Define(name).keyword()));
                    }
                    self.parse_define(offset, name, "define")?;
                }
                Action::Block { name, argument } => {
                    self.declare(offset, &argument, false)?;
                    self.parse_define(offset, name.clone(), "block")?;
                    nodes.push(Node::Call {
                        position: self.position(offset),
                        name,
                        argument: Some(argument),
                    });
                }
                Action::End => return Ok((nodes, ListEnd::End(offset))),
                Action::Else => return Ok((nodes, ListEnd::Else(offset))),
                Action::ElseIf(pipeline) => return Ok((nodes, ListEnd::ElseIf(offset, pipeline))),
                Action::ElseWith(pipeline) => {
                    return Ok((nodes, ListEnd::ElseWith(offset, pipeline)));
                }
            }
        }
        Ok((nodes, ListEnd::Eof))
    }

    /// Parse an `if` whose condition has already been lexed. `else if`
    /// recurses, with the innermost `if` consuming the shared `{{end}}`.
    fn parse_if(&mut self, offset: usize, condition: Pipeline) -> Result<Node, ParseError> {
        let mark = self.scope.len();
        self.declare(offset, &condition, false)?;
        let declared = self.scope.len();

        let (then, end) = self.parse_list(false)?;
        self.scope.truncate(declared);
        let otherwise = match end {
            ListEnd::End(_) => Vec::new(),
            ListEnd::Else(_) => self.parse_else(offset, "if")?,
            ListEnd::ElseIf(else_offset, chained) => vec![self.parse_if(else_offset, chained)?],
            ListEnd::ElseWith(else_offset, _) => {
                return Err(self.unexpected(else_offset, end.keyword()));
            }
            ListEnd::Eof => return Err(self.unclosed(offset, "if")),
        };
        self.scope.truncate(mark);

        Ok(Node::If {
            position: self.position(offset),
            condition,
            then,
            otherwise,
        })
    }

    /// Parse a `with`; `else with` recurses like `else if`.
    fn parse_with(&mut self, offset: usize, pipeline: Pipeline) -> Result<Node, ParseError> {
        let mark = self.scope.len();
        self.declare(offset, &pipeline, false)?;
        let declared = self.scope.len();

        let (body, end) = self.parse_list(false)?;
        self.scope.truncate(declared);
        let otherwise = match end {
            ListEnd::End(_) => Vec::new(),
            ListEnd::Else(_) => self.parse_else(offset, "with")?,
            ListEnd::ElseWith(else_offset, chained) => {
                vec![self.parse_with(else_offset, chained)?]
            }
            ListEnd::ElseIf(else_offset, _) => {
                return Err(self.unexpected(else_offset, end.keyword()));
            }
            ListEnd::Eof => return Err(self.unclosed(offset, "with")),
        };
        self.scope.truncate(mark);

        Ok(Node::With {
            position: self.position(offset),
            pipeline,
            body,
            otherwise,
        })
    }

    /// Parse a `range`. Only the body, not the `{{else}}` list, may use
    /// `{{break}}` and `{{continue}}`.
    fn parse_range(&mut self, offset: usize, pipeline: Pipeline) -> Result<Node, ParseError> {
        let mark = self.scope.len();
        self.declare(offset, &pipeline, true)?;
        let declared = self.scope.len();

        self.range_depth += 1;
        let parsed = self.parse_list(false);
        self.range_depth -= 1;
        let (body, end) = parsed?;
        self.scope.truncate(declared);
        let otherwise = match end {
            ListEnd::End(_) => Vec::new(),
            ListEnd::Else(_) => self.parse_else(offset, "range")?,
            ListEnd::ElseIf(else_offset, _) | ListEnd::ElseWith(else_offset, _) => {
                return Err(self.unexpected(else_offset, end.keyword()));
            }
            ListEnd::Eof => return Err(self.unclosed(offset, "range")),
        };
        self.scope.truncate(mark);

        Ok(Node::Range {
            position: self.position(offset),
            pipeline,
            body,
            otherwise,
        })
    }

    /// Parse an `{{else}}` list, which must end with `{{end}}`.
    fn parse_else(&mut self, offset: usize, construct: &str) -> Result<Vec<Node>, ParseError> {
        let (otherwise, end) = self.parse_list(false)?;
        match end {
            ListEnd::End(_) => Ok(otherwise),
            ListEnd::Eof => Err(self.unclosed(offset, construct)),
            ListEnd::Else(else_offset)
            | ListEnd::ElseIf(else_offset, _)
            | ListEnd::ElseWith(else_offset, _) => Err(self.unexpected(else_offset, end.keyword())),
        }
    }

    /// Parse a `{{define}}` or `{{block}}` body in a fresh variable scope,
    /// outside any `range`.
    fn parse_define(
        &mut self,
        offset: usize,
        name: String,
        construct: &str,
    ) -> Result<(), ParseError> {
        if self.definitions.contains_key(&name) {
            let (line, column) = calculate_position(self.input, offset);
            return Err(ParseError::DuplicateDefinition { line, column, name });
        }

        let outer_scope = mem::replace(&mut self.scope, vec![String::new()]);
        let outer_depth = mem::replace(&mut self.range_depth, 0);
        let parsed = self.parse_list(false);
        self.scope = outer_scope;
        self.range_depth = outer_depth;
        let (body, end) = parsed?;

        match end {
            ListEnd::End(_) => {
                self.definitions.insert(name, body);
                Ok(())
            }
            ListEnd::Eof => Err(self.unclosed(offset, construct)),
            ListEnd::Else(else_offset)
            | ListEnd::ElseIf(else_offset, _)
            | ListEnd::ElseWith(else_offset, _) => Err(self.unexpected(else_offset, end.keyword())),
        }
    }

    /// Check variable references in `pipeline`, then bring its declarations
    /// into scope.
    fn declare(
        &mut self,
        offset: usize,
        pipeline: &Pipeline,
        allow_pair: bool,
    ) -> Result<(), ParseError> {
        self.check_references(offset, pipeline)?;

        if pipeline.variables.len() > 1 && !allow_pair {
            let (line, column) = calculate_position(self.input, offset);
            return Err(ParseError::Syntax {
                line,
                column,
                message: "too many declarations in pipeline".to_string(),
            });
        }

        for name in &pipeline.variables {
            if pipeline.assign {
                self.require_variable(offset, name)?;
            } else {
                self.scope.push(name.clone());
            }
        }
        Ok(())
    }

    fn check_references(&self, offset: usize, pipeline: &Pipeline) -> Result<(), ParseError> {
        for command in &pipeline.commands {
            for operand in &command.args {
                match operand {
                    Operand::Variable { name, .. } => self.require_variable(offset, name)?,
                    Operand::Nested { pipeline, .. } => self.check_references(offset, pipeline)?,
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn require_variable(&self, offset: usize, name: &str) -> Result<(), ParseError> {
        if self.scope.iter().any(|declared| declared == name) {
            return Ok(());
        }
        let (line, column) = calculate_position(self.input, offset);
        Err(ParseError::UndefinedVariable {
            line,
            column,
            name: name.to_string(),
        })
    }

    fn position(&self, offset: usize) -> Position {
        let (line, column) = calculate_position(self.input, offset);
        Position { line, column }
    }

    fn unexpected(&self, offset: usize, keyword: &str) -> ParseError {
        let (line, column) = calculate_position(self.input, offset);
        ParseError::UnexpectedKeyword {
            line,
            column,
            keyword: keyword.to_string(),
        }
    }

    fn unclosed(&self, offset: usize, construct: &str) -> ParseError {
        let (line, column) = calculate_position(self.input, offset);
        ParseError::UnclosedBlock {
            line,
            column,
            construct: construct.to_string(),
        }
    }
}
