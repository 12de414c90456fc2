//! Action lexer using winnow.
//!
//! Splits a template into literal text and actions, applying `{{-`/`-}}`
//! whitespace trimming. Each action body is parsed into an [`Action`]; nesting
//! of block actions is resolved afterwards by the tree builder.

use winnow::ascii::{digit0, digit1};
use winnow::combinator::{alt, cut_err, delimited, opt, peek, preceded, repeat, separated};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{none_of, one_of, take_till, take_until, take_while};

use super::ast::{Command, Operand, Pipeline};
use super::error::ParseError;

/// Characters that count as whitespace for trim markers and inside actions.
const SPACE: [char; 4] = [' ', '\t', '\r', '\n'];

/// A lexed template item.
#[derive(Debug, PartialEq)]
pub(super) enum Item {
    Text(String),
    Action { offset: usize, action: Action },
}

/// The parsed body of a single `{{ ... }}`.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Action {
    Comment,
    Pipeline(Pipeline),
    If(Pipeline),
    ElseIf(Pipeline),
    ElseWith(Pipeline),
    Else,
    End,
    With(Pipeline),
    Range(Pipeline),
    Break,
    Continue,
    Define(String),
    Block {
        name: String,
        argument: Pipeline,
    },
    Template {
        name: String,
        argument: Option<Pipeline>,
    },
}

impl Action {
    /// The keyword introducing this action, for error messages.
    pub(super) fn keyword(&self) -> &'static str {
        match self {
            Action::Comment => "comment",
            Action::Pipeline(_) => "pipeline",
            Action::If(_) => "if",
            Action::ElseIf(_) => "else if",
            Action::ElseWith(_) => "else with",
            Action::Else => "else",
            Action::End => "end",
            Action::With(_) => "with",
            Action::Range(_) => "range",
            Action::Break => "break",
            Action::Continue => "continue",
            Action::Define(_) => "define",
            Action::Block { .. } => "block",
            Action::Template { .. } => "template",
        }
    }
}

/// Split `input` into text and actions.
pub(super) fn lex(input: &str) -> Result<Vec<Item>, ParseError> {
    let mut remaining = input;
    let mut items = Vec::new();
    let mut trim_leading = false;

    while !remaining.is_empty() {
        let text_len = remaining.find("{{").unwrap_or(remaining.len());
        let (raw_text, rest) = remaining.split_at(text_len);
        remaining = rest;

        let mut text = raw_text;
        if trim_leading {
            text = text.trim_start_matches(SPACE);
        }

        if remaining.is_empty() {
            push_text(&mut items, text);
            break;
        }

        let offset = input.len() - remaining.len();
        check_terminated(input, offset)?;
        let (trim_before, action, trim_after) = match action_tag.parse_next(&mut remaining) {
            Ok(tag) => tag,
            Err(e) => return Err(syntax_error(input, remaining, &e)),
        };

        if trim_before {
            text = text.trim_end_matches(SPACE);
        }
        push_text(&mut items, text);
        items.push(Item::Action { offset, action });
        trim_leading = trim_after;
    }

    Ok(items)
}

fn push_text(items: &mut Vec<Item>, text: &str) {
    if !text.is_empty() {
        items.push(Item::Text(text.to_string()));
    }
}

/// Reject actions and comments that run off the end of the input.
fn check_terminated(input: &str, offset: usize) -> Result<(), ParseError> {
    let rest = &input[offset + 2..];
    let body = rest.trim_start_matches('-').trim_start_matches(SPACE);
    let (closer, what) = if body.starts_with("/*") {
        ("*/", "comment")
    } else {
        ("}}", "action")
    };
    if rest.contains(closer) {
        return Ok(());
    }
    let (line, column) = calculate_position(input, offset);
    Err(ParseError::Syntax {
        line,
        column,
        message: format!("unclosed {what}"),
    })
}

fn syntax_error(input: &str, remaining: &str, err: &ErrMode<ContextError>) -> ParseError {
    let (line, column) = calculate_position(input, input.len() - remaining.len());
    let message = match err {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e.to_string().replace('\n', ", "),
        ErrMode::Incomplete(_) => String::new(),
    };
    let message = if message.is_empty() {
        "malformed action".to_string()
    } else {
        message
    };
    ParseError::Syntax {
        line,
        column,
        message,
    }
}

/// Calculate 1-based line and column for a byte offset.
pub(super) fn calculate_position(original: &str, offset: usize) -> (usize, usize) {
    let consumed_str = &original[..offset];
    let line = consumed_str.chars().filter(|&c| c == '\n').count() + 1;
    let column = match consumed_str.rfind('\n') {
        Some(pos) => consumed_str[pos + 1..].chars().count() + 1,
        None => consumed_str.chars().count() + 1,
    };
    (line, column)
}

/// Parse a whole `{{ ... }}` tag: (trim before, action, trim after).
fn action_tag(input: &mut &str) -> ModalResult<(bool, Action, bool)> {
    "{{".parse_next(input)?;
    let trim_before = opt(trim_marker).parse_next(input)?.is_some();
    ws(input)?;

    let action = if input.starts_with("/*") {
        comment(input)?
    } else {
        cut_err(action_body)
            .context(StrContext::Label("action"))
            .parse_next(input)?
    };

    ws(input)?;
    let trim_after = opt("-}}").parse_next(input)?.is_some();
    if !trim_after {
        cut_err("}}")
            .context(StrContext::Expected(StrContextValue::StringLiteral("}}")))
            .parse_next(input)?;
    }
    Ok((trim_before, action, trim_after))
}

/// A `-` trim marker, which must be followed by whitespace.
fn trim_marker(input: &mut &str) -> ModalResult<()> {
    ('-', peek(one_of(SPACE))).void().parse_next(input)
}

fn comment(input: &mut &str) -> ModalResult<Action> {
    ("/*", take_until(0.., "*/"), "*/")
        .value(Action::Comment)
        .parse_next(input)
}

/// Parse optional whitespace.
fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., SPACE).void().parse_next(input)
}

fn ws1(input: &mut &str) -> ModalResult<()> {
    take_while(1.., SPACE).void().parse_next(input)
}

/// Parse the body of an action, dispatching on a leading keyword.
fn action_body(input: &mut &str) -> ModalResult<Action> {
    let word = opt(peek(identifier)).parse_next(input)?;
    match word {
        Some("if") => preceded(("if", ws1), pipeline)
            .map(Action::If)
            .parse_next(input),
        Some("else") => {
            "else".parse_next(input)?;
            let chained = opt(preceded(
                ws1,
                alt((
                    preceded(("if", ws1), pipeline).map(Action::ElseIf),
                    preceded(("with", ws1), pipeline).map(Action::ElseWith),
                )),
            ))
            .parse_next(input)?;
            Ok(chained.unwrap_or(Action::Else))
        }
        Some("end") => "end".value(Action::End).parse_next(input),
        Some("break") => "break".value(Action::Break).parse_next(input),
        Some("continue") => "continue".value(Action::Continue).parse_next(input),
        Some("with") => preceded(("with", ws1), pipeline)
            .map(Action::With)
            .parse_next(input),
        Some("range") => preceded(("range", ws1), pipeline)
            .map(Action::Range)
            .parse_next(input),
        Some("define") => preceded(("define", ws), quoted_string)
            .map(Action::Define)
            .parse_next(input),
        Some("block") => {
            "block".parse_next(input)?;
            ws(input)?;
            let name = cut_err(quoted_string)
                .context(StrContext::Expected(StrContextValue::Description(
                    "block name",
                )))
                .parse_next(input)?;
            let argument = cut_err(preceded(ws1, pipeline))
                .context(StrContext::Expected(StrContextValue::Description(
                    "block pipeline",
                )))
                .parse_next(input)?;
            Ok(Action::Block { name, argument })
        }
        Some("template") => {
            "template".parse_next(input)?;
            ws(input)?;
            let name = cut_err(quoted_string)
                .context(StrContext::Expected(StrContextValue::Description(
                    "template name",
                )))
                .parse_next(input)?;
            let argument = opt(preceded(ws1, pipeline)).parse_next(input)?;
            Ok(Action::Template { name, argument })
        }
        _ => pipeline.map(Action::Pipeline).parse_next(input),
    }
}

/// Parse a pipeline: optional declaration, then commands joined by `|`.
pub(super) fn pipeline(input: &mut &str) -> ModalResult<Pipeline> {
    let declaration = opt(declaration).parse_next(input)?;
    let commands: Vec<Command> = separated(1.., command, (ws, '|', ws))
        .context(StrContext::Label("pipeline"))
        .parse_next(input)?;
    let (variables, assign) = declaration.unwrap_or_default();
    Ok(Pipeline {
        variables,
        assign,
        commands,
    })
}

/// `$x :=`, `$k, $v :=` or `$x =`.
fn declaration(input: &mut &str) -> ModalResult<(Vec<String>, bool)> {
    let variables: Vec<String> = separated(1..=2, variable_name, (ws, ',', ws)).parse_next(input)?;
    ws(input)?;
    let assign = alt((":=".value(false), ('=', peek(none_of(['=']))).value(true)))
        .parse_next(input)?;
    ws(input)?;
    Ok((variables, assign))
}

/// `$` or `$name`, returning the name without `$` (empty for `$`).
fn variable_name(input: &mut &str) -> ModalResult<String> {
    preceded('$', opt(identifier))
        .map(|name| name.unwrap_or_default().to_string())
        .parse_next(input)
}

/// A command: whitespace-separated operands.
fn command(input: &mut &str) -> ModalResult<Command> {
    separated(1.., operand, ws1)
        .map(|args| Command { args })
        .parse_next(input)
}

fn operand(input: &mut &str) -> ModalResult<Operand> {
    alt((
        nested,
        dot_or_field,
        variable,
        quoted_string.map(Operand::String),
        raw_string.map(Operand::String),
        char_literal,
        number,
        identifier.map(|word| match word {
            "true" => Operand::Bool(true),
            "false" => Operand::Bool(false),
            "nil" => Operand::Nil,
            name => Operand::Function(name.to_string()),
        }),
    ))
    .parse_next(input)
}

/// `(pipeline)` with an optional field chain.
fn nested(input: &mut &str) -> ModalResult<Operand> {
    let pipeline = delimited(
        ('(', ws),
        cut_err(pipeline),
        cut_err((ws, ')')).context(StrContext::Expected(StrContextValue::CharLiteral(')'))),
    )
    .parse_next(input)?;
    let fields = field_chain(input)?;
    Ok(Operand::Nested {
        pipeline: Box::new(pipeline),
        fields,
    })
}

/// `.` or `.a.b`.
fn dot_or_field(input: &mut &str) -> ModalResult<Operand> {
    let fields = field_chain(input)?;
    if fields.is_empty() {
        '.'.value(Operand::Dot).parse_next(input)
    } else {
        Ok(Operand::Field(fields))
    }
}

fn variable(input: &mut &str) -> ModalResult<Operand> {
    let name = variable_name(input)?;
    let fields = field_chain(input)?;
    Ok(Operand::Variable { name, fields })
}

fn field_chain(input: &mut &str) -> ModalResult<Vec<String>> {
    repeat(0.., preceded('.', field_name).map(str::to_string)).parse_next(input)
}

/// A field name: any run of alphanumerics and underscores.
fn field_name<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}

/// Parse an identifier.
fn identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// An integer, or a float when the literal has a fraction or exponent or
/// does not fit in an `i64`.
fn number(input: &mut &str) -> ModalResult<Operand> {
    (
        opt('-'),
        digit1,
        opt(('.', digit0)),
        opt((one_of(['e', 'E']), opt(one_of(['-', '+'])), digit1)),
    )
        .take()
        .try_map(|text: &str| {
            if !text.contains(['.', 'e', 'E']) {
                if let Ok(n) = text.parse::<i64>() {
                    return Ok(Operand::Number(n));
                }
            }
            text.parse::<f64>().map(Operand::Float)
        })
        .parse_next(input)
}

/// A character constant such as `'a'` or `'\n'`, which evaluates to its code
/// point.
fn char_literal(input: &mut &str) -> ModalResult<Operand> {
    delimited(
        '\'',
        cut_err(alt((preceded('\\', escape), none_of(['\'', '\\', '\n'])))),
        cut_err('\''),
    )
    .map(|c: char| Operand::Number(i64::from(u32::from(c))))
    .parse_next(input)
}

/// A double-quoted string with backslash escapes.
fn quoted_string(input: &mut &str) -> ModalResult<String> {
    preceded(
        '"',
        cut_err((
            repeat(0.., string_char).fold(String::new, |mut acc, c| {
                acc.push(c);
                acc
            }),
            '"',
        ))
        .context(StrContext::Label("string literal")),
    )
    .map(|(s, _)| s)
    .parse_next(input)
}

fn string_char(input: &mut &str) -> ModalResult<char> {
    alt((preceded('\\', escape), none_of(['"', '\\', '\n']))).parse_next(input)
}

fn escape(input: &mut &str) -> ModalResult<char> {
    alt((
        'n'.value('\n'),
        't'.value('\t'),
        'r'.value('\r'),
        '\\'.value('\\'),
        '"'.value('"'),
        '\''.value('\''),
        '0'.value('\0'),
        preceded('x', hex_char(2)),
        preceded('u', hex_char(4)),
    ))
    .parse_next(input)
}

/// Exactly `digits` hex digits, decoded as a Unicode scalar value.
fn hex_char<'i>(digits: usize) -> impl Parser<&'i str, char, ErrMode<ContextError>> {
    take_while(digits..=digits, |c: char| c.is_ascii_hexdigit())
        .try_map(|hex: &str| u32::from_str_radix(hex, 16))
        .verify_map(char::from_u32)
}

/// A backquoted raw string; no escapes are processed.
fn raw_string(input: &mut &str) -> ModalResult<String> {
    delimited('`', take_till(0.., '`'), cut_err('`'))
        .map(str::to_string)
        .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(input: &str) -> Vec<Action> {
        lex(input)
            .unwrap()
            .into_iter()
            .filter_map(|item| match item {
                Item::Action { action, .. } => Some(action),
                Item::Text(_) => None,
            })
            .collect()
    }

    #[test]
    fn keywords_are_recognised() {
        let kinds: Vec<&str> = actions("{{if .a}}{{else if .b}}{{else}}{{end}}{{range .}}{{end}}")
            .iter()
            .map(Action::keyword)
            .collect();
        assert_eq!(kinds, vec!["if", "else if", "else", "end", "range", "end"]);
    }

    #[test]
    fn keyword_prefix_is_a_function() {
        assert_eq!(
            actions("{{endx}}"),
            vec![Action::Pipeline(Pipeline {
                commands: vec![Command {
                    args: vec![Operand::Function("endx".into())]
                }],
                ..Pipeline::default()
            })]
        );
    }

    #[test]
    fn trim_markers_strip_surrounding_whitespace() {
        let items = lex("a  \n{{- .x -}}\n  b").unwrap();
        assert_eq!(items.first(), Some(&Item::Text("a".into())));
        assert_eq!(items.last(), Some(&Item::Text("b".into())));
    }

    #[test]
    fn dash_without_space_is_a_number() {
        assert_eq!(
            actions("{{-3}}"),
            vec![Action::Pipeline(Pipeline {
                commands: vec![Command {
                    args: vec![Operand::Number(-3)]
                }],
                ..Pipeline::default()
            })]
        );
    }

    #[test]
    fn float_and_char_literals() {
        let operands = |input: &str| match actions(input).remove(0) {
            Action::Pipeline(pipeline) => pipeline.commands[0].args.clone(),
            other => panic!("expected pipeline, got {other:?}"),
        };
        assert_eq!(operands("{{3.5}}"), vec![Operand::Float(3.5)]);
        assert_eq!(operands("{{1e3}}"), vec![Operand::Float(1000.0)]);
        assert_eq!(operands("{{'a'}}"), vec![Operand::Number(97)]);
        assert_eq!(operands(r"{{'\n'}}"), vec![Operand::Number(10)]);
        assert_eq!(
            operands("{{99999999999999999999}}"),
            vec![Operand::Float(1e20)]
        );
    }

    #[test]
    fn else_with_and_loop_control() {
        let kinds: Vec<&str> =
            actions(r#"{{else with .a}}{{break}}{{continue}}{{block "b" .}}"#)
                .iter()
                .map(Action::keyword)
                .collect();
        assert_eq!(kinds, vec!["else with", "break", "continue", "block"]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(actions("{{/* a }} b */}}"), vec![Action::Comment]);
    }

    #[test]
    fn position_counts_chars() {
        assert_eq!(calculate_position("ab\ncd", 4), (2, 2));
        assert_eq!(calculate_position("ab", 0), (1, 1));
    }
}
