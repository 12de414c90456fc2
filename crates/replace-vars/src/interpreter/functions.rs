//! Function registry and built-in template functions.
//!
//! Functions are looked up by name at parse time (to reject unknown names) and
//! at execution time. The registry starts with the built-ins; callers may add
//! their own with [`FunctionRegistry::register`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use super::error::ExecErrorKind;
use super::escape::{escape_html, escape_js, query_escape};
use crate::types::Value;

/// Function signature.
///
/// Receives the evaluated arguments, with any piped value last. Arity has
/// already been checked against the registered [`Arity`].
pub type FunctionFn = for<'m> fn(&[Value<'m>]) -> Result<Value<'m>, ExecErrorKind>;

/// How many arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// A registered function.
#[derive(Clone, Copy)]
pub struct Function {
    pub arity: Arity,
    pub call: FunctionFn,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Registry of template functions, keyed by name.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Function>,
}

impl FunctionRegistry {
    /// Create a registry with no functions at all.
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in functions.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("and", Arity::AtLeast(1), and);
        registry.register("or", Arity::AtLeast(1), or);
        registry.register("not", Arity::Exact(1), not);
        registry.register("eq", Arity::AtLeast(2), eq);
        registry.register("ne", Arity::Exact(2), ne);
        registry.register("lt", Arity::Exact(2), lt);
        registry.register("le", Arity::Exact(2), le);
        registry.register("gt", Arity::Exact(2), gt);
        registry.register("ge", Arity::Exact(2), ge);
        registry.register("len", Arity::Exact(1), len);
        registry.register("index", Arity::AtLeast(1), index);
        registry.register("print", Arity::AtLeast(0), print);
        registry.register("println", Arity::AtLeast(0), println);
        registry.register("printf", Arity::AtLeast(1), printf);
        registry.register("html", Arity::AtLeast(0), html);
        registry.register("js", Arity::AtLeast(0), js);
        registry.register("urlquery", Arity::AtLeast(0), urlquery);
        registry.register("raw", Arity::Exact(1), raw);
        registry.register("upper", Arity::Exact(1), upper);
        registry.register("lower", Arity::Exact(1), lower);
        registry.register("trim", Arity::Exact(1), trim);
        registry
    }

    /// Register a function, replacing any existing one with the same name.
    pub fn register(&mut self, name: impl Into<String>, arity: Arity, call: FunctionFn) {
        self.functions.insert(name.into(), Function { arity, call });
    }

    pub fn get(&self, name: &str) -> Option<Function> {
        self.functions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Look up `name`, check arity, and call it.
    pub fn call<'m>(&self, name: &str, args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
        let function = self
            .get(name)
            .ok_or_else(|| ExecErrorKind::UnknownFunction {
                name: name.to_string(),
            })?;
        if !function.arity.accepts(args.len()) {
            return Err(ExecErrorKind::ArgumentCount {
                function: name.to_string(),
                expected: function.arity.to_string(),
                got: args.len(),
            });
        }
        (function.call)(args)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Logic
// ============================================================================

// The evaluator short-circuits `and` and `or` written as commands; these run
// when they are called with values that are already evaluated.

/// First falsy argument, or the last one.
fn and<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    let pick = args
        .iter()
        .find(|v| !v.is_truthy())
        .or_else(|| args.last());
    Ok(pick.cloned().unwrap_or(Value::Missing))
}

/// First truthy argument, or the last one.
fn or<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    let pick = args.iter().find(|v| v.is_truthy()).or_else(|| args.last());
    Ok(pick.cloned().unwrap_or(Value::Missing))
}

fn not<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(Value::Bool(!args[0].is_truthy()))
}

// ============================================================================
// Comparison
// ============================================================================

/// A value reduced to something comparable. Missing values compare as "".
#[derive(Clone, Copy)]
enum Basic<'a> {
    Str(&'a str),
    Int(i64),
    Float(f64),
    Bool(bool),
    Nil,
}

impl Basic<'_> {
    fn type_name(&self) -> &'static str {
        match self {
            Basic::Str(_) => "string",
            Basic::Int(_) => "int",
            Basic::Float(_) => "float",
            Basic::Bool(_) => "bool",
            Basic::Nil => "nil",
        }
    }
}

fn basic<'a>(value: &'a Value<'_>) -> Result<Basic<'a>, ExecErrorKind> {
    match value {
        Value::String(s) | Value::Safe(s) => Ok(Basic::Str(s)),
        Value::Missing => Ok(Basic::Str("")),
        Value::Number(n) => Ok(Basic::Int(*n)),
        Value::Float(x) => Ok(Basic::Float(*x)),
        Value::Bool(b) => Ok(Basic::Bool(*b)),
        Value::Nil => Ok(Basic::Nil),
        Value::Map(_) => Err(ExecErrorKind::InvalidComparison {
            type_name: value.type_name(),
        }),
    }
}

fn equal(left: &Value<'_>, right: &Value<'_>) -> Result<bool, ExecErrorKind> {
    match (basic(left)?, basic(right)?) {
        (Basic::Str(a), Basic::Str(b)) => Ok(a == b),
        (Basic::Int(a), Basic::Int(b)) => Ok(a == b),
        (Basic::Float(a), Basic::Float(b)) => Ok(a == b),
        (Basic::Bool(a), Basic::Bool(b)) => Ok(a == b),
        (Basic::Nil, Basic::Nil) => Ok(true),
        (Basic::Nil, _) | (_, Basic::Nil) => Ok(false),
        (a, b) => Err(ExecErrorKind::IncompatibleTypes {
            left: a.type_name(),
            right: b.type_name(),
        }),
    }
}

fn compare(left: &Value<'_>, right: &Value<'_>) -> Result<Ordering, ExecErrorKind> {
    match (basic(left)?, basic(right)?) {
        (Basic::Str(a), Basic::Str(b)) => Ok(a.cmp(b)),
        (Basic::Int(a), Basic::Int(b)) => Ok(a.cmp(&b)),
        (Basic::Float(a), Basic::Float(b)) => Ok(a.total_cmp(&b)),
        (
            a @ (Basic::Str(_) | Basic::Int(_) | Basic::Float(_)),
            b @ (Basic::Str(_) | Basic::Int(_) | Basic::Float(_)),
        ) => Err(ExecErrorKind::IncompatibleTypes {
            left: a.type_name(),
            right: b.type_name(),
        }),
        (Basic::Str(_) | Basic::Int(_) | Basic::Float(_), b) => Err(ExecErrorKind::InvalidComparison {
            type_name: b.type_name(),
        }),
        (a, _) => Err(ExecErrorKind::InvalidComparison {
            type_name: a.type_name(),
        }),
    }
}

/// `eq a b c...` is true when `a` equals any of the rest.
fn eq<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    let (first, rest) = args.split_first().ok_or(ExecErrorKind::ArgumentCount {
        function: "eq".to_string(),
        expected: Arity::AtLeast(2).to_string(),
        got: 0,
    })?;
    for candidate in rest {
        if equal(first, candidate)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn ne<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(Value::Bool(!equal(&args[0], &args[1])?))
}

fn lt<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(Value::Bool(compare(&args[0], &args[1])?.is_lt()))
}

fn le<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(Value::Bool(compare(&args[0], &args[1])?.is_le()))
}

fn gt<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(Value::Bool(compare(&args[0], &args[1])?.is_gt()))
}

fn ge<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(Value::Bool(compare(&args[0], &args[1])?.is_ge()))
}

// ============================================================================
// Lookup
// ============================================================================

/// Length in bytes for strings, entries for maps.
fn len<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    let n = match &args[0] {
        Value::String(s) | Value::Safe(s) => s.len(),
        Value::Map(map) => map.len(),
        Value::Missing => 0,
        other => {
            return Err(ExecErrorKind::InvalidArgument {
                function: "len",
                message: format!("len of type {}", other.type_name()),
            });
        }
    };
    let n = i64::try_from(n).map_err(|_| ExecErrorKind::InvalidArgument {
        function: "len",
        message: "length overflows int".to_string(),
    })?;
    Ok(Value::Number(n))
}

/// `index . "key"` looks up keys that are not valid field names.
fn index<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    let (item, keys) = args.split_first().ok_or(ExecErrorKind::ArgumentCount {
        function: "index".to_string(),
        expected: Arity::AtLeast(1).to_string(),
        got: 0,
    })?;
    let mut current = item.clone();
    for key in keys {
        current = match &current {
            Value::Map(map) => {
                let key = key.as_str().ok_or_else(|| ExecErrorKind::InvalidArgument {
                    function: "index",
                    message: format!("value has type {}; should be string", key.type_name()),
                })?;
                map.get(key)
                    .map_or(Value::Missing, |v| Value::String(v.to_string()))
            }
            Value::Missing | Value::Nil => Value::Missing,
            other => {
                return Err(ExecErrorKind::InvalidArgument {
                    function: "index",
                    message: format!("can't index item of type {}", other.type_name()),
                });
            }
        };
    }
    Ok(current)
}

// ============================================================================
// Formatting
// ============================================================================

/// Concatenate, with spaces between operands when neither is a string.
fn sprint(args: &[Value<'_>]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && !arg.is_string() && !args[i - 1].is_string() {
            out.push(' ');
        }
        out.push_str(&arg.to_string());
    }
    out
}

fn print<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(Value::String(sprint(args)))
}

fn println<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    let mut out = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    out.push('\n');
    Ok(Value::String(out))
}

/// A small `printf`: `%s %v %d %q %t %%`.
fn printf<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    let (format, rest) = args.split_first().ok_or(ExecErrorKind::ArgumentCount {
        function: "printf".to_string(),
        expected: Arity::AtLeast(1).to_string(),
        got: 0,
    })?;
    let format = format.as_str().ok_or_else(|| ExecErrorKind::InvalidArgument {
        function: "printf",
        message: format!("format must be a string, got {}", format.type_name()),
    })?;

    let mut operands = rest.iter();
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let verb = chars.next().ok_or(ExecErrorKind::InvalidArgument {
            function: "printf",
            message: "format ends with %".to_string(),
        })?;
        if verb == '%' {
            out.push('%');
            continue;
        }
        let operand = operands
            .next()
            .ok_or(ExecErrorKind::MissingFormatArgument { verb })?;
        match (verb, operand) {
            ('s' | 'v', value) => out.push_str(&value.to_string()),
            ('d', Value::Number(n)) => out.push_str(&n.to_string()),
            ('t', Value::Bool(b)) => out.push_str(&b.to_string()),
            ('q', value) => out.push_str(&quote(&value.to_string())),
            ('d' | 't', value) => {
                return Err(ExecErrorKind::InvalidArgument {
                    function: "printf",
                    message: format!("%{verb} given {}", value.type_name()),
                });
            }
            (verb, _) => return Err(ExecErrorKind::UnsupportedVerb { verb }),
        }
    }

    if operands.next().is_some() {
        return Err(ExecErrorKind::InvalidArgument {
            function: "printf",
            message: "too many arguments for format".to_string(),
        });
    }
    Ok(Value::String(out))
}

/// Double-quote `text` with Go escape sequences.
///
/// Printability is approximated as "not a control character and not
/// whitespace other than the ASCII space".
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0B}' => out.push_str("\\v"),
            ' ' => out.push(' '),
            c if !c.is_control() && !c.is_whitespace() => out.push(c),
            c if c < ' ' || c == '\u{7F}' => out.push_str(&format!("\\x{:02x}", u32::from(c))),
            c if u32::from(c) < 0x10000 => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push_str(&format!("\\U{:08x}", u32::from(c))),
        }
    }
    out.push('"');
    out
}

// ============================================================================
// Escaping and text
// ============================================================================

/// Escape explicitly; the result is not escaped a second time.
fn html<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(Value::Safe(escape_html(&sprint(args))))
}

/// Escape for a JavaScript string literal. The result is still HTML-escaped
/// on output.
fn js<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(Value::String(escape_js(&sprint(args))))
}

fn urlquery<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(Value::String(query_escape(&sprint(args))))
}

/// Mark a value for verbatim insertion.
fn raw<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(Value::Safe(args[0].to_string()))
}

/// Apply a text mapping, keeping a value's raw marking.
fn map_text<'m>(value: &Value<'m>, f: impl FnOnce(&str) -> String) -> Value<'m> {
    let text = f(&value.to_string());
    if value.is_safe() {
        Value::Safe(text)
    } else {
        Value::String(text)
    }
}

fn upper<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(map_text(&args[0], str::to_uppercase))
}

fn lower<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(map_text(&args[0], str::to_lowercase))
}

fn trim<'m>(args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
    Ok(map_text(&args[0], |s| s.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VariableMap;

    fn call<'m>(name: &str, args: &[Value<'m>]) -> Result<Value<'m>, ExecErrorKind> {
        FunctionRegistry::new().call(name, args)
    }

    #[test]
    fn arity_is_checked() {
        let err = call("not", &[]).unwrap_err();
        assert_eq!(
            err,
            ExecErrorKind::ArgumentCount {
                function: "not".into(),
                expected: "1".into(),
                got: 0
            }
        );
    }

    #[test]
    fn eq_matches_any_candidate() {
        let args = [Value::from("b"), Value::from("a"), Value::from("b")];
        assert_eq!(call("eq", &args), Ok(Value::Bool(true)));
    }

    #[test]
    fn missing_compares_as_empty() {
        assert_eq!(
            call("eq", &[Value::Missing, Value::from("")]),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn mixed_comparison_fails() {
        assert_eq!(
            call("lt", &[Value::from("a"), Value::Number(1)]),
            Err(ExecErrorKind::IncompatibleTypes {
                left: "string",
                right: "int"
            })
        );
    }

    #[test]
    fn print_spaces_non_strings() {
        let args = [Value::Number(1), Value::Number(2), Value::from("x"), Value::Bool(true)];
        assert_eq!(call("print", &args), Ok(Value::String("1 2xtrue".into())));
    }

    #[test]
    fn printf_formats_verbs() {
        let args = [
            Value::from("%s has %d items (%q) 100%%"),
            Value::from("cart"),
            Value::Number(3),
            Value::from("a\"b"),
        ];
        assert_eq!(
            call("printf", &args),
            Ok(Value::String(r#"cart has 3 items ("a\"b") 100%"#.into()))
        );
    }

    #[test]
    fn printf_quotes_like_go() {
        let args = [Value::from("%q"), Value::from("tab\there\u{1b}\u{7f}\u{a0}é")];
        assert_eq!(
            call("printf", &args),
            Ok(Value::String(r#""tab\there\x1b\x7f\u00a0é""#.into()))
        );
    }

    #[test]
    fn printf_rejects_unknown_verb() {
        let args = [Value::from("%z"), Value::from("x")];
        assert_eq!(
            call("printf", &args),
            Err(ExecErrorKind::UnsupportedVerb { verb: 'z' })
        );
    }

    #[test]
    fn index_reads_map_keys() {
        let vars: VariableMap = [("my-key", "v")].into_iter().collect();
        let args = [Value::Map(&vars), Value::from("my-key")];
        assert_eq!(call("index", &args), Ok(Value::from("v")));
    }

    #[test]
    fn floats_compare_with_floats_only() {
        assert_eq!(
            call("lt", &[Value::Float(1.5), Value::Float(2.0)]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            call("eq", &[Value::Float(2.0), Value::Number(2)]),
            Err(ExecErrorKind::IncompatibleTypes {
                left: "float",
                right: "int"
            })
        );
    }

    #[test]
    fn js_escapes_quotes_and_markup() {
        let args = [Value::from(r#"it's <"a"> & b=c"#)];
        assert_eq!(
            call("js", &args),
            Ok(Value::String(r#"it\'s \u003C\"a\"\u003E \u0026 b\u003Dc"#.into()))
        );
    }

    #[test]
    fn upper_keeps_raw_marking() {
        assert_eq!(
            call("upper", &[Value::Safe("<b>".into())]),
            Ok(Value::Safe("<B>".into()))
        );
    }
}
