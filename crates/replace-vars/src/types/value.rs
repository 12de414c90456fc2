use std::fmt;

use super::VariableMap;

/// A runtime value flowing through template pipelines.
///
/// The dot starts out as [`Value::Map`] over the loaded variables; field access
/// on it yields [`Value::String`] for present keys and [`Value::Missing`] for
/// absent ones.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'m> {
    /// The result of looking up a key that is not in the map.
    Missing,

    /// The `nil` literal.
    Nil,

    Bool(bool),

    Number(i64),

    /// A floating-point literal such as `1.5` or `1e3`.
    Float(f64),

    /// Text that is escaped when written to the output.
    String(String),

    /// Text that is written verbatim, produced by `raw` and `html`.
    Safe(String),

    /// The variable map itself.
    Map(&'m VariableMap),
}

impl<'m> Value<'m> {
    /// Truthiness as used by `if`, `with`, `and`, `or` and `not`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Missing | Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::String(s) | Value::Safe(s) => !s.is_empty(),
            Value::Map(map) => !map.is_empty(),
        }
    }

    /// Name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Missing => "missing value",
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) | Value::Safe(_) => "string",
            Value::Map(_) => "map",
        }
    }

    /// Get this value as text, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Safe(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_) | Value::Safe(_))
    }

    /// Whether the value bypasses output escaping.
    pub fn is_safe(&self) -> bool {
        matches!(self, Value::Safe(_))
    }

    /// Look up a field on this value.
    ///
    /// Maps yield the entry or [`Value::Missing`]; missing values stay missing.
    /// Any other receiver has no fields and returns `None`.
    pub fn field(&self, name: &str) -> Option<Value<'m>> {
        match self {
            Value::Map(map) => Some(
                map.get(name)
                    .map_or(Value::Missing, |v| Value::String(v.to_string())),
            ),
            Value::Missing | Value::Nil => Some(Value::Missing),
            _ => None,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing | Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) | Value::Safe(s) => f.write_str(s),
            Value::Map(map) => {
                f.write_str("map[")?;
                for (i, (key, value)) in map.sorted().into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value<'_> {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl From<f64> for Value<'_> {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value<'_> {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<'m> From<&'m VariableMap> for Value<'m> {
    fn from(map: &'m VariableMap) -> Self {
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_display_is_sorted() {
        let map: VariableMap = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(Value::Map(&map).to_string(), "map[a:1 b:2]");
    }

    #[test]
    fn truthiness() {
        let empty = VariableMap::new();
        assert!(!Value::Missing.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Number(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
        assert!(!Value::Map(&empty).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::Bool(true).is_truthy());
    }

    #[test]
    fn float_display_drops_integral_fraction() {
        assert_eq!(Value::Float(3.0).to_string(), "3");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
    }

    #[test]
    fn field_on_string_is_rejected() {
        assert_eq!(Value::from("x").field("y"), None);
        assert_eq!(Value::Missing.field("y"), Some(Value::Missing));
    }
}
