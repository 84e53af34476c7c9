use itertools::Itertools;

use crate::codec::arena::{ListValue, TreeValue};
use crate::codec::{CodecError, EPSILON};
use crate::constants::MAX_NODES;
use crate::domain::ParamType;

/// A typed value reconstructed from (or rendered to) the bracketed textual
/// notation. Owns its entire structure; created per codec invocation and
/// discarded after comparison or printing.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i32),
    IntArray(Vec<i32>),
    Str(String),
    StrArray(Vec<String>),
    Double(f64),
    List(ListValue),
    Tree(TreeValue),
}

impl Value {
    /// The value a malformed literal of the given type collapses to.
    pub fn empty(ty: ParamType) -> Self {
        match ty {
            ParamType::Int => Value::Int(0),
            ParamType::IntArray => Value::IntArray(Vec::new()),
            ParamType::Str => Value::Str(String::new()),
            ParamType::StrArray => Value::StrArray(Vec::new()),
            ParamType::Double => Value::Double(0.0),
            ParamType::LinkedListOfInt => Value::List(ListValue::empty()),
            ParamType::BinaryTreeOfInt => Value::Tree(TreeValue::empty()),
        }
    }

    /// Type-aware equality: scalars exact, doubles within an absolute
    /// epsilon, aggregates structural and order-sensitive.
    pub fn approx_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => (a - b).abs() <= EPSILON,
            (Value::IntArray(a), Value::IntArray(b)) => a == b,
            (Value::StrArray(a), Value::StrArray(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.values() == b.values(),
            (Value::Tree(a), Value::Tree(b)) => a.to_level_order() == b.to_level_order(),
            _ => false,
        }
    }
}

/// Non-numeric and out-of-range tokens resolve to 0 rather than failing.
/// Existing expected outputs depend on this defaulting.
pub(crate) fn parse_int_token(token: &str) -> i32 {
    token.trim().parse().unwrap_or(0)
}

pub(crate) fn parse_double_token(token: &str) -> f64 {
    token.trim().parse().unwrap_or(0.0)
}

pub(crate) fn unquote(token: &str) -> &str {
    let t = token.trim();
    if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') {
        &t[1..t.len() - 1]
    } else {
        t
    }
}

/// Splits `[a,b,c]` into trimmed element tokens. `[]`, `null` and the empty
/// string all mean "no elements"; anything else that is not bracketed is
/// structurally malformed. Commas inside double quotes do not split.
pub(crate) fn split_elements(text: &str) -> Result<Vec<String>, CodecError> {
    let t = text.trim();
    if t.is_empty() || t == "null" || t == "[]" {
        return Ok(Vec::new());
    }
    if !(t.starts_with('[') && t.ends_with(']')) {
        return Err(CodecError::Malformed(text.to_string()));
    }

    let body = &t[1..t.len() - 1];
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in body.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => {
                out.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    out.push(current.trim().to_string());

    if out.len() > MAX_NODES {
        return Err(CodecError::TooManyNodes(out.len()));
    }
    Ok(out)
}

pub(crate) fn render_double(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

pub(crate) fn render_level_order(tokens: &[Option<i32>]) -> String {
    format!(
        "[{}]",
        tokens
            .iter()
            .map(|t| match t {
                Some(v) => v.to_string(),
                None => "null".to_string(),
            })
            .join(",")
    )
}
