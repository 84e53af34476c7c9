pub mod arena;
pub mod value;

pub use arena::{ListValue, TreeValue};
pub use value::Value;

use itertools::Itertools;

use crate::domain::ParamType;

/// Absolute tolerance for double comparison, absorbing floating-point
/// accumulation differences between the sandbox and the evaluator.
pub const EPSILON: f64 = 1e-5;

/// Structural parse failure. Token-level garbage never reaches this: bad
/// numeric tokens default to zero per the permissive test-authoring rule.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    #[error("malformed literal: {0}")]
    Malformed(String),
    #[error("structure of {0} nodes exceeds the construction cap")]
    TooManyNodes(usize),
}

/// Parses a textual literal against its declared semantic type.
pub fn parse(text: &str, ty: ParamType) -> Result<Value, CodecError> {
    match ty {
        ParamType::Int => Ok(Value::Int(value::parse_int_token(text))),
        ParamType::Double => Ok(Value::Double(value::parse_double_token(text))),
        ParamType::Str => Ok(Value::Str(value::unquote(text).to_string())),
        ParamType::IntArray => {
            let elements = value::split_elements(text)?;
            Ok(Value::IntArray(
                elements.iter().map(|t| value::parse_int_token(t)).collect(),
            ))
        }
        ParamType::StrArray => {
            let elements = value::split_elements(text)?;
            Ok(Value::StrArray(
                elements.iter().map(|t| value::unquote(t).to_string()).collect(),
            ))
        }
        ParamType::LinkedListOfInt => {
            let elements = value::split_elements(text)?;
            let vals: Vec<i32> = elements.iter().map(|t| value::parse_int_token(t)).collect();
            Ok(Value::List(ListValue::from_values(&vals)?))
        }
        ParamType::BinaryTreeOfInt => {
            let elements = value::split_elements(text)?;
            let tokens: Vec<Option<i32>> = elements
                .iter()
                .map(|t| {
                    if t == "null" {
                        None
                    } else {
                        Some(value::parse_int_token(t))
                    }
                })
                .collect();
            Ok(Value::Tree(TreeValue::from_level_order(&tokens)?))
        }
    }
}

/// Renders a value back into canonical textual notation.
pub fn render(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Double(v) => value::render_double(*v),
        Value::Str(s) => s.clone(),
        Value::IntArray(v) => format!("[{}]", v.iter().join(",")),
        Value::StrArray(v) => format!("[{}]", v.iter().map(|s| format!("\"{s}\"")).join(",")),
        Value::List(list) => format!("[{}]", list.values().iter().join(",")),
        Value::Tree(tree) => value::render_level_order(&tree.to_level_order()),
    }
}
