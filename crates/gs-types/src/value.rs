//! Concrete parameter values as they appear in a parameter space.

use serde::{Deserialize, Serialize};

use crate::format::python_float_str;

/// A single candidate value for a swept or fixed parameter.
///
/// Deserialization tries integer first so that `300` stays an integer and
/// renders as `300`, while `0.9` becomes a float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => f.write_str(&python_float_str(*v)),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_python_str() {
        assert_eq!(ParameterValue::Float(0.9).to_string(), "0.9");
        assert_eq!(ParameterValue::Float(300.0).to_string(), "300.0");
        assert_eq!(ParameterValue::Float(0.00001).to_string(), "1e-05");
        assert_eq!(ParameterValue::Int(600).to_string(), "600");
        assert_eq!(ParameterValue::from("powell").to_string(), "powell");
    }

    #[test]
    fn untagged_deserialization_prefers_integers() {
        let values: Vec<ParameterValue> = serde_json::from_str(r#"[300, 0.95, "a"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ParameterValue::Int(300),
                ParameterValue::Float(0.95),
                ParameterValue::Text("a".into()),
            ]
        );
    }
}
