//! Tagged attribute values.
//!
//! Attributes are schema-less, so readers match on the [`AttributeValue`] tag
//! and use the lenient `as_*` conversions below instead of assuming a type.
use std::fmt;

use glam::DVec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single attribute value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
    FloatArray(Vec<f64>),
    IntArray(Vec<i64>),
    /// Payload whose layout is not understood; kept verbatim.
    Opaque(Vec<u8>),
}

impl AttributeValue {
    /// Short tag name, used in logs and dumps.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Float(_) => "float",
            AttributeValue::Int(_) => "int",
            AttributeValue::Bool(_) => "bool",
            AttributeValue::String(_) => "string",
            AttributeValue::FloatArray(_) => "float[]",
            AttributeValue::IntArray(_) => "int[]",
            AttributeValue::Opaque(_) => "opaque",
        }
    }

    /// Numeric view. Strings are parsed; arrays yield their first element.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            AttributeValue::String(s) => s.trim().parse().ok(),
            AttributeValue::FloatArray(a) => a.first().copied(),
            AttributeValue::IntArray(a) => a.first().map(|v| *v as f64),
            AttributeValue::Opaque(_) => None,
        }
    }

    /// Integer view. Finite floats truncate toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Float(v) if v.is_finite() => Some(*v as i64),
            AttributeValue::Float(_) => None,
            AttributeValue::Bool(b) => Some(i64::from(*b)),
            AttributeValue::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
            }
            AttributeValue::IntArray(a) => a.first().copied(),
            AttributeValue::FloatArray(a) => a.first().filter(|v| v.is_finite()).map(|v| *v as i64),
            AttributeValue::Opaque(_) => None,
        }
    }

    /// Boolean view. Recognizes the keyword spellings used by scene files.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            AttributeValue::Int(v) => Some(*v != 0),
            AttributeValue::Float(v) => Some(*v != 0.0),
            AttributeValue::String(s) => parse_bool_keyword(s.trim()),
            AttributeValue::IntArray(a) => a.first().map(|v| *v != 0),
            AttributeValue::FloatArray(a) => a.first().map(|v| *v != 0.0),
            AttributeValue::Opaque(_) => None,
        }
    }

    /// Borrowed string, only for [`AttributeValue::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Three-component view of vector-like values.
    pub fn as_vec3(&self) -> Option<DVec3> {
        match self {
            AttributeValue::FloatArray(a) if a.len() >= 3 => Some(DVec3::new(a[0], a[1], a[2])),
            AttributeValue::IntArray(a) if a.len() >= 3 => {
                Some(DVec3::new(a[0] as f64, a[1] as f64, a[2] as f64))
            }
            AttributeValue::String(s) => {
                let mut parts = s.split_whitespace().map(|p| p.parse::<f64>());
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => Some(DVec3::new(x, y, z)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Parses `true/false/yes/no/on/off` (case-insensitive) and `1`/`0`.
pub fn parse_bool_keyword(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{v}")?;
            }
            Ok(())
        }

        match self {
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::Int(v) => write!(f, "{v}"),
            AttributeValue::Bool(v) => write!(f, "{v}"),
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::FloatArray(a) => join(f, a),
            AttributeValue::IntArray(a) => join(f, a),
            AttributeValue::Opaque(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(value: Vec<f64>) -> Self {
        AttributeValue::FloatArray(value)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(value: Vec<i64>) -> Self {
        AttributeValue::IntArray(value)
    }
}

impl From<DVec3> for AttributeValue {
    fn from(value: DVec3) -> Self {
        AttributeValue::FloatArray(value.to_array().to_vec())
    }
}

impl From<mint::Vector3<f64>> for AttributeValue {
    fn from(value: mint::Vector3<f64>) -> Self {
        AttributeValue::FloatArray(vec![value.x, value.y, value.z])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_convert_to_floats() {
        assert_eq!(AttributeValue::from("2.5").as_f64(), Some(2.5));
        assert_eq!(AttributeValue::from(" 3 ").as_i64(), Some(3));
        assert_eq!(AttributeValue::from("4.75").as_i64(), Some(4));
        assert_eq!(AttributeValue::from("abc").as_f64(), None);
    }

    #[test]
    fn bool_keywords_are_recognized() {
        assert_eq!(AttributeValue::from("on").as_bool(), Some(true));
        assert_eq!(AttributeValue::from("No").as_bool(), Some(false));
        assert_eq!(AttributeValue::Int(0).as_bool(), Some(false));
        assert_eq!(AttributeValue::from("maybe").as_bool(), None);
    }

    #[test]
    fn vec3_reads_arrays_and_strings() {
        let v = AttributeValue::FloatArray(vec![1.0, 2.0, 3.0]);
        assert_eq!(v.as_vec3(), Some(DVec3::new(1.0, 2.0, 3.0)));
        let v = AttributeValue::IntArray(vec![1, 2]);
        assert_eq!(v.as_vec3(), None);
        let v = AttributeValue::from("0.5 1 -2");
        assert_eq!(v.as_vec3(), Some(DVec3::new(0.5, 1.0, -2.0)));
    }

    #[test]
    fn opaque_payloads_never_convert() {
        let v = AttributeValue::Opaque(vec![1, 2, 3]);
        assert_eq!(v.as_f64(), None);
        assert_eq!(v.as_bool(), None);
        assert_eq!(v.to_string(), "<3 bytes>");
    }

    #[test]
    fn mint_vectors_become_float_arrays() {
        let v: AttributeValue = mint::Vector3 {
            x: 1.0,
            y: 0.0,
            z: -1.0,
        }
        .into();
        assert_eq!(v, AttributeValue::FloatArray(vec![1.0, 0.0, -1.0]));
        assert_eq!(v.to_string(), "1 0 -1");
    }
}
