//! Arguments and results of projection calls.

use xproject_dom::Node;

use crate::contract::ContractId;
use crate::convert::Scalar;
use crate::error::ProjectionError;
use crate::projection::Projection;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of operations that return nothing.
    Void,
    /// Absent value, e.g. a single-node read without a match.
    Null,
    Scalar(Scalar),
    Projection(Projection),
    List(Vec<Value>),
    Array(Box<[Value]>),
    Node(Node),
    Contract(ContractId),
}

impl Value {
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Any integer scalar, widened.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Scalar(Scalar::Byte(v)) => Some(i64::from(*v)),
            Value::Scalar(Scalar::Short(v)) => Some(i64::from(*v)),
            Value::Scalar(Scalar::Int(v)) => Some(i64::from(*v)),
            Value::Scalar(Scalar::Long(v)) => Some(*v),
            _ => None,
        }
    }

    /// Any floating point scalar, widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Scalar(Scalar::Float(v)) => Some(f64::from(*v)),
            Value::Scalar(Scalar::Double(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_projection(&self) -> Option<&Projection> {
        match self {
            Value::Projection(projection) => Some(projection),
            _ => None,
        }
    }

    pub fn into_projection(self) -> Option<Projection> {
        match self {
            Value::Projection(projection) => Some(projection),
            _ => None,
        }
    }

    /// Members of a list or an array.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Text form used for placeholders, attribute values and text content.
    /// Projections serialize through their transformer.
    pub fn text(&self) -> Result<String, ProjectionError> {
        Ok(match self {
            Value::Void | Value::Null => String::new(),
            Value::Scalar(scalar) => scalar.to_string(),
            Value::Projection(projection) => projection.to_xml()?,
            Value::List(items) => list_text(items)?,
            Value::Array(items) => list_text(items)?,
            Value::Node(node) => node.to_xml()?,
            Value::Contract(id) => id.to_string(),
        })
    }
}

fn list_text(items: &[Value]) -> Result<String, ProjectionError> {
    let parts = items
        .iter()
        .map(Value::text)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("[{}]", parts.join(", ")))
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::String(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Scalar(Scalar::Int(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Scalar(Scalar::Long(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Scalar(Scalar::Double(n))
    }
}

impl From<Projection> for Value {
    fn from(projection: Projection) -> Self {
        Value::Projection(projection)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_forms() {
        assert_eq!(Value::Null.text().unwrap(), "");
        assert_eq!(Value::from(2.5).text().unwrap(), "2.5");
        assert_eq!(Value::from(vec![1, 2]).text().unwrap(), "[1, 2]");
        assert_eq!(Value::Contract(ContractId::new("Book")).text().unwrap(), "Book");
    }

    #[test]
    fn test_integer_accessors_widen() {
        assert_eq!(Value::Scalar(Scalar::Byte(-3)).as_i64(), Some(-3));
        assert_eq!(Value::Scalar(Scalar::Float(0.5)).as_f64(), Some(0.5));
        assert_eq!(Value::from("7").as_i64(), None);
    }
}
