//! Scalar types and the converter registry used for text reads.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ConversionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
}

impl ScalarType {
    pub const ALL: [ScalarType; 8] = [
        ScalarType::Bool,
        ScalarType::Byte,
        ScalarType::Short,
        ScalarType::Int,
        ScalarType::Long,
        ScalarType::Float,
        ScalarType::Double,
        ScalarType::String,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Byte => "i8",
            ScalarType::Short => "i16",
            ScalarType::Int => "i32",
            ScalarType::Long => "i64",
            ScalarType::Float => "f32",
            ScalarType::Double => "f64",
            ScalarType::String => "String",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A converted scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Scalar {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Scalar::Bool(_) => ScalarType::Bool,
            Scalar::Byte(_) => ScalarType::Byte,
            Scalar::Short(_) => ScalarType::Short,
            Scalar::Int(_) => ScalarType::Int,
            Scalar::Long(_) => ScalarType::Long,
            Scalar::Float(_) => ScalarType::Float,
            Scalar::Double(_) => ScalarType::Double,
            Scalar::String(_) => ScalarType::String,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Byte(v) => write!(f, "{v}"),
            Scalar::Short(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Long(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Double(v) => write!(f, "{v}"),
            Scalar::String(v) => f.write_str(v),
        }
    }
}

/// Parses non-empty text into a scalar.
pub type ParseFn = fn(&str) -> Result<Scalar, ConversionError>;

/// How to turn text into one scalar type.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub parse: ParseFn,
    /// Result for empty text.
    pub default: Scalar,
}

impl Conversion {
    pub fn new(parse: ParseFn, default: Scalar) -> Self {
        Self { parse, default }
    }

    pub fn convert(&self, text: &str) -> Result<Scalar, ConversionError> {
        if text.is_empty() {
            return Ok(self.default.clone());
        }
        (self.parse)(text)
    }
}

fn parse_as<T: FromStr>(target: ScalarType, input: &str) -> Result<T, ConversionError> {
    input.parse().map_err(|_| ConversionError {
        target,
        input: input.to_string(),
    })
}

/// Unlike the integer parsers, tolerates surrounding whitespace.
fn parse_float_as<T: FromStr>(target: ScalarType, input: &str) -> Result<T, ConversionError> {
    parse_as(target, input.trim()).map_err(|_| ConversionError {
        target,
        input: input.to_string(),
    })
}

/// Immutable map from scalar type to its [`Conversion`].
///
/// Only registered types are readable as scalars; reading a type that was
/// removed with [`ConverterRegistry::without`] is a configuration error.
#[derive(Debug, Clone)]
pub struct ConverterRegistry {
    entries: HashMap<ScalarType, Conversion>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ConverterRegistry {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// All eight scalar types. `bool` parses `true` (any case) as true and
    /// everything else as false; integers parse strictly; floats ignore
    /// surrounding whitespace.
    pub fn standard() -> Self {
        Self::empty()
            .with(
                ScalarType::Bool,
                Conversion::new(
                    |input| Ok(Scalar::Bool(input.eq_ignore_ascii_case("true"))),
                    Scalar::Bool(false),
                ),
            )
            .with(
                ScalarType::Byte,
                Conversion::new(
                    |input| parse_as(ScalarType::Byte, input).map(Scalar::Byte),
                    Scalar::Byte(0),
                ),
            )
            .with(
                ScalarType::Short,
                Conversion::new(
                    |input| parse_as(ScalarType::Short, input).map(Scalar::Short),
                    Scalar::Short(0),
                ),
            )
            .with(
                ScalarType::Int,
                Conversion::new(
                    |input| parse_as(ScalarType::Int, input).map(Scalar::Int),
                    Scalar::Int(0),
                ),
            )
            .with(
                ScalarType::Long,
                Conversion::new(
                    |input| parse_as(ScalarType::Long, input).map(Scalar::Long),
                    Scalar::Long(0),
                ),
            )
            .with(
                ScalarType::Float,
                Conversion::new(
                    |input| parse_float_as(ScalarType::Float, input).map(Scalar::Float),
                    Scalar::Float(0.0),
                ),
            )
            .with(
                ScalarType::Double,
                Conversion::new(
                    |input| parse_float_as(ScalarType::Double, input).map(Scalar::Double),
                    Scalar::Double(0.0),
                ),
            )
            .with(
                ScalarType::String,
                Conversion::new(
                    |input| Ok(Scalar::String(input.to_string())),
                    Scalar::String(String::new()),
                ),
            )
    }

    /// Registers (or replaces) the conversion for `ty`.
    pub fn with(mut self, ty: ScalarType, conversion: Conversion) -> Self {
        self.entries.insert(ty, conversion);
        self
    }

    pub fn without(mut self, ty: ScalarType) -> Self {
        self.entries.remove(&ty);
        self
    }

    pub fn get(&self, ty: ScalarType) -> Option<&Conversion> {
        self.entries.get(&ty)
    }

    pub fn is_registered(&self, ty: ScalarType) -> bool {
        self.entries.contains_key(&ty)
    }

    /// Converts `text`; `None` when `ty` is not registered.
    pub fn convert(&self, ty: ScalarType, text: &str) -> Option<Result<Scalar, ConversionError>> {
        self.get(ty).map(|conversion| conversion.convert(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(ty: ScalarType, text: &str) -> Result<Scalar, ConversionError> {
        ConverterRegistry::standard().convert(ty, text).unwrap()
    }

    #[test]
    fn test_empty_text_yields_default() {
        let registry = ConverterRegistry::standard();
        for ty in ScalarType::ALL {
            let value = registry.convert(ty, "").unwrap().unwrap();
            assert_eq!(value, registry.get(ty).unwrap().default);
            assert_eq!(value.scalar_type(), ty);
        }
    }

    #[test]
    fn test_bool_never_fails() {
        assert_eq!(convert(ScalarType::Bool, "TRUE"), Ok(Scalar::Bool(true)));
        assert_eq!(convert(ScalarType::Bool, "yes"), Ok(Scalar::Bool(false)));
        assert_eq!(convert(ScalarType::Bool, " true"), Ok(Scalar::Bool(false)));
    }

    #[test]
    fn test_integer_parsing_is_strict() {
        assert_eq!(convert(ScalarType::Int, "-42"), Ok(Scalar::Int(-42)));
        assert_eq!(convert(ScalarType::Byte, "127"), Ok(Scalar::Byte(127)));
        assert!(convert(ScalarType::Byte, "128").is_err());
        assert!(convert(ScalarType::Short, " 1").is_err());
        assert_eq!(
            convert(ScalarType::Long, "x"),
            Err(ConversionError {
                target: ScalarType::Long,
                input: "x".to_string()
            })
        );
    }

    #[test]
    fn test_float_parsing_trims() {
        assert_eq!(convert(ScalarType::Double, " 2.5 "), Ok(Scalar::Double(2.5)));
        assert_eq!(convert(ScalarType::Float, "1e3"), Ok(Scalar::Float(1000.0)));
        assert!(convert(ScalarType::Float, "one").is_err());
    }

    #[test]
    fn test_custom_and_removed_entries() {
        let registry = ConverterRegistry::standard()
            .with(
                ScalarType::Int,
                Conversion::new(|input| Ok(Scalar::Int(input.len() as i32)), Scalar::Int(-1)),
            )
            .without(ScalarType::Short);
        assert_eq!(
            registry.convert(ScalarType::Int, "abc").unwrap(),
            Ok(Scalar::Int(3))
        );
        assert_eq!(registry.convert(ScalarType::Int, "").unwrap(), Ok(Scalar::Int(-1)));
        assert!(registry.convert(ScalarType::Short, "1").is_none());
        assert!(!registry.is_registered(ScalarType::Short));
    }
}
