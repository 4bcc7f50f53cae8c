//! Dynamic values exchanged between the codec, the path resolver
//! and the configuration objects themselves.

use std::fmt::{self, Display, Formatter};

use thiserror::Error;


/// The declared type of a configuration member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    /// A nested configuration object. Never converted, only recursed into.
    Object,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Object => "object",
        };

        f.write_str(name)
    }
}


#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConversionError {
    #[error("cannot convert {value:?} to {target}")]
    Unparsable { value: String, target: ValueKind },

    #[error("value {value} is out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("a list of {length} values cannot be converted to {target}")]
    NotScalar { length: usize, target: ValueKind },

    #[error("values cannot be converted to nested objects")]
    ObjectTarget,
}


/// A single configuration value.
///
/// `Display` produces the canonical string form that is written
/// into the backing document and the exported property tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ConfigValue>),
}

impl ConfigValue {
    /// Converts this value into the given declared kind.
    ///
    /// Text is parsed, integers widen into floats, integral floats narrow
    /// into integers, booleans map to and from `0`/`1`, and a list holding
    /// exactly one value is unwrapped first.
    pub fn convert(self, kind: ValueKind) -> Result<ConfigValue, ConversionError> {
        let value = match self {
            ConfigValue::List(mut values) if values.len() == 1 => values.remove(0),
            ConfigValue::List(values) if kind != ValueKind::Text => {
                return Err(ConversionError::NotScalar {
                    length: values.len(),
                    target: kind,
                });
            }
            other => other,
        };

        match kind {
            ValueKind::Bool => value.to_bool().map(ConfigValue::Bool),
            ValueKind::Int => value.to_int().map(ConfigValue::Int),
            ValueKind::Float => value.to_float().map(ConfigValue::Float),
            ValueKind::Text => Ok(ConfigValue::Text(value.to_string())),
            ValueKind::Object => Err(ConversionError::ObjectTarget),
        }
    }

    fn unparsable(&self, target: ValueKind) -> ConversionError {
        ConversionError::Unparsable {
            value: self.to_string(),
            target,
        }
    }

    fn to_bool(&self) -> Result<bool, ConversionError> {
        match self {
            ConfigValue::Bool(value) => Ok(*value),
            ConfigValue::Int(value) => Ok(*value != 0),
            ConfigValue::Text(text) => {
                parse_bool(text).ok_or_else(|| self.unparsable(ValueKind::Bool))
            }
            _ => Err(self.unparsable(ValueKind::Bool)),
        }
    }

    fn to_int(&self) -> Result<i64, ConversionError> {
        match self {
            ConfigValue::Int(value) => Ok(*value),
            ConfigValue::Bool(value) => Ok(i64::from(*value)),
            ConfigValue::Float(value) if value.fract() == 0.0 && value.is_finite() => {
                if *value >= i64::MIN as f64 && *value < i64::MAX as f64 {
                    Ok(*value as i64)
                } else {
                    Err(ConversionError::OutOfRange {
                        value: value.to_string(),
                        target: "i64",
                    })
                }
            }
            ConfigValue::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| self.unparsable(ValueKind::Int)),
            _ => Err(self.unparsable(ValueKind::Int)),
        }
    }

    fn to_float(&self) -> Result<f64, ConversionError> {
        match self {
            ConfigValue::Float(value) => Ok(*value),
            ConfigValue::Int(value) => Ok(*value as f64),
            ConfigValue::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| self.unparsable(ValueKind::Float)),
            _ => Err(self.unparsable(ValueKind::Float)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Parses a boolean the way the backing document spells them, ignoring case.
pub fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();

    if text.eq_ignore_ascii_case("true") || text == "1" {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Some(false)
    } else {
        None
    }
}

impl Display for ConfigValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(value) => write!(f, "{}", value),
            ConfigValue::Int(value) => write!(f, "{}", value),
            ConfigValue::Float(value) => write!(f, "{}", value),
            ConfigValue::Text(value) => f.write_str(value),
            ConfigValue::List(values) => {
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", value)?;
                }

                Ok(())
            }
        }
    }
}


impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(values: Vec<ConfigValue>) -> Self {
        ConfigValue::List(values)
    }
}

macro_rules! integer_conversions {
    ($($int:ty),*) => {
        $(
            impl From<$int> for ConfigValue {
                fn from(value: $int) -> Self {
                    ConfigValue::Int(i64::from(value))
                }
            }

            impl TryFrom<ConfigValue> for $int {
                type Error = ConversionError;

                fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
                    let wide = value.convert(ValueKind::Int)?.to_int()?;

                    <$int>::try_from(wide).map_err(|_| ConversionError::OutOfRange {
                        value: wide.to_string(),
                        target: stringify!($int),
                    })
                }
            }
        )*
    };
}

integer_conversions!(i32, i64, u32);

impl From<u64> for ConfigValue {
    fn from(value: u64) -> Self {
        // Values above i64::MAX saturate; no configuration member needs them.
        ConfigValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl TryFrom<ConfigValue> for u64 {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        let wide = value.convert(ValueKind::Int)?.to_int()?;

        u64::try_from(wide).map_err(|_| ConversionError::OutOfRange {
            value: wide.to_string(),
            target: "u64",
        })
    }
}

impl TryFrom<ConfigValue> for bool {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        value.convert(ValueKind::Bool)?.to_bool()
    }
}

impl TryFrom<ConfigValue> for f64 {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        value.convert(ValueKind::Float)?.to_float()
    }
}

impl TryFrom<ConfigValue> for String {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        Ok(value.convert(ValueKind::Text)?.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_converts_to_declared_kinds() {
        assert_eq!(
            ConfigValue::from(" 42 ").convert(ValueKind::Int),
            Ok(ConfigValue::Int(42))
        );
        assert_eq!(
            ConfigValue::from("True").convert(ValueKind::Bool),
            Ok(ConfigValue::Bool(true))
        );
        assert_eq!(
            ConfigValue::from("2.5").convert(ValueKind::Float),
            Ok(ConfigValue::Float(2.5))
        );
    }

    #[test]
    fn numeric_widening_and_narrowing() {
        assert_eq!(
            ConfigValue::Int(3).convert(ValueKind::Float),
            Ok(ConfigValue::Float(3.0))
        );
        assert_eq!(
            ConfigValue::Float(7.0).convert(ValueKind::Int),
            Ok(ConfigValue::Int(7))
        );
        assert!(ConfigValue::Float(7.5).convert(ValueKind::Int).is_err());
    }

    #[test]
    fn floats_beyond_the_integer_range_are_rejected() {
        let two_to_the_63 = 9_223_372_036_854_775_808.0_f64;

        assert!(matches!(
            ConfigValue::Float(two_to_the_63).convert(ValueKind::Int),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert_eq!(
            ConfigValue::Float(-two_to_the_63).convert(ValueKind::Int),
            Ok(ConfigValue::Int(i64::MIN))
        );
    }

    #[test]
    fn single_element_lists_are_unwrapped() {
        let list = ConfigValue::List(vec![ConfigValue::from("12")]);
        assert_eq!(list.convert(ValueKind::Int), Ok(ConfigValue::Int(12)));

        let list = ConfigValue::List(vec![ConfigValue::Int(1), ConfigValue::Int(2)]);
        assert_eq!(
            list.convert(ValueKind::Int),
            Err(ConversionError::NotScalar {
                length: 2,
                target: ValueKind::Int
            })
        );
    }

    #[test]
    fn objects_are_never_conversion_targets() {
        assert_eq!(
            ConfigValue::from("x").convert(ValueKind::Object),
            Err(ConversionError::ObjectTarget)
        );
    }

    #[test]
    fn narrow_integer_targets_check_range() {
        assert_eq!(u32::try_from(ConfigValue::Int(7)), Ok(7));
        assert!(u32::try_from(ConfigValue::Int(-1)).is_err());
        assert!(i32::try_from(ConfigValue::Int(i64::MAX)).is_err());
    }

    #[test]
    fn canonical_string_form() {
        assert_eq!(ConfigValue::Bool(false).to_string(), "false");
        assert_eq!(ConfigValue::Float(1.5).to_string(), "1.5");
        assert_eq!(
            ConfigValue::List(vec![ConfigValue::Int(1), ConfigValue::from("a")]).to_string(),
            "1,a"
        );
    }
}
