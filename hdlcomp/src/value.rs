// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Typed signal values and conversion from / to the bit strings found in simulator dumps.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Integers are assumed to be 32-bit wide, like the VHDL `integer` type in most simulators.
const DEFAULT_INTEGER_WIDTH: u32 = 32;
/// Largest width that still fits into our `i64` value representation.
const MAX_WIDTH: u32 = 63;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValueConversionError {
    #[error("unsupported type `{0}`, supported are: boolean, std_logic, integer, unsigned, signed, std_logic_vector")]
    UnsupportedType(String),
    #[error("failed to decode `{value}` as {tpe}")]
    Malformed { value: String, tpe: ValueType },
    #[error("{value} does not fit into {width} bits of {tpe}")]
    OutOfRange {
        value: Value,
        width: u32,
        tpe: ValueType,
    },
    #[error("a {width} bit wide {tpe} cannot be represented")]
    UnsupportedWidth { width: u32, tpe: ValueType },
    #[error("cannot convert {value} to {tpe}")]
    Incompatible { value: Value, tpe: ValueType },
}

/// The value of a signal at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Bool(bool),
    /// Bit vectors are stored as their integer interpretation; see [`ValueType`].
    Int(i64),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Bool(_) => None,
            Value::Int(i) => Some(*i),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

/// VHDL types that a bit string from the simulator can be interpreted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    Boolean,
    StdLogic,
    Integer,
    Unsigned,
    Signed,
    /// Raw bit vector, decoded as unsigned.
    StdLogicVector,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::StdLogic => "std_logic",
            ValueType::Integer => "integer",
            ValueType::Unsigned => "unsigned",
            ValueType::Signed => "signed",
            ValueType::StdLogicVector => "std_logic_vector",
        }
    }

    /// Single bit types that are represented as [`Value::Bool`].
    pub fn is_boolean(&self) -> bool {
        matches!(self, ValueType::Boolean | ValueType::StdLogic)
    }

    /// Decodes a bit string (MSB first) as printed by the simulator.
    pub fn decode(&self, bits: &str) -> Result<Value, ValueConversionError> {
        let bits = bits.trim();
        let malformed = || ValueConversionError::Malformed {
            value: bits.to_string(),
            tpe: *self,
        };
        match self {
            ValueType::Boolean | ValueType::StdLogic => match bits.to_ascii_lowercase().as_str() {
                "0" | "false" => Ok(Value::Bool(false)),
                "1" | "true" => Ok(Value::Bool(true)),
                _ => Err(malformed()),
            },
            ValueType::Integer if bits.len() as u32 == DEFAULT_INTEGER_WIDTH => {
                // a full width integer is in two's complement
                let raw = parse_bits(bits).ok_or_else(malformed)?;
                Ok(Value::Int(sign_extend(raw, DEFAULT_INTEGER_WIDTH)))
            }
            ValueType::Integer | ValueType::Unsigned | ValueType::StdLogicVector => {
                let raw = parse_bits(bits).ok_or_else(malformed)?;
                if bits.len() as u32 > MAX_WIDTH && raw > i64::MAX as u64 {
                    return Err(ValueConversionError::UnsupportedWidth {
                        width: bits.len() as u32,
                        tpe: *self,
                    });
                }
                Ok(Value::Int(raw as i64))
            }
            ValueType::Signed => {
                let raw = parse_bits(bits).ok_or_else(malformed)?;
                Ok(Value::Int(sign_extend(raw, bits.len() as u32)))
            }
        }
    }

    /// Encodes a value as a bit string of `width` bits (MSB first).
    /// Single bit types ignore the width, integers default to 32 bits.
    pub fn encode(&self, value: Value, width: Option<u32>) -> Result<String, ValueConversionError> {
        let incompatible = || ValueConversionError::Incompatible { value, tpe: *self };
        if self.is_boolean() {
            let bit = match value {
                Value::Bool(b) => b,
                Value::Int(0) => false,
                Value::Int(1) => true,
                Value::Int(_) => return Err(incompatible()),
            };
            return Ok(if bit { "1" } else { "0" }.to_string());
        }

        let int = value.as_int().ok_or_else(incompatible)?;
        let width = match (self, width) {
            (_, Some(w)) => w,
            (ValueType::Integer, None) => DEFAULT_INTEGER_WIDTH,
            (_, None) => return Err(ValueConversionError::UnsupportedWidth { width: 0, tpe: *self }),
        };
        if width == 0 || width > MAX_WIDTH {
            return Err(ValueConversionError::UnsupportedWidth { width, tpe: *self });
        }
        let max_unsigned = 1i64 << width;
        let half = 1i64 << (width - 1);
        let in_range = match self {
            ValueType::Unsigned => (0..max_unsigned).contains(&int),
            ValueType::Signed | ValueType::Integer => (-half..half).contains(&int),
            // raw vectors accept both interpretations
            _ => (-half..max_unsigned).contains(&int),
        };
        if !in_range {
            return Err(ValueConversionError::OutOfRange {
                value,
                width,
                tpe: *self,
            });
        }
        let mut out = String::with_capacity(width as usize);
        for ii in (0..width).rev() {
            out.push(if (int >> ii) & 1 == 1 { '1' } else { '0' });
        }
        Ok(out)
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ValueType {
    type Err = ValueConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" => Ok(ValueType::Boolean),
            "std_logic" | "std_ulogic" => Ok(ValueType::StdLogic),
            "integer" => Ok(ValueType::Integer),
            "unsigned" => Ok(ValueType::Unsigned),
            "signed" => Ok(ValueType::Signed),
            "std_logic_vector" | "std_ulogic_vector" => Ok(ValueType::StdLogicVector),
            _ => Err(ValueConversionError::UnsupportedType(s.to_string())),
        }
    }
}

/// Returns `None` for empty strings, non-binary digits and more than 64 bits.
#[inline]
fn parse_bits(bits: &str) -> Option<u64> {
    if bits.is_empty() || bits.len() > 64 {
        return None;
    }
    let mut out = 0u64;
    for c in bits.bytes() {
        out = (out << 1)
            | match c {
                b'0' => 0,
                b'1' => 1,
                _ => return None,
            };
    }
    Some(out)
}

#[inline]
fn sign_extend(raw: u64, width: u32) -> i64 {
    let shift = 64 - width;
    ((raw << shift) as i64) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        for tpe in [
            ValueType::Boolean,
            ValueType::StdLogic,
            ValueType::Integer,
            ValueType::Unsigned,
            ValueType::Signed,
            ValueType::StdLogicVector,
        ] {
            assert_eq!(tpe.name().parse::<ValueType>().unwrap(), tpe);
        }
        assert_eq!("STD_LOGIC".parse::<ValueType>().unwrap(), ValueType::StdLogic);
        assert_eq!(
            "real".parse::<ValueType>(),
            Err(ValueConversionError::UnsupportedType("real".to_string()))
        );
    }

    #[test]
    fn test_decode_boolean() {
        assert_eq!(ValueType::Boolean.decode("FALSE").unwrap(), Value::Bool(false));
        assert_eq!(ValueType::StdLogic.decode("1").unwrap(), Value::Bool(true));
        // no silent coercion of unknown states
        assert!(matches!(
            ValueType::StdLogic.decode("U"),
            Err(ValueConversionError::Malformed { .. })
        ));
    }

    #[test]
    fn test_decode_vectors() {
        assert_eq!(ValueType::Unsigned.decode("1010").unwrap(), Value::Int(10));
        assert_eq!(ValueType::StdLogicVector.decode("11111111").unwrap(), Value::Int(255));
        assert_eq!(ValueType::Signed.decode("1111").unwrap(), Value::Int(-1));
        assert_eq!(ValueType::Signed.decode("1000").unwrap(), Value::Int(-8));
        assert_eq!(ValueType::Signed.decode("0111").unwrap(), Value::Int(7));
        assert!(ValueType::Unsigned.decode("10x1").is_err());
        assert!(ValueType::Integer.decode("").is_err());
        // narrower integers are unsigned, only the full 32 bits carry a sign
        assert_eq!(ValueType::Integer.decode("101").unwrap(), Value::Int(5));
        let minus_two = ValueType::Integer.encode(Value::Int(-2), None).unwrap();
        assert_eq!(ValueType::Integer.decode(&minus_two).unwrap(), Value::Int(-2));
        let max = ValueType::Integer.encode(Value::Int(i32::MAX as i64), None).unwrap();
        assert_eq!(ValueType::Integer.decode(&max).unwrap(), Value::Int(i32::MAX as i64));
    }

    #[test]
    fn test_encode() {
        assert_eq!(ValueType::Unsigned.encode(Value::Int(5), Some(4)).unwrap(), "0101");
        assert_eq!(ValueType::Signed.encode(Value::Int(-1), Some(9)).unwrap(), "111111111");
        assert_eq!(ValueType::StdLogic.encode(Value::Bool(true), None).unwrap(), "1");
        assert_eq!(ValueType::Integer.encode(Value::Int(1), None).unwrap().len(), 32);
        assert!(matches!(
            ValueType::Unsigned.encode(Value::Int(16), Some(4)),
            Err(ValueConversionError::OutOfRange { .. })
        ));
        assert!(matches!(
            ValueType::Signed.encode(Value::Bool(true), Some(4)),
            Err(ValueConversionError::Incompatible { .. })
        ));
    }

    #[test]
    fn test_signed_decode_inverts_encode() {
        for value in -128..128 {
            let bits = ValueType::Signed.encode(Value::Int(value), Some(8)).unwrap();
            assert_eq!(ValueType::Signed.decode(&bits).unwrap(), Value::Int(value));
        }
    }
}
