//! Semantic value types
//!
//! Types as the analyzed program sees them. The engine only needs enough
//! structure to pick solver sorts, recognize string-domain values, and apply
//! the implicit conversion rules for comparisons.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class names treated as string-domain references
const STRING_CLASSES: [&str; 4] = [
    "java.lang.String",
    "java.lang.StringBuffer",
    "java.lang.StringBuilder",
    "java.lang.CharSequence",
];

/// Semantic type of a value in the analyzed program
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    /// Reference type with its fully qualified class name
    Reference(String),
    /// Array of an element type
    Array(Box<ValueType>),
    /// The type of the null constant
    Null,
    Void,
}

impl ValueType {
    /// Reference to a class by fully qualified name
    pub fn reference(class: impl Into<String>) -> Self {
        ValueType::Reference(class.into())
    }

    /// The `java.lang.String` reference type
    pub fn string() -> Self {
        ValueType::Reference(STRING_CLASSES[0].to_string())
    }

    /// True for string-domain reference types (String, CharSequence, builders)
    pub fn is_string(&self) -> bool {
        match self {
            ValueType::Reference(name) => STRING_CLASSES.contains(&name.as_str()),
            _ => false,
        }
    }

    /// True for primitive numeric types (including char, which widens to int)
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueType::Byte
                | ValueType::Char
                | ValueType::Short
                | ValueType::Int
                | ValueType::Long
                | ValueType::Float
                | ValueType::Double
        )
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, ValueType::Boolean)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, ValueType::Float | ValueType::Double)
    }

    /// True where a comparison against a string coerces the other side into
    /// the string domain: null, the integral index types, and references
    /// (which stringify through their text form)
    pub fn converts_to_string(&self) -> bool {
        matches!(
            self,
            ValueType::Null
                | ValueType::Int
                | ValueType::Long
                | ValueType::Short
                | ValueType::Reference(_)
        )
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, ValueType::Reference(_) | ValueType::Array(_))
    }

    /// Class name for reference types
    pub fn class_name(&self) -> Option<&str> {
        match self {
            ValueType::Reference(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Byte => write!(f, "byte"),
            ValueType::Char => write!(f, "char"),
            ValueType::Short => write!(f, "short"),
            ValueType::Int => write!(f, "int"),
            ValueType::Long => write!(f, "long"),
            ValueType::Float => write!(f, "float"),
            ValueType::Double => write!(f, "double"),
            ValueType::Reference(name) => write!(f, "{}", name),
            ValueType::Array(elem) => write!(f, "{}[]", elem),
            ValueType::Null => write!(f, "null_type"),
            ValueType::Void => write!(f, "void"),
        }
    }
}

/// A constant value appearing in program code
///
/// Reals compare and hash by bit pattern so the type can serve as a map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConstValue {
    Int(i64),
    Real(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl ConstValue {
    /// Default semantic type for this constant (booleans from the int form
    /// are fixed up by expression combination, not here)
    pub fn value_type(&self) -> ValueType {
        match self {
            ConstValue::Int(_) => ValueType::Int,
            ConstValue::Real(_) => ValueType::Double,
            ConstValue::Str(_) => ValueType::string(),
            ConstValue::Bool(_) => ValueType::Boolean,
            ConstValue::Null => ValueType::Null,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConstValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConstValue::Null)
    }

    /// Zero in any numeric form, the usual stand-in for false and null
    pub fn is_zero(&self) -> bool {
        match self {
            ConstValue::Int(n) => *n == 0,
            ConstValue::Real(r) => *r == 0.0,
            _ => false,
        }
    }
}

impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstValue::Int(a), ConstValue::Int(b)) => a == b,
            (ConstValue::Real(a), ConstValue::Real(b)) => a.to_bits() == b.to_bits(),
            (ConstValue::Str(a), ConstValue::Str(b)) => a == b,
            (ConstValue::Bool(a), ConstValue::Bool(b)) => a == b,
            (ConstValue::Null, ConstValue::Null) => true,
            _ => false,
        }
    }
}

impl Eq for ConstValue {}

impl std::hash::Hash for ConstValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            ConstValue::Int(n) => n.hash(state),
            ConstValue::Real(r) => r.to_bits().hash(state),
            ConstValue::Str(s) => s.hash(state),
            ConstValue::Bool(b) => b.hash(state),
            ConstValue::Null => {}
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(n) => write!(f, "{}", n),
            ConstValue::Real(r) => write!(f, "{}", r),
            ConstValue::Str(s) => write!(f, "\"{}\"", s),
            ConstValue::Bool(b) => write!(f, "{}", b),
            ConstValue::Null => write!(f, "null"),
        }
    }
}
