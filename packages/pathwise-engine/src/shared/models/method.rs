//! Method, field and local identities
//!
//! Signatures follow the `<declaring.Class: return name(params)>` convention
//! so report output stays comparable with upstream tooling.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::ValueType;

/// Resolved method identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub class: String,
    pub name: String,
    pub param_types: Vec<ValueType>,
    pub return_type: ValueType,
    pub is_static: bool,
}

impl MethodRef {
    pub fn new(
        class: impl Into<String>,
        name: impl Into<String>,
        param_types: Vec<ValueType>,
        return_type: ValueType,
    ) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            param_types,
            return_type,
            is_static: false,
        }
    }

    pub fn new_static(
        class: impl Into<String>,
        name: impl Into<String>,
        param_types: Vec<ValueType>,
        return_type: ValueType,
    ) -> Self {
        Self {
            is_static: true,
            ..Self::new(class, name, param_types, return_type)
        }
    }

    /// Full signature, `<com.app.Main: void onCreate(android.os.Bundle)>`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.param_types.iter().map(|t| t.to_string()).collect();
        format!(
            "<{}: {} {}({})>",
            self.class,
            self.return_type,
            self.name,
            params.join(",")
        )
    }

    /// Class name without its package prefix
    pub fn short_class_name(&self) -> &str {
        short_name(&self.class)
    }

    /// Number of formal parameters, receiver excluded
    pub fn param_count(&self) -> usize {
        self.param_types.len()
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

/// Resolved field identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub class: String,
    pub name: String,
    pub ty: ValueType,
}

impl FieldRef {
    pub fn new(class: impl Into<String>, name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            ty,
        }
    }

    /// Full signature, `<com.app.Main: java.lang.String secret>`
    pub fn signature(&self) -> String {
        format!("<{}: {} {}>", self.class, self.ty, self.name)
    }

    pub fn short_class_name(&self) -> &str {
        short_name(&self.class)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

/// Named local slot inside one method body
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Local(String);

impl Local {
    pub fn new(name: impl Into<String>) -> Self {
        Local(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Local {
    fn from(name: &str) -> Self {
        Local::new(name)
    }
}

/// Incoming value bound by an identity instruction at a method entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSlot {
    /// The receiver of an instance method
    This,
    /// Formal parameter by zero-based position
    Arg(usize),
    /// Exception object at a handler entry
    CaughtException,
}

fn short_name(class: &str) -> &str {
    class.rsplit('.').next().unwrap_or(class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_signature_format() {
        let m = MethodRef::new(
            "com.app.Main",
            "onCreate",
            vec![ValueType::reference("android.os.Bundle")],
            ValueType::Void,
        );
        assert_eq!(
            m.signature(),
            "<com.app.Main: void onCreate(android.os.Bundle)>"
        );
        assert_eq!(m.short_class_name(), "Main");
    }

    #[test]
    fn field_signature_format() {
        let f = FieldRef::new("com.app.Store", "secret", ValueType::string());
        assert_eq!(f.signature(), "<com.app.Store: java.lang.String secret>");
    }
}
