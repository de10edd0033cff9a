//! Models for well-known platform and runtime calls
//!
//! The symbolic walk cannot descend into framework code, so the calls that
//! matter for constraint shapes are matched here by callee identity and
//! replaced with a symbolic summary. Everything unmatched falls back to the
//! opaque-call handling in the resolver.

use crate::features::constraint::domain::{Operator, StoreKind};
use crate::shared::models::{Call, Operand, ValueType};

const SMS_MESSAGE_CLASSES: [&str; 2] = [
    "android.telephony.SmsMessage",
    "android.telephony.gsm.SmsMessage",
];

const RESOURCE_CLASSES: [&str; 2] = ["android.content.Context", "android.content.res.Resources"];

const BUILDER_CLASSES: [&str; 2] = ["java.lang.StringBuilder", "java.lang.StringBuffer"];

/// A call site the resolver summarizes instead of treating as opaque
#[derive(Debug)]
pub enum KnownCall<'c> {
    /// Message decoded from a raw payload; the result stays tied to the
    /// payload so input reconstruction can reach it
    PduDecode { payload: &'c Operand },
    /// Read from a keyed store (extras bundle, preferences)
    StoreRead {
        store: StoreKind,
        base: &'c Operand,
        key: &'c Operand,
        ty: ValueType,
    },
    /// Localized string looked up by resource id
    ResourceLookup { key: &'c Operand },
    /// String concatenation through a builder
    Append { base: &'c Operand, arg: &'c Operand },
    /// Result is the receiver's own tracked value
    Passthrough { base: &'c Operand },
    /// String test returning a boolean the caller usually branches on
    StringTest {
        op: Operator,
        base: &'c Operand,
        arg: &'c Operand,
    },
    /// Any `equals(Object)` override, compared structurally
    ObjectEquals { base: &'c Operand, arg: &'c Operand },
}

/// Matches a call against the model table
pub fn classify(call: &Call) -> Option<KnownCall<'_>> {
    let callee = &call.callee;
    let class = callee.class.as_str();
    let name = callee.name.as_str();

    if SMS_MESSAGE_CLASSES.contains(&class) && name == "createFromPdu" {
        let payload = call.args.first()?;
        return Some(KnownCall::PduDecode { payload });
    }

    if let Some(store) = store_kind(class) {
        if name.starts_with("get") && first_param_is_string(callee.param_types.first()) {
            let base = call.receiver.as_ref()?;
            let key = call.args.first()?;
            return Some(KnownCall::StoreRead {
                store,
                base,
                key,
                ty: callee.return_type.clone(),
            });
        }
    }

    if RESOURCE_CLASSES.contains(&class)
        && (name == "getString" || name == "getText")
        && matches!(callee.param_types.first(), Some(ValueType::Int))
    {
        let key = call.args.first()?;
        return Some(KnownCall::ResourceLookup { key });
    }

    if BUILDER_CLASSES.contains(&class) && name == "append" {
        let base = call.receiver.as_ref()?;
        let arg = call.args.first()?;
        return Some(KnownCall::Append { base, arg });
    }

    let returns_string = callee.return_type.is_string();
    if call.args.is_empty()
        && ((name == "toString" && returns_string) || name == "toCharArray")
    {
        let base = call.receiver.as_ref()?;
        return Some(KnownCall::Passthrough { base });
    }

    if class == "java.lang.String" && call.args.len() == 1 {
        let op = match name {
            "equals" => Some(Operator::StrEq),
            "contains" => Some(Operator::Contains),
            "startsWith" => Some(Operator::PrefixOf),
            "endsWith" => Some(Operator::SuffixOf),
            _ => None,
        };
        if let Some(op) = op {
            let base = call.receiver.as_ref()?;
            let arg = &call.args[0];
            return Some(KnownCall::StringTest { op, base, arg });
        }
    }

    if name == "equals"
        && callee.return_type == ValueType::Boolean
        && matches!(
            callee.param_types.as_slice(),
            [ValueType::Reference(c)] if c == "java.lang.Object"
        )
    {
        let base = call.receiver.as_ref()?;
        let arg = call.args.first()?;
        return Some(KnownCall::ObjectEquals { base, arg });
    }

    None
}

fn store_kind(class: &str) -> Option<StoreKind> {
    match class {
        "android.os.Bundle" => Some(StoreKind::Bundle),
        "android.content.SharedPreferences" => Some(StoreKind::SharedPrefs),
        _ => None,
    }
}

fn first_param_is_string(param: Option<&ValueType>) -> bool {
    matches!(param, Some(ty) if ty.is_string())
}
