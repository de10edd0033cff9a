//! Symbolic and constant variables
//!
//! Leaves of the constraint algebra. A variable is either a program constant
//! or a symbol standing for a value the analysis cannot resolve statically:
//! an event input, a heap location, a key-value store read, or an opaque
//! call result. Symbols carry enough identity to be re-encountered across
//! expressions of the same path and merged by equality.
//!
//! Equality is variant-specific and deliberately ignores some payload:
//! key-value reads compare by store, base, and key (not by the read type, so
//! a `getString` and a `getInt` on the same slot collapse), and field
//! accesses compare by the field alone.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::shared::models::{AliasSig, ConstValue, FieldRef, MethodRef, ValueType};

/// Which key-value store a read came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Bundle,
    SharedPrefs,
    StringTable,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Bundle => write!(f, "Bundle"),
            StoreKind::SharedPrefs => write!(f, "SharedPrefs"),
            StoreKind::StringTable => write!(f, "StringTable"),
        }
    }
}

/// A leaf value in a symbolic expression
#[derive(Debug, Clone)]
pub enum Variable {
    /// Literal constant from program code
    Constant(ConstValue),
    /// Externally controlled entry-point argument, numbered from zero
    /// (slot 0 is the receiver of the entry method)
    Input {
        number: usize,
        /// Discriminates inputs of distinct paths in one report
        path_disc: u64,
        ty: ValueType,
    },
    /// Unresolved read of a heap field, tagged with the may-alias signature
    /// of the receiver object
    Heap { field: FieldRef, alias: AliasSig },
    /// Read from a key-value store (Bundle extras, shared preferences, the
    /// app's string table)
    KeyValue {
        store: StoreKind,
        base: Option<Arc<Variable>>,
        key: Option<Arc<Variable>>,
        ty: ValueType,
    },
    /// Opaque result of a call the analysis chose not to follow
    MethodResult {
        receiver: Option<Arc<Variable>>,
        method: Arc<MethodRef>,
        /// Identifies the call site so distinct calls stay distinct
        site: u64,
    },
    /// Runtime class of an object, as a string
    ClassType { object: Arc<Variable> },
    /// Instance field read off a known receiver
    FieldAccess {
        base: Option<Arc<Variable>>,
        field: FieldRef,
    },
    /// Named stand-in introduced by library models (call returns, fresh
    /// allocations, lengths)
    Placeholder { symbol: String, ty: ValueType },
}

impl Variable {
    pub fn constant(value: ConstValue) -> Self {
        Variable::Constant(value)
    }

    pub fn int(n: i64) -> Self {
        Variable::Constant(ConstValue::Int(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Variable::Constant(ConstValue::Str(s.into()))
    }

    pub fn boolean(b: bool) -> Self {
        Variable::Constant(ConstValue::Bool(b))
    }

    pub fn null() -> Self {
        Variable::Constant(ConstValue::Null)
    }

    pub fn input(number: usize, path_disc: u64, ty: ValueType) -> Self {
        Variable::Input {
            number,
            path_disc,
            ty,
        }
    }

    pub fn heap(field: FieldRef, alias: AliasSig) -> Self {
        Variable::Heap { field, alias }
    }

    pub fn key_value(
        store: StoreKind,
        base: Option<Variable>,
        key: Option<Variable>,
        ty: ValueType,
    ) -> Self {
        Variable::KeyValue {
            store,
            base: base.map(Arc::new),
            key: key.map(Arc::new),
            ty,
        }
    }

    pub fn method_result(receiver: Option<Variable>, method: MethodRef, site: u64) -> Self {
        Variable::MethodResult {
            receiver: receiver.map(Arc::new),
            method: Arc::new(method),
            site,
        }
    }

    pub fn class_type(object: Variable) -> Self {
        Variable::ClassType {
            object: Arc::new(object),
        }
    }

    pub fn field_access(base: Option<Variable>, field: FieldRef) -> Self {
        Variable::FieldAccess {
            base: base.map(Arc::new),
            field,
        }
    }

    pub fn placeholder(symbol: impl Into<String>, ty: ValueType) -> Self {
        Variable::Placeholder {
            symbol: symbol.into(),
            ty,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Classification
    // ═══════════════════════════════════════════════════════════════════

    pub fn is_constant(&self) -> bool {
        matches!(self, Variable::Constant(_))
    }

    pub fn is_symbolic(&self) -> bool {
        !self.is_constant()
    }

    pub fn is_input(&self) -> bool {
        matches!(self, Variable::Input { .. })
    }

    pub fn is_heap(&self) -> bool {
        matches!(self, Variable::Heap { .. })
    }

    pub fn is_key_value(&self) -> bool {
        matches!(self, Variable::KeyValue { .. })
    }

    pub fn as_constant(&self) -> Option<&ConstValue> {
        match self {
            Variable::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Semantic type of the value this variable stands for
    pub fn ty(&self) -> ValueType {
        match self {
            Variable::Constant(value) => value.value_type(),
            Variable::Input { ty, .. } => ty.clone(),
            Variable::Heap { field, .. } => field.ty.clone(),
            Variable::KeyValue { ty, .. } => ty.clone(),
            Variable::MethodResult { method, .. } => method.return_type.clone(),
            Variable::ClassType { .. } => ValueType::string(),
            Variable::FieldAccess { field, .. } => field.ty.clone(),
            Variable::Placeholder { ty, .. } => ty.clone(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Input tracking
    // ═══════════════════════════════════════════════════════════════════

    /// True when the value is derived from an entry-point argument
    pub fn depends_on_input(&self) -> bool {
        match self {
            Variable::Input { .. } => true,
            Variable::KeyValue { base, key, .. } => {
                base.as_deref().is_some_and(Variable::depends_on_input)
                    || key.as_deref().is_some_and(Variable::depends_on_input)
            }
            Variable::MethodResult { receiver, .. } => {
                receiver.as_deref().is_some_and(Variable::depends_on_input)
            }
            Variable::ClassType { object } => object.depends_on_input(),
            Variable::FieldAccess { base, .. } => {
                base.as_deref().is_some_and(Variable::depends_on_input)
            }
            Variable::Constant(_) | Variable::Heap { .. } | Variable::Placeholder { .. } => false,
        }
    }

    /// True when the value is derived from input slot `n` specifically
    pub fn depends_on_nth_input(&self, n: usize) -> bool {
        match self {
            Variable::Input { number, .. } => *number == n,
            Variable::KeyValue { base, key, .. } => {
                base.as_deref().is_some_and(|v| v.depends_on_nth_input(n))
                    || key.as_deref().is_some_and(|v| v.depends_on_nth_input(n))
            }
            Variable::MethodResult { receiver, .. } => {
                receiver.as_deref().is_some_and(|v| v.depends_on_nth_input(n))
            }
            Variable::ClassType { object } => object.depends_on_nth_input(n),
            Variable::FieldAccess { base, .. } => {
                base.as_deref().is_some_and(|v| v.depends_on_nth_input(n))
            }
            Variable::Constant(_) | Variable::Heap { .. } | Variable::Placeholder { .. } => false,
        }
    }

    /// Appends every symbolic variable reachable from this one, first
    /// encounter first, skipping duplicates already in `out`
    pub fn collect_variables(&self, out: &mut Vec<Variable>) {
        if self.is_constant() {
            return;
        }
        if !out.contains(self) {
            out.push(self.clone());
        }
        match self {
            Variable::ClassType { object } => object.collect_variables(out),
            Variable::FieldAccess {
                base: Some(base), ..
            } => base.collect_variables(out),
            _ => {}
        }
    }

    /// May-alias check between heap variables: same field and overlapping
    /// alias signatures. Unlike equality this accepts partial overlap, so it
    /// is the right relation for matching stores against reads.
    pub fn aliases(&self, other: &Variable) -> bool {
        match (self, other) {
            (
                Variable::Heap { field: fa, alias: aa },
                Variable::Heap { field: fb, alias: ab },
            ) => {
                if fa != fb {
                    return false;
                }
                if aa.is_empty() && ab.is_empty() {
                    return true;
                }
                aa.intersects(ab)
            }
            _ => self == other,
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Variable::Constant(a), Variable::Constant(b)) => a == b,
            (
                Variable::Input {
                    number: na,
                    path_disc: pa,
                    ty: ta,
                },
                Variable::Input {
                    number: nb,
                    path_disc: pb,
                    ty: tb,
                },
            ) => na == nb && pa == pb && ta == tb,
            (
                Variable::Heap { field: fa, alias: aa },
                Variable::Heap { field: fb, alias: ab },
            ) => fa == fb && aa == ab,
            // Read type is not identity: two reads of one slot are one value
            (
                Variable::KeyValue {
                    store: sa,
                    base: ba,
                    key: ka,
                    ..
                },
                Variable::KeyValue {
                    store: sb,
                    base: bb,
                    key: kb,
                    ..
                },
            ) => sa == sb && ba == bb && ka == kb,
            (
                Variable::MethodResult {
                    receiver: ra,
                    method: ma,
                    site: ca,
                },
                Variable::MethodResult {
                    receiver: rb,
                    method: mb,
                    site: cb,
                },
            ) => ca == cb && ma == mb && ra == rb,
            (Variable::ClassType { object: a }, Variable::ClassType { object: b }) => a == b,
            (
                Variable::FieldAccess { field: fa, .. },
                Variable::FieldAccess { field: fb, .. },
            ) => fa == fb,
            (
                Variable::Placeholder {
                    symbol: sa,
                    ty: ta,
                },
                Variable::Placeholder {
                    symbol: sb,
                    ty: tb,
                },
            ) => sa == sb && ta == tb,
            _ => false,
        }
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Variable::Constant(value) => value.hash(state),
            Variable::Input {
                number,
                path_disc,
                ty,
            } => {
                number.hash(state);
                path_disc.hash(state);
                ty.hash(state);
            }
            Variable::Heap { field, alias } => {
                field.hash(state);
                alias.hash(state);
            }
            Variable::KeyValue {
                store, base, key, ..
            } => {
                store.hash(state);
                base.hash(state);
                key.hash(state);
            }
            Variable::MethodResult {
                receiver,
                method,
                site,
            } => {
                receiver.hash(state);
                method.hash(state);
                site.hash(state);
            }
            Variable::ClassType { object } => object.hash(state),
            Variable::FieldAccess { field, .. } => field.hash(state),
            Variable::Placeholder { symbol, ty } => {
                symbol.hash(state);
                ty.hash(state);
            }
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Constant(value) => write!(f, "{}", value),
            Variable::Input {
                number, path_disc, ..
            } => write!(f, "<Input{}>{:x}", number, path_disc),
            Variable::Heap { field, alias } => {
                write!(f, "Heap<{}.{}", field.short_class_name(), field.name)?;
                if !alias.is_empty() {
                    write!(f, "{{{}}}", alias.discriminator())?;
                }
                write!(f, ">")
            }
            Variable::KeyValue {
                store, base, key, ..
            } => {
                match base {
                    Some(base) => write!(f, "{}<{}>", store, base)?,
                    None => write!(f, "{}<unknown>", store)?,
                }
                match key {
                    Some(key) => write!(f, "[{}]", key),
                    None => write!(f, "[*]"),
                }
            }
            Variable::MethodResult {
                receiver,
                method,
                site,
            } => {
                match receiver {
                    Some(receiver) => write!(f, "{}", receiver)?,
                    None => write!(f, "{}", method.short_class_name())?,
                }
                write!(f, ".{}(){{{:x}}}", method.name, site)
            }
            Variable::ClassType { object } => write!(f, "Class<{}>", object),
            Variable::FieldAccess { field, .. } => {
                write!(f, "{}.{}", field.short_class_name(), field.name)
            }
            Variable::Placeholder { symbol, .. } => write!(f, "{}", symbol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag_field() -> FieldRef {
        FieldRef::new("com.app.Config", "enabled", ValueType::Boolean)
    }

    #[test]
    fn input_symbols_are_path_scoped() {
        let a = Variable::input(1, 0xbeef, ValueType::Int);
        let b = Variable::input(1, 0xcafe, ValueType::Int);
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "<Input1>beef");
        assert!(a.depends_on_input());
        assert!(a.depends_on_nth_input(1));
        assert!(!a.depends_on_nth_input(0));
    }

    #[test]
    fn key_value_identity_ignores_read_type() {
        let key = Variable::string("cmd");
        let s = Variable::key_value(
            StoreKind::Bundle,
            None,
            Some(key.clone()),
            ValueType::string(),
        );
        let n = Variable::key_value(StoreKind::Bundle, None, Some(key), ValueType::Int);
        assert_eq!(s, n);
        assert_eq!(s.to_string(), "Bundle<unknown>[\"cmd\"]");
    }

    #[test]
    fn key_value_tracks_input_through_base() {
        let bundle = Variable::input(1, 7, ValueType::reference("android.os.Bundle"));
        let read = Variable::key_value(
            StoreKind::Bundle,
            Some(bundle),
            Some(Variable::string("k")),
            ValueType::string(),
        );
        assert!(read.depends_on_input());
        assert!(read.depends_on_nth_input(1));
    }

    #[test]
    fn heap_alias_overlap_is_not_equality() {
        let f = flag_field();
        let a = Variable::heap(f.clone(), AliasSig::new([1, 2]));
        let b = Variable::heap(f.clone(), AliasSig::new([2, 3]));
        let c = Variable::heap(f, AliasSig::new([4]));
        assert_ne!(a, b);
        assert!(a.aliases(&b));
        assert!(!a.aliases(&c));
    }

    #[test]
    fn unplaced_heap_variables_alias_by_field() {
        let f = flag_field();
        let a = Variable::heap(f.clone(), AliasSig::empty());
        let b = Variable::heap(f.clone(), AliasSig::empty());
        let placed = Variable::heap(f, AliasSig::new([9]));
        assert!(a.aliases(&b));
        assert!(!a.aliases(&placed));
    }

    #[test]
    fn constants_do_not_collect() {
        let mut out = Vec::new();
        Variable::int(3).collect_variables(&mut out);
        assert!(out.is_empty());

        let cls = Variable::class_type(Variable::input(0, 1, ValueType::reference("A")));
        cls.collect_variables(&mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn opaque_call_results_carry_their_site() {
        let m = MethodRef::new_static(
            "android.telephony.SmsMessage",
            "createFromPdu",
            vec![ValueType::Array(Box::new(ValueType::Byte))],
            ValueType::reference("android.telephony.SmsMessage"),
        );
        let a = Variable::method_result(None, m.clone(), 0x2a);
        let b = Variable::method_result(None, m, 0x2b);
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "SmsMessage.createFromPdu(){2a}");
    }
}
