//! Runtime values.
//!
//! A [`Value`] is the tagged union flowing through the evaluator: null,
//! booleans, the four numeric kinds, strings, opaque host pointers, and
//! class-instance handles. Instances are shared by reference; cloning a
//! `Value` clones the handle, not the object.

use std::fmt;
use std::rc::Rc;

use crate::instance::InstanceRef;

/// A QLang runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    /// Opaque host pointer (`cptr` and its typed aliases).
    Ptr(usize),
    Instance(InstanceRef),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::I32(_) | Value::I64(_) | Value::F32(_) | Value::F64(_)
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::F32(_) | Value::F64(_))
    }

    pub fn as_instance(&self) -> Option<&InstanceRef> {
        match self {
            Value::Instance(handle) => Some(handle),
            _ => None,
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I32(_) => "int32",
            Value::I64(_) => "int64",
            Value::F32(_) => "float32",
            Value::F64(_) => "float64",
            Value::Str(_) => "string",
            Value::Ptr(_) => "cptr",
            Value::Instance(_) => "instance",
        }
    }

    /// Truthiness: null is false, numbers compare against zero, strings
    /// against empty, instances are always true, pointers against null.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::I32(v) => *v != 0,
            Value::I64(v) => *v != 0,
            Value::F32(v) => *v != 0.0,
            Value::F64(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Ptr(p) => *p != 0,
            Value::Instance(_) => true,
        }
    }

    /// Numeric widening to i64; booleans promote to 0/1, other
    /// non-numeric values become 0.
    pub fn to_i64(&self) -> i64 {
        match self {
            Value::Bool(b) => i64::from(*b),
            Value::I32(v) => i64::from(*v),
            Value::I64(v) => *v,
            Value::F32(v) => *v as i64,
            Value::F64(v) => *v as i64,
            _ => 0,
        }
    }

    /// Numeric widening to f64; booleans promote to 0.0/1.0, other
    /// non-numeric values become 0.0.
    pub fn to_f64(&self) -> f64 {
        match self {
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::I32(v) => f64::from(*v),
            Value::I64(v) => *v as f64,
            Value::F32(v) => f64::from(*v),
            Value::F64(v) => *v as f64,
            _ => 0.0,
        }
    }

    /// Display form: strings keep their quotes, instances show their class.
    pub fn display(&self) -> String {
        match self {
            Value::Null => "null".to_owned(),
            Value::Bool(b) => b.to_string(),
            Value::I32(v) => v.to_string(),
            Value::I64(v) => v.to_string(),
            Value::F32(v) => v.to_string(),
            Value::F64(v) => v.to_string(),
            Value::Str(s) => format!("\"{}\"", s),
            Value::Ptr(p) => format!("<cptr:{:#x}>", p),
            Value::Instance(handle) => {
                format!("<instance {}>", handle.borrow().class_name())
            }
        }
    }

    /// String coercion form: like [`display`](Self::display) but without
    /// surrounding quotes on strings. This is what `+` concatenation and
    /// string coercion use.
    pub fn to_string_raw(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.display(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl PartialEq for Value {
    /// Structural equality per variant; instances compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Ptr(a), Value::Ptr(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_table() {
        assert!(!Value::Null.to_bool());
        assert!(Value::Bool(true).to_bool());
        assert!(!Value::Bool(false).to_bool());
        assert!(Value::I32(3).to_bool());
        assert!(!Value::I32(0).to_bool());
        assert!(Value::F64(0.5).to_bool());
        assert!(!Value::F32(0.0).to_bool());
        assert!(Value::Str("x".into()).to_bool());
        assert!(!Value::Str(String::new()).to_bool());
        assert!(Value::Ptr(0xdead).to_bool());
        assert!(!Value::Ptr(0).to_bool());
    }

    #[test]
    fn truthiness_is_idempotent() {
        for value in [
            Value::Null,
            Value::Bool(true),
            Value::I32(7),
            Value::F32(0.0),
            Value::Str("s".into()),
        ] {
            let once = value.to_bool();
            assert_eq!(Value::Bool(once).to_bool(), once);
        }
    }

    #[test]
    fn numeric_widening() {
        assert_eq!(Value::I32(5).to_i64(), 5);
        assert_eq!(Value::F32(2.9).to_i64(), 2);
        assert_eq!(Value::I64(9).to_f64(), 9.0);
        assert_eq!(Value::Str("x".into()).to_i64(), 0);
        assert_eq!(Value::Null.to_f64(), 0.0);
    }

    #[test]
    fn display_quotes_strings_raw_does_not() {
        let s = Value::Str("hi".into());
        assert_eq!(s.display(), "\"hi\"");
        assert_eq!(s.to_string_raw(), "hi");
        assert_eq!(Value::I32(4).to_string_raw(), "4");
        assert_eq!(Value::Null.to_string_raw(), "null");
    }

    #[test]
    fn equality_per_variant() {
        assert_eq!(Value::I32(1), Value::I32(1));
        assert_ne!(Value::I32(1), Value::I64(1));
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::I32(0));
    }
}
