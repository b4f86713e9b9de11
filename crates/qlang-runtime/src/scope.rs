//! Scoped variable environments.
//!
//! A scope maps names to values and holds the host's registered native
//! functions. Scopes chain to a parent: lookups walk to the root, writes
//! target the current scope (this is what gives method activations their
//! field-shadowing locals). Scopes are handed around as cheap clone-able
//! references.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::value::Value;

/// A host-supplied callable, invoked like a QLang function.
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Value>;

struct Scope {
    name: String,
    parent: Option<ScopeRef>,
    vars: FxHashMap<String, Value>,
    funcs: FxHashMap<String, NativeFn>,
}

/// Shared handle to a scope. Method activation creates a child; the child
/// is dropped at return.
#[derive(Clone)]
pub struct ScopeRef(Rc<RefCell<Scope>>);

impl ScopeRef {
    /// Create a root scope.
    pub fn new(name: impl Into<String>) -> Self {
        ScopeRef(Rc::new(RefCell::new(Scope {
            name: name.into(),
            parent: None,
            vars: FxHashMap::default(),
            funcs: FxHashMap::default(),
        })))
    }

    /// Create a child scope chained to this one.
    pub fn child(&self, name: impl Into<String>) -> Self {
        ScopeRef(Rc::new(RefCell::new(Scope {
            name: name.into(),
            parent: Some(self.clone()),
            vars: FxHashMap::default(),
            funcs: FxHashMap::default(),
        })))
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn parent(&self) -> Option<ScopeRef> {
        self.0.borrow().parent.clone()
    }

    // ── Variables ──────────────────────────────────────────────────────

    /// Look up a variable, walking the parent chain to the root.
    pub fn get_var(&self, name: &str) -> Option<Value> {
        let scope = self.0.borrow();
        if let Some(value) = scope.vars.get(name) {
            return Some(value.clone());
        }
        scope.parent.as_ref().and_then(|p| p.get_var(name))
    }

    /// Bind a variable in *this* scope (shadowing any outer binding).
    pub fn set_var(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().vars.insert(name.into(), value);
    }

    /// Whether the name resolves anywhere in the chain.
    pub fn has_var(&self, name: &str) -> bool {
        let scope = self.0.borrow();
        scope.vars.contains_key(name)
            || scope.parent.as_ref().is_some_and(|p| p.has_var(name))
    }

    /// Whether the name is bound in this scope directly (used by the
    /// method-return write-back).
    pub fn has_local_var(&self, name: &str) -> bool {
        self.0.borrow().vars.contains_key(name)
    }

    // ── Native functions ───────────────────────────────────────────────

    /// Register a host function on this scope.
    pub fn register_native_function(
        &self,
        name: impl Into<String>,
        func: impl Fn(&[Value]) -> Value + 'static,
    ) {
        self.0
            .borrow_mut()
            .funcs
            .insert(name.into(), Rc::new(func));
    }

    /// Find a native function, walking the parent chain.
    pub fn find_native(&self, name: &str) -> Option<NativeFn> {
        let scope = self.0.borrow();
        if let Some(func) = scope.funcs.get(name) {
            return Some(func.clone());
        }
        scope.parent.as_ref().and_then(|p| p.find_native(name))
    }

    pub fn has_native(&self, name: &str) -> bool {
        self.find_native(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_chain_write_stays_local() {
        let root = ScopeRef::new("global");
        root.set_var("x", Value::I32(1));

        let child = root.child("method:F");
        assert_eq!(child.get_var("x"), Some(Value::I32(1)));
        assert!(child.has_var("x"));
        assert!(!child.has_local_var("x"));

        // writing in the child shadows, leaving the root untouched
        child.set_var("x", Value::I32(2));
        assert_eq!(child.get_var("x"), Some(Value::I32(2)));
        assert_eq!(root.get_var("x"), Some(Value::I32(1)));
        assert!(child.has_local_var("x"));
    }

    #[test]
    fn missing_variable_is_none() {
        let scope = ScopeRef::new("global");
        assert_eq!(scope.get_var("ghost"), None);
        assert!(!scope.has_var("ghost"));
    }

    #[test]
    fn native_functions_resolve_through_chain() {
        let root = ScopeRef::new("global");
        root.register_native_function("Add", |args: &[Value]| {
            Value::I32(args.iter().map(|v| v.to_i64() as i32).sum())
        });

        let child = root.child("method:F");
        assert!(child.has_native("Add"));
        let f = child.find_native("Add").unwrap();
        assert_eq!(f(&[Value::I32(2), Value::I32(3)]), Value::I32(5));
        assert!(!child.has_native("Sub"));
    }

    #[test]
    fn child_scope_names() {
        let root = ScopeRef::new("global");
        let child = root.child("method:Go");
        assert_eq!(child.name(), "method:Go");
        assert_eq!(child.parent().map(|p| p.name()), Some("global".to_owned()));
    }
}
