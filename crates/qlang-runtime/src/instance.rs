//! Runtime class instances.
//!
//! An instance holds primitive field values and nested instance handles in
//! separate maps, plus the generic type-argument mapping captured at
//! construction. The class AST is shared (`Rc`) with the runner's registry;
//! instances borrow it for the lifetime of the program.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use qlang_parser::ast::Class;

use crate::value::Value;

/// Shared handle to a class instance. Nested fields and scopes alias the
/// same object; mutation through any handle is visible to all holders.
pub type InstanceRef = Rc<RefCell<ClassInstance>>;

/// A runtime object: field values, nested instances, and the resolved
/// generic type arguments.
#[derive(Debug)]
pub struct ClassInstance {
    class: Rc<Class>,
    fields: FxHashMap<String, Value>,
    nested: FxHashMap<String, InstanceRef>,
    type_args: FxHashMap<String, String>,
}

impl ClassInstance {
    /// Create an instance with its *own* primitive members zero-initialized.
    ///
    /// Class-typed members are left out of the field map: they land in the
    /// nested map (or as an explicit null field) during the runner's
    /// construction pass, which also fills in inherited members and
    /// evaluated initializers, walking the parent chain first.
    pub fn new(class: Rc<Class>) -> InstanceRef {
        let mut fields = FxHashMap::default();
        for member in &class.members {
            if member.kind.is_type_keyword() {
                fields.insert(member.name.clone(), Value::Null);
            }
        }
        Rc::new(RefCell::new(Self {
            class,
            fields,
            nested: FxHashMap::default(),
            type_args: FxHashMap::default(),
        }))
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    // ── Primitive fields ───────────────────────────────────────────────

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    /// Whether the name is a field or a nested instance.
    pub fn has_member(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.nested.contains_key(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn fields(&self) -> &FxHashMap<String, Value> {
        &self.fields
    }

    // ── Nested instances ───────────────────────────────────────────────

    pub fn set_nested(&mut self, name: impl Into<String>, instance: InstanceRef) {
        self.nested.insert(name.into(), instance);
    }

    pub fn get_nested(&self, name: &str) -> Option<InstanceRef> {
        self.nested.get(name).cloned()
    }

    pub fn has_nested(&self, name: &str) -> bool {
        self.nested.contains_key(name)
    }

    pub fn nested_names(&self) -> Vec<String> {
        self.nested.keys().cloned().collect()
    }

    // ── Generic type arguments ─────────────────────────────────────────

    pub fn set_type_args(&mut self, mapping: FxHashMap<String, String>) {
        self.type_args = mapping;
    }

    pub fn type_args(&self) -> &FxHashMap<String, String> {
        &self.type_args
    }

    pub fn has_type_args(&self) -> bool {
        !self.type_args.is_empty()
    }
}
