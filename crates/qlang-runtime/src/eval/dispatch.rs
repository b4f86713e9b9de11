//! Method dispatch, instance construction, and type matching.
//!
//! Overload resolution is two-pass: a strict pass demanding exact runtime
//! kinds (walking the inheritance chain), then a fuzzy pass permitting
//! numeric unification, string/bool coercion targets, and ancestor-class
//! matches. The strict pass over the whole chain runs before the fuzzy
//! pass considers anything, so an exact parent match beats a widened child
//! match. Ties within a class fall to source order.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use qlang_common::diag::Severity;
use qlang_common::token::{type_name_to_kind, TokenKind};
use qlang_parser::ast::Class;

use crate::instance::{ClassInstance, InstanceRef};
use crate::value::Value;

use super::Runner;

/// A resolved method: the class that owns it plus its index. Holding the
/// `Rc` keeps the method body alive independently of the runner borrow.
pub(crate) type MethodRef = (Rc<Class>, usize);

impl Runner {
    // ── Overload resolution ────────────────────────────────────────────

    /// Two-pass lookup over `class` and its ancestors. `type_args` is the
    /// receiving instance's generic mapping (empty when not generic).
    pub(crate) fn find_method(
        &self,
        class: &Rc<Class>,
        name: &str,
        args: &[Value],
        type_args: &FxHashMap<String, String>,
    ) -> Option<MethodRef> {
        self.find_method_pass(class, name, args, type_args, true)
            .or_else(|| self.find_method_pass(class, name, args, type_args, false))
    }

    fn find_method_pass(
        &self,
        class: &Rc<Class>,
        name: &str,
        args: &[Value],
        type_args: &FxHashMap<String, String>,
        strict: bool,
    ) -> Option<MethodRef> {
        'methods: for (idx, method) in class.methods.iter().enumerate() {
            if method.name != name || method.params.len() != args.len() {
                continue;
            }

            for (param, arg) in method.params.iter().zip(args) {
                // A parameter typed by a generic placeholder accepts any
                // class instance; the concrete binding lives on the
                // receiver, not the method.
                if param.kind == TokenKind::Ident && type_args.contains_key(&param.type_name) {
                    if arg.as_instance().is_none() {
                        continue 'methods;
                    }
                    continue;
                }
                if !self.check_type_match(arg, param.kind, &param.type_name, strict) {
                    continue 'methods;
                }
            }

            return Some((class.clone(), idx));
        }

        // Miss here: try the parent chain at the same strictness.
        if let Some(parent_name) = &class.parent {
            if let Some(parent) = self.classes.get(parent_name).cloned() {
                return self.find_method_pass(&parent, name, args, type_args, strict);
            }
        }

        None
    }

    /// Two-pass lookup restricted to one class (no inheritance). Used for
    /// parent default constructors.
    pub(crate) fn find_method_in_class(
        &self,
        class: &Rc<Class>,
        name: &str,
        args: &[Value],
    ) -> Option<MethodRef> {
        self.find_in_class_pass(class, name, args, true)
            .or_else(|| self.find_in_class_pass(class, name, args, false))
    }

    fn find_in_class_pass(
        &self,
        class: &Rc<Class>,
        name: &str,
        args: &[Value],
        strict: bool,
    ) -> Option<MethodRef> {
        'methods: for (idx, method) in class.methods.iter().enumerate() {
            if method.name != name || method.params.len() != args.len() {
                continue;
            }
            for (param, arg) in method.params.iter().zip(args) {
                if !self.check_type_match(arg, param.kind, &param.type_name, strict) {
                    continue 'methods;
                }
            }
            return Some((class.clone(), idx));
        }
        None
    }

    /// Whether a runtime value matches a declared parameter type.
    pub(crate) fn check_type_match(
        &self,
        value: &Value,
        kind: TokenKind,
        type_name: &str,
        strict: bool,
    ) -> bool {
        if strict {
            return match kind {
                TokenKind::Int32 | TokenKind::Short | TokenKind::Byte => {
                    matches!(value, Value::I32(_))
                }
                TokenKind::Int64 => matches!(value, Value::I64(_)),
                TokenKind::Float32 => matches!(value, Value::F32(_)),
                TokenKind::Float64 => matches!(value, Value::F64(_)),
                TokenKind::StringTy => matches!(value, Value::Str(_)),
                TokenKind::Bool => matches!(value, Value::Bool(_)),
                TokenKind::Cptr | TokenKind::Iptr | TokenKind::Fptr | TokenKind::Bptr => {
                    matches!(value, Value::Ptr(_))
                }
                TokenKind::Ident => match value.as_instance() {
                    Some(handle) => {
                        type_name.is_empty()
                            || type_name == "void"
                            || handle.borrow().class_name() == type_name
                    }
                    None => false,
                },
                _ => true,
            };
        }

        match kind {
            TokenKind::Int32
            | TokenKind::Int64
            | TokenKind::Short
            | TokenKind::Byte
            | TokenKind::Float32
            | TokenKind::Float64 => value.is_numeric(),
            // anything can be string- or truthy-coerced
            TokenKind::StringTy | TokenKind::Bool => true,
            TokenKind::Cptr | TokenKind::Iptr | TokenKind::Fptr | TokenKind::Bptr => {
                matches!(value, Value::Ptr(_) | Value::Null)
            }
            TokenKind::Ident => match value.as_instance() {
                Some(handle) => {
                    if type_name.is_empty() || type_name == "void" {
                        return true;
                    }
                    // exact class or any ancestor
                    let mut current = handle.borrow().class().clone();
                    loop {
                        if current.name == type_name {
                            return true;
                        }
                        let Some(parent_name) = &current.parent else {
                            return false;
                        };
                        let Some(parent) = self.classes.get(parent_name) else {
                            return false;
                        };
                        current = parent.clone();
                    }
                }
                None => false,
            },
            _ => true,
        }
    }

    // ── Coercion and defaults ──────────────────────────────────────────

    /// Coerce a value to a declared kind. Integers truncate via i64,
    /// floats round-trip through f64, strings take the raw rendering,
    /// bools take truthiness. Unknown/class kinds pass through.
    pub(crate) fn coerce(&self, value: Value, kind: TokenKind) -> Value {
        match kind {
            TokenKind::Int32 | TokenKind::Short | TokenKind::Byte => {
                Value::I32(value.to_i64() as i32)
            }
            TokenKind::Int64 => Value::I64(value.to_i64()),
            TokenKind::Float32 => Value::F32(value.to_f64() as f32),
            TokenKind::Float64 => Value::F64(value.to_f64()),
            TokenKind::StringTy => match value {
                Value::Str(_) => value,
                other => Value::Str(other.to_string_raw()),
            },
            TokenKind::Bool => match value {
                Value::Bool(_) => value,
                other => Value::Bool(other.to_bool()),
            },
            _ => value,
        }
    }

    /// Zero value for a declared kind.
    pub(crate) fn default_value(&self, kind: TokenKind) -> Value {
        match kind {
            TokenKind::Int32 | TokenKind::Short | TokenKind::Byte => Value::I32(0),
            TokenKind::Int64 => Value::I64(0),
            TokenKind::Float32 => Value::F32(0.0),
            TokenKind::Float64 => Value::F64(0.0),
            TokenKind::StringTy => Value::Str(String::new()),
            TokenKind::Bool => Value::Bool(false),
            TokenKind::Cptr | TokenKind::Iptr | TokenKind::Fptr | TokenKind::Bptr => Value::Ptr(0),
            _ => Value::Null,
        }
    }

    // ── Instance construction ──────────────────────────────────────────

    /// Create an instance of `class_name`, initializing every member
    /// (inherited members first) and running the matching constructor.
    /// Reports and returns `None` when the class is unknown.
    pub fn create_instance(&mut self, class_name: &str, args: &[Value]) -> Option<InstanceRef> {
        self.create_instance_with_type_args(class_name, args, &FxHashMap::default())
    }

    pub(crate) fn create_instance_with_type_args(
        &mut self,
        class_name: &str,
        args: &[Value],
        type_args: &FxHashMap<String, String>,
    ) -> Option<InstanceRef> {
        let Some(class) = self.classes.get(class_name).cloned() else {
            self.report_runtime(&format!("class not found: {}", class_name), 0, 0, 0);
            return None;
        };

        let instance = ClassInstance::new(class.clone());
        if !type_args.is_empty() {
            instance.borrow_mut().set_type_args(type_args.clone());
        }

        self.initialize_instance_members(&instance, &class, type_args);

        // Constructor: a method named after the class. Its return value,
        // if any, is discarded.
        if let Some((ctor_class, idx)) = self.find_method(&class, class_name, args, type_args) {
            self.execute_method(&ctor_class, idx, &instance, args);
            self.has_return = false;
        } else if !args.is_empty() {
            self.report_runtime(
                &format!(
                    "no constructor found for class '{}' matching {} arguments",
                    class_name,
                    args.len()
                ),
                0,
                0,
                0,
            );
        }

        Some(instance)
    }

    /// Depth-first, parent-before-self member initialization.
    ///
    /// Parents contribute their members (and their default constructor)
    /// before the child's members are evaluated. A member whose declared
    /// type is a generic placeholder resolves through `type_args` first.
    pub(crate) fn initialize_instance_members(
        &mut self,
        instance: &InstanceRef,
        class: &Rc<Class>,
        type_args: &FxHashMap<String, String>,
    ) {
        if let Some(parent_name) = &class.parent {
            if let Some(parent) = self.classes.get(parent_name).cloned() {
                self.initialize_instance_members(instance, &parent, type_args);

                if let Some((ctor_class, idx)) =
                    self.find_method_in_class(&parent, parent_name, &[])
                {
                    self.execute_method(&ctor_class, idx, instance, &[]);
                    self.has_return = false;
                }
            } else {
                self.report_runtime(&format!("parent class not found: {}", parent_name), 0, 0, 0);
            }
        }

        for member in &class.members {
            let mut kind = member.kind;
            if kind == TokenKind::Ident {
                if let Some(concrete) = type_args.get(&member.type_name) {
                    kind = type_name_to_kind(concrete);
                }
            }

            if kind == TokenKind::Ident {
                match &member.init {
                    Some(init)
                        if init.tokens.first().map(|t| t.kind) == Some(TokenKind::New) =>
                    {
                        // `Other ot = new Other(args);` -- build the nested
                        // instance through the expression path so the
                        // constructor arguments are honored.
                        match self.eval_expr(init) {
                            Value::Instance(nested) => {
                                instance.borrow_mut().set_nested(member.name.clone(), nested);
                            }
                            _ => {
                                instance
                                    .borrow_mut()
                                    .set_field(member.name.clone(), Value::Null);
                            }
                        }
                    }
                    Some(init) => {
                        let line = init.line();
                        let context = self.call_stack.current_context();
                        self.collector.report(
                            Severity::Warning,
                            format!(
                                "unknown initializer for class member '{}'",
                                member.name
                            ),
                            line,
                            0,
                            0,
                            "runtime",
                            &context,
                        );
                        instance
                            .borrow_mut()
                            .set_field(member.name.clone(), Value::Null);
                    }
                    None => {
                        instance
                            .borrow_mut()
                            .set_field(member.name.clone(), Value::Null);
                    }
                }
            } else if let Some(init) = &member.init {
                let value = self.eval_expr(init);
                let value = self.coerce(value, kind);
                instance.borrow_mut().set_field(member.name.clone(), value);
            } else {
                let value = self.default_value(kind);
                instance.borrow_mut().set_field(member.name.clone(), value);
            }
        }
    }

    // ── Method execution ───────────────────────────────────────────────

    /// Run a method against an instance: child scope, primitive fields
    /// copied in as locals, nested instances aliased by reference, `this`
    /// bound, parameters coerced, and primitive locals written back to the
    /// instance on return.
    pub(crate) fn execute_method(
        &mut self,
        class: &Rc<Class>,
        method_idx: usize,
        instance: &InstanceRef,
        args: &[Value],
    ) {
        let method = &class.methods[method_idx];

        let child = self.scope.child(format!("method:{}", method.name));

        {
            let inner = instance.borrow();
            for (name, value) in inner.fields() {
                child.set_var(name.clone(), value.clone());
            }
            for name in inner.nested_names() {
                if let Some(nested) = inner.get_nested(&name) {
                    child.set_var(name, Value::Instance(nested));
                }
            }
        }

        child.set_var("__this__", Value::Instance(instance.clone()));
        child.set_var("this", Value::Instance(instance.clone()));

        let class_name = instance.borrow().class_name().to_owned();
        self.call_stack.push(&method.name, &class_name, method.line);

        for (param, arg) in method.params.iter().zip(args) {
            let coerced = self.coerce(arg.clone(), param.kind);
            child.set_var(param.name.clone(), coerced);
        }

        let saved = std::mem::replace(&mut self.scope, child.clone());
        self.execute_block(&method.body);
        self.scope = saved;

        // Write-back: every primitive field shadowed as a local flows back
        // into the instance. Instance-valued locals do not overwrite
        // primitive fields with handles.
        let names = instance.borrow().field_names();
        for name in names {
            if child.has_local_var(&name) {
                let new_value = child.get_var(&name).unwrap_or(Value::Null);
                let primitive = match new_value {
                    Value::Instance(_) => Value::Null,
                    other => other,
                };
                instance.borrow_mut().set_field(name, primitive);
            }
        }

        self.call_stack.pop();
    }

    /// Host API: call a method by name on an instance, returning its value
    /// (null for void methods). Reports when no overload matches.
    pub fn call_method(
        &mut self,
        instance: &InstanceRef,
        name: &str,
        args: &[Value],
    ) -> Value {
        let class = instance.borrow().class().clone();
        let type_args = instance.borrow().type_args().clone();

        let Some((target_class, idx)) = self.find_method(&class, name, args, &type_args) else {
            self.report_runtime(
                &format!(
                    "method '{}' not found in class '{}' matching arguments",
                    name, class.name
                ),
                0,
                0,
                0,
            );
            return Value::Null;
        };

        self.has_return = false;
        self.execute_method(&target_class, idx, instance, args);
        if self.has_return {
            self.take_return()
        } else {
            Value::Null
        }
    }

    // ── Receiver resolution ────────────────────────────────────────────

    /// Resolve a chain head: a scope variable, or a static class's
    /// singleton instance.
    pub(crate) fn lookup_receiver(&mut self, name: &str) -> Option<Value> {
        if let Some(value) = self.scope.get_var(name) {
            return Some(value);
        }
        self.static_instance(name).map(Value::Instance)
    }

    /// Get or lazily create the singleton instance backing a static class.
    pub(crate) fn static_instance(&mut self, name: &str) -> Option<InstanceRef> {
        if let Some(existing) = self.statics.get(name) {
            return Some(existing.clone());
        }
        let class = self.classes.get(name)?.clone();
        if !class.is_static {
            return None;
        }
        let instance = self.create_instance(name, &[])?;
        self.statics.insert(name.to_owned(), instance.clone());
        Some(instance)
    }

    /// Walk nested-instance segments of a dotted path. Reports and returns
    /// `None` when a segment is missing.
    pub(crate) fn traverse_nested(
        &mut self,
        start: InstanceRef,
        segments: &[&str],
    ) -> Option<InstanceRef> {
        let mut current = start;
        for segment in segments {
            let next = current.borrow().get_nested(segment);
            match next {
                Some(nested) => current = nested,
                None => {
                    self.report_runtime(
                        &format!("nested instance '{}' not found", segment),
                        0,
                        0,
                        0,
                    );
                    return None;
                }
            }
        }
        Some(current)
    }
}
