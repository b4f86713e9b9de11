//! The tree-walking evaluator.
//!
//! [`Runner`] owns the class/enum registries, the active scope chain, the
//! single return slot, the call stack, and the diagnostic collector. A run
//! is synchronous: statements execute in source order, method calls swap in
//! a child scope, and `return` short-circuits block execution through the
//! return flag.

mod dispatch;
mod expr;

use std::rc::Rc;

use rustc_hash::FxHashMap;

use qlang_common::diag::{ErrorCollector, Severity};
use qlang_common::stack::CallStack;
use qlang_common::token::TokenKind;
use qlang_parser::ast::{
    Assign, Block, Call, Class, EnumDef, For, If, Increment, InstanceDecl, InstanceInit,
    MemberAssign, MethodCall, Program, Return, Stmt, VarDecl, While,
};

use crate::instance::InstanceRef;
use crate::scope::ScopeRef;
use crate::value::Value;

/// Runaway-loop protection for `while`.
const MAX_WHILE_ITERATIONS: u64 = 1_000_000;

/// The QLang evaluator and host entry point.
pub struct Runner {
    pub(crate) scope: ScopeRef,
    pub(crate) classes: FxHashMap<String, Rc<Class>>,
    pub(crate) enums: FxHashMap<String, Rc<EnumDef>>,
    /// Lazily created singletons backing `static class` declarations.
    pub(crate) statics: FxHashMap<String, InstanceRef>,
    pub(crate) has_return: bool,
    pub(crate) return_value: Value,
    pub(crate) collector: ErrorCollector,
    pub(crate) call_stack: CallStack,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(ErrorCollector::new())
    }
}

impl Runner {
    /// Create a runner that takes over the diagnostic collector used during
    /// lexing/parsing, so one listing covers the whole pipeline.
    pub fn new(collector: ErrorCollector) -> Self {
        Self {
            scope: ScopeRef::new("global"),
            classes: FxHashMap::default(),
            enums: FxHashMap::default(),
            statics: FxHashMap::default(),
            has_return: false,
            return_value: Value::Null,
            collector,
            call_stack: CallStack::new(),
        }
    }

    // ── Host embedding surface ─────────────────────────────────────────

    /// Register a native function on the global scope.
    pub fn register_native_function(
        &self,
        name: impl Into<String>,
        func: impl Fn(&[Value]) -> Value + 'static,
    ) {
        self.scope.register_native_function(name, func);
    }

    pub fn scope(&self) -> &ScopeRef {
        &self.scope
    }

    pub fn find_var(&self, name: &str) -> Value {
        self.scope.get_var(name).unwrap_or(Value::Null)
    }

    pub fn set_var(&self, name: impl Into<String>, value: Value) {
        self.scope.set_var(name, value);
    }

    pub fn has_var(&self, name: &str) -> bool {
        self.scope.has_var(name)
    }

    pub fn find_class(&self, name: &str) -> Option<Rc<Class>> {
        self.classes.get(name).cloned()
    }

    /// Find a variable holding a class instance.
    pub fn find_class_instance(&self, name: &str) -> Option<InstanceRef> {
        match self.scope.get_var(name) {
            Some(Value::Instance(handle)) => Some(handle),
            _ => None,
        }
    }

    pub fn error_collector(&self) -> &ErrorCollector {
        &self.collector
    }

    pub fn error_collector_mut(&mut self) -> &mut ErrorCollector {
        &mut self.collector
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    pub fn has_errors(&self) -> bool {
        self.collector.has_errors()
    }

    /// Report a runtime error with the current stack trace attached.
    pub fn report_runtime(&mut self, message: &str, line: u32, column: u32, length: u32) {
        self.collector
            .report_runtime(message, &self.call_stack, line, column, length);
    }

    pub(crate) fn take_return(&mut self) -> Value {
        self.has_return = false;
        std::mem::take(&mut self.return_value)
    }

    // ── Program execution ──────────────────────────────────────────────

    /// Register the program's classes and enums, then execute its top-level
    /// block. Static singletons persist across runs.
    pub fn run(&mut self, program: &Program) {
        for cls in &program.classes {
            self.classes
                .insert(cls.name.clone(), Rc::new(cls.clone()));
        }
        for def in &program.enums {
            self.enums.insert(def.name.clone(), Rc::new(def.clone()));
        }

        self.execute_block(&program.code);
        self.has_return = false;
    }

    /// Execute a block, stopping early when a `return` fires.
    pub(crate) fn execute_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.execute_stmt(stmt);
            if self.has_return {
                break;
            }
        }
    }

    fn execute_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(decl) => self.execute_var_decl(decl),
            Stmt::InstanceDecl(decl) => self.execute_instance_decl(decl),
            Stmt::Assign(assign) => self.execute_assign(assign),
            Stmt::MemberAssign(assign) => self.execute_member_assign(assign),
            Stmt::MethodCall(call) => self.execute_method_call(call),
            Stmt::Call(call) => self.execute_call(call),
            Stmt::Increment(inc) => self.execute_increment(inc),
            Stmt::Return(ret) => self.execute_return(ret),
            Stmt::If(stmt) => self.execute_if(stmt),
            Stmt::For(stmt) => self.execute_for(stmt),
            Stmt::While(stmt) => self.execute_while(stmt),
        }
    }

    // ── Declarations and assignment ────────────────────────────────────

    fn execute_var_decl(&mut self, decl: &VarDecl) {
        let value = match &decl.init {
            Some(init) => {
                let value = self.eval_expr(init);
                self.coerce(value, decl.kind)
            }
            None => self.default_value(decl.kind),
        };
        self.scope.set_var(decl.name.clone(), value);
    }

    fn execute_instance_decl(&mut self, decl: &InstanceDecl) {
        match &decl.init {
            // `Box b;` -- uninitialized declaration binds null.
            InstanceInit::None => {
                self.scope.set_var(decl.name.clone(), Value::Null);
            }
            InstanceInit::New(arg_exprs) => {
                let Some(class) = self.classes.get(&decl.class_name).cloned() else {
                    self.report_runtime(
                        &format!("class not found: {}", decl.class_name),
                        decl.line,
                        0,
                        0,
                    );
                    return;
                };

                // Pair declared type parameters with the declaration's
                // concrete arguments; the mapping lives on the instance.
                let mut type_args: FxHashMap<String, String> = FxHashMap::default();
                if class.is_generic() && !decl.type_args.is_empty() {
                    for (param, arg) in class.type_params.iter().zip(&decl.type_args) {
                        type_args.insert(param.clone(), arg.clone());
                    }
                }

                let args: Vec<Value> =
                    arg_exprs.iter().map(|expr| self.eval_expr(expr)).collect();

                if let Some(instance) =
                    self.create_instance_with_type_args(&decl.class_name, &args, &type_args)
                {
                    self.scope
                        .set_var(decl.name.clone(), Value::Instance(instance));
                }
            }
            InstanceInit::Expr(init) => {
                let value = self.eval_expr(init);
                self.scope.set_var(decl.name.clone(), value);
            }
        }
    }

    fn execute_assign(&mut self, assign: &Assign) {
        if assign.index.is_some() {
            // Indexed writes are parsed but carry no storage semantics in
            // the tree-walking core; the value lands on the bare name.
            let context = self.call_stack.current_context();
            self.collector.report(
                Severity::Warning,
                format!("index expression ignored in assignment to '{}'", assign.name),
                assign.line,
                0,
                0,
                "runtime",
                &context,
            );
        }

        let value = self.eval_expr(&assign.value);

        if self.scope.has_var(&assign.name) {
            self.scope.set_var(assign.name.clone(), value);
        } else {
            self.report_runtime(
                &format!("variable '{}' not declared", assign.name),
                assign.line,
                0,
                0,
            );
        }
    }

    fn execute_member_assign(&mut self, assign: &MemberAssign) {
        let parts: Vec<&str> = assign.member_path.split('.').collect();
        if parts.is_empty() {
            return;
        }

        let Some(receiver) = self.lookup_receiver(&assign.instance) else {
            self.report_runtime(
                &format!("unknown variable '{}'", assign.instance),
                assign.line,
                0,
                0,
            );
            return;
        };
        let Some(instance) = receiver.as_instance().cloned() else {
            self.report_runtime(
                &format!("'{}' is not a class instance", assign.instance),
                assign.line,
                0,
                0,
            );
            return;
        };

        let Some(target) = self.traverse_nested(instance, &parts[..parts.len() - 1]) else {
            return;
        };
        let final_name = parts[parts.len() - 1];

        let value = self.eval_expr(&assign.value);
        let primitive = match value {
            Value::Instance(_) => Value::Null,
            other => other,
        };
        target
            .borrow_mut()
            .set_field(final_name.to_owned(), primitive.clone());

        // When the mutated instance is the active `this`, the local shadow
        // must follow, or the write-back at method exit would resurrect the
        // old value.
        if let Some(Value::Instance(this_instance)) = self.scope.get_var("__this__") {
            if Rc::ptr_eq(&this_instance, &target) && self.scope.has_local_var(final_name) {
                self.scope.set_var(final_name.to_owned(), primitive);
            }
        }
    }

    // ── Calls ──────────────────────────────────────────────────────────

    fn execute_method_call(&mut self, call: &MethodCall) {
        if call.instance_path == "super" {
            self.execute_super_call(call);
            return;
        }

        let parts: Vec<&str> = call.instance_path.split('.').collect();

        let Some(receiver) = self.lookup_receiver(parts[0]) else {
            self.report_runtime(
                &format!("unknown variable '{}'", parts[0]),
                call.line,
                0,
                0,
            );
            return;
        };
        let Some(instance) = receiver.as_instance().cloned() else {
            self.report_runtime(
                &format!("'{}' is not a class instance", parts[0]),
                call.line,
                0,
                0,
            );
            return;
        };

        let Some(target) = self.traverse_nested(instance, &parts[1..]) else {
            return;
        };

        let args: Vec<Value> = call.args.iter().map(|expr| self.eval_expr(expr)).collect();

        let class = target.borrow().class().clone();
        let type_args = target.borrow().type_args().clone();
        let Some((method_class, idx)) = self.find_method(&class, &call.method, &args, &type_args)
        else {
            self.report_runtime(
                &format!(
                    "method '{}' not found in class '{}' matching arguments",
                    call.method, class.name
                ),
                call.line,
                0,
                0,
            );
            return;
        };

        self.execute_method(&method_class, idx, &target, &args);
        // a statement-position call discards the callee's return value
        self.has_return = false;
    }

    /// `super::Method(args)`: the receiver is the active `this`; lookup
    /// starts at the parent class, skipping the instance's own class.
    fn execute_super_call(&mut self, call: &MethodCall) {
        let Some(Value::Instance(instance)) = self.scope.get_var("__this__") else {
            self.report_runtime("'super' used outside of a method", call.line, 0, 0);
            return;
        };

        let class = instance.borrow().class().clone();
        let Some(parent_name) = class.parent.clone() else {
            self.report_runtime(
                &format!("class '{}' has no parent for 'super'", class.name),
                call.line,
                0,
                0,
            );
            return;
        };
        let Some(parent) = self.classes.get(&parent_name).cloned() else {
            self.report_runtime(
                &format!("parent class not found: {}", parent_name),
                call.line,
                0,
                0,
            );
            return;
        };

        let args: Vec<Value> = call.args.iter().map(|expr| self.eval_expr(expr)).collect();
        let type_args = instance.borrow().type_args().clone();

        let Some((method_class, idx)) = self.find_method(&parent, &call.method, &args, &type_args)
        else {
            self.report_runtime(
                &format!(
                    "method '{}' not found in class '{}' matching arguments",
                    call.method, parent_name
                ),
                call.line,
                0,
                0,
            );
            return;
        };

        self.execute_method(&method_class, idx, &instance, &args);
        self.has_return = false;
    }

    /// A bare `Name(args)` statement: native function first, then a method
    /// on the implicit receiver.
    fn execute_call(&mut self, call: &Call) {
        let args: Vec<Value> = call.args.iter().map(|expr| self.eval_expr(expr)).collect();

        if let Some(func) = self.scope.find_native(&call.name) {
            func(&args);
            return;
        }

        if let Some(Value::Instance(this_instance)) = self.scope.get_var("__this__") {
            let class = this_instance.borrow().class().clone();
            let type_args = this_instance.borrow().type_args().clone();
            if let Some((method_class, idx)) =
                self.find_method(&class, &call.name, &args, &type_args)
            {
                self.execute_method(&method_class, idx, &this_instance, &args);
                self.has_return = false;
                return;
            }
            self.report_runtime(
                &format!("unknown function or method: {}", call.name),
                call.line,
                0,
                0,
            );
            return;
        }

        self.report_runtime(
            &format!("unknown function or statement: {}", call.name),
            call.line,
            0,
            0,
        );
    }

    // ── Simple statements ──────────────────────────────────────────────

    fn execute_increment(&mut self, inc: &Increment) {
        let Some(current) = self.scope.get_var(&inc.name) else {
            self.report_runtime(
                &format!("unknown variable '{}'", inc.name),
                inc.line,
                0,
                0,
            );
            return;
        };

        let delta: i64 = if inc.is_increment { 1 } else { -1 };
        let updated = match current {
            Value::I32(v) => Value::I32(v + delta as i32),
            Value::I64(v) => Value::I64(v + delta),
            Value::F32(v) => Value::F32(v + delta as f32),
            Value::F64(v) => Value::F64(v + delta as f64),
            _ => {
                self.report_runtime(
                    &format!(
                        "cannot increment or decrement variable '{}' of non-numeric type",
                        inc.name
                    ),
                    inc.line,
                    0,
                    0,
                );
                return;
            }
        };
        self.scope.set_var(inc.name.clone(), updated);
    }

    fn execute_return(&mut self, ret: &Return) {
        self.return_value = match &ret.value {
            Some(expr) => self.eval_expr(expr),
            None => Value::Null,
        };
        self.has_return = true;
    }

    // ── Control flow ───────────────────────────────────────────────────

    fn execute_if(&mut self, stmt: &If) {
        let cond = self.eval_expr(&stmt.cond);
        if cond.to_bool() {
            self.execute_block(&stmt.then_block);
            return;
        }

        for (cond, block) in &stmt.else_ifs {
            let value = self.eval_expr(cond);
            if value.to_bool() {
                self.execute_block(block);
                return;
            }
        }

        if let Some(block) = &stmt.else_block {
            self.execute_block(block);
        }
    }

    fn execute_for(&mut self, stmt: &For) {
        // Bounds and step are evaluated once, up front.
        let mut start = self.eval_expr(&stmt.start);
        let end = self.eval_expr(&stmt.end);
        let step = match &stmt.step {
            Some(expr) => self.eval_expr(expr),
            None => Value::I32(1),
        };

        if let Some(kind) = stmt.var_kind {
            start = self.coerce(start, kind);
        }

        self.scope.set_var(stmt.var.clone(), start);

        let end_f = end.to_f64();
        let step_f = step.to_f64();

        loop {
            let current = self.scope.get_var(&stmt.var).unwrap_or(Value::Null);
            let current_f = current.to_f64();

            let condition = if step_f >= 0.0 {
                current_f <= end_f
            } else {
                current_f >= end_f
            };
            if !condition {
                break;
            }

            self.execute_block(&stmt.body);
            if self.has_return {
                break;
            }

            let current = self.scope.get_var(&stmt.var).unwrap_or(Value::Null);
            let next = match stmt.var_kind {
                Some(TokenKind::Float32) => Value::F32((current.to_f64() + step_f) as f32),
                Some(TokenKind::Float64) => Value::F64(current.to_f64() + step_f),
                Some(TokenKind::Int64) => Value::I64((current.to_f64() + step_f) as i64),
                Some(TokenKind::Int32) | Some(TokenKind::Short) => {
                    Value::I32((current.to_f64() + step_f) as i32)
                }
                Some(_) => Value::F64(current.to_f64() + step_f),
                None => match (&current, &step) {
                    (Value::I32(a), Value::I32(b)) => Value::I32(a + b),
                    (Value::I64(a), Value::I64(b)) => Value::I64(a + b),
                    _ => Value::F64(current.to_f64() + step_f),
                },
            };
            self.scope.set_var(stmt.var.clone(), next);
        }
    }

    fn execute_while(&mut self, stmt: &While) {
        let mut iterations: u64 = 0;

        loop {
            let cond = self.eval_expr(&stmt.cond);
            if !cond.to_bool() {
                break;
            }

            iterations += 1;
            if iterations > MAX_WHILE_ITERATIONS {
                let context = self.call_stack.current_context();
                self.collector.report(
                    Severity::Warning,
                    "while loop exceeded the maximum iteration count",
                    stmt.cond.line(),
                    0,
                    0,
                    "runtime",
                    &context,
                );
                break;
            }

            self.execute_block(&stmt.body);
            if self.has_return {
                break;
            }
        }
    }
}
