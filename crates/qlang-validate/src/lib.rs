//! Post-parse semantic validation for QLang.
//!
//! The validator cross-checks the AST after parsing: parent classes must
//! resolve, member and parameter names must be unique, declared types must
//! be known primitives or classes (with the common C-style shorthands
//! called out explicitly), and non-void methods should return on some path.
//! Everything routes through the shared diagnostic collector; validation
//! never mutates the AST.

pub mod diagnostics;

use rustc_hash::FxHashSet;

use qlang_common::diag::{ErrorCollector, Severity};
use qlang_parser::ast::{Block, Class, EnumDef, Method, Program, Stmt, VarDecl};

/// Primitive type names accepted in declarations.
const VALID_TYPES: &[&str] = &[
    "int32", "int64", "float32", "float64", "short", "string", "bool", "byte", "cptr", "iptr",
    "fptr", "bptr", "void",
];

/// Common shorthands from other languages, rejected with a dedicated check
/// so the unknown-type error fires even when a class of that name could
/// plausibly exist.
const SHORTHAND_TYPES: &[&str] = &["int", "float", "double", "long", "char"];

/// Semantic validator. Create one per program; host-known classes can be
/// registered up front so engine types resolve.
pub struct Validator<'a> {
    collector: &'a mut ErrorCollector,
    known_classes: FxHashSet<String>,
    declared_classes: FxHashSet<String>,
    declared_enums: FxHashSet<String>,
    scope_vars: FxHashSet<String>,
    class_members: FxHashSet<String>,
    type_params: Vec<String>,
    current_class: String,
    current_method: String,
    has_return: bool,
}

impl<'a> Validator<'a> {
    pub fn new(collector: &'a mut ErrorCollector) -> Self {
        Self {
            collector,
            known_classes: FxHashSet::default(),
            declared_classes: FxHashSet::default(),
            declared_enums: FxHashSet::default(),
            scope_vars: FxHashSet::default(),
            class_members: FxHashSet::default(),
            type_params: Vec::new(),
            current_class: String::new(),
            current_method: String::new(),
            has_return: false,
        }
    }

    /// Register a class supplied by the host (engine classes, previously
    /// compiled modules).
    pub fn register_known_class(&mut self, name: impl Into<String>) {
        self.known_classes.insert(name.into());
    }

    pub fn register_known_classes<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.register_known_class(name);
        }
    }

    /// Validate a whole program. Returns `true` when the collector holds no
    /// error-severity diagnostics afterwards.
    pub fn validate(&mut self, program: &Program) -> bool {
        // First pass: collect declared class and enum names so forward
        // references resolve.
        for cls in &program.classes {
            self.declared_classes.insert(cls.name.clone());
        }
        for def in &program.enums {
            self.declared_enums.insert(def.name.clone());
        }

        for def in &program.enums {
            self.validate_enum_members(def);
        }

        for cls in &program.classes {
            self.validate_class(cls);
        }

        self.current_class.clear();
        self.current_method.clear();
        self.scope_vars.clear();
        self.class_members.clear();
        self.validate_block(&program.code);

        !self.collector.has_errors()
    }

    // ── Declarations ───────────────────────────────────────────────────

    fn validate_enum_members(&mut self, def: &EnumDef) {
        let mut seen = FxHashSet::default();
        for (name, _) in &def.members {
            if !seen.insert(name.clone()) {
                self.error(
                    &format!("Duplicate enum member '{}' in enum '{}'", name, def.name),
                    0,
                );
            }
        }
    }

    fn validate_class(&mut self, cls: &Class) {
        self.current_class = cls.name.clone();
        self.class_members.clear();
        self.type_params = cls.type_params.clone();

        if let Some(parent) = &cls.parent {
            if !self.is_known_class(parent) {
                self.error(
                    &format!(
                        "Parent class '{}' not found for class '{}'",
                        parent, cls.name
                    ),
                    0,
                );
            }
        }

        for member in &cls.members {
            if self.class_members.contains(&member.name) {
                self.error(
                    &format!("Duplicate member '{}' in class '{}'", member.name, cls.name),
                    member.line,
                );
            }
            self.class_members.insert(member.name.clone());
            self.check_type_name(&member.type_name, &format!("member '{}'", member.name), member.line);
        }

        for method in &cls.methods {
            self.validate_method(method, &cls.name);
        }

        self.type_params.clear();
        self.current_class.clear();
    }

    fn validate_method(&mut self, method: &Method, class_name: &str) {
        self.current_method = method.name.clone();
        self.scope_vars.clear();
        self.has_return = false;

        if !method.return_type_name.is_empty() && method.return_type_name != "void" {
            self.check_type_name(
                &method.return_type_name,
                &format!("return type of method '{}'", method.name),
                method.line,
            );
        }

        let mut param_names: FxHashSet<String> = FxHashSet::default();
        for param in &method.params {
            if !param_names.insert(param.name.clone()) {
                self.error(
                    &format!(
                        "Duplicate parameter '{}' in method '{}'",
                        param.name, method.name
                    ),
                    method.line,
                );
            }
            self.scope_vars.insert(param.name.clone());
            self.check_type_name(
                &param.type_name,
                &format!("parameter '{}'", param.name),
                method.line,
            );
        }

        self.validate_block(&method.body);

        // Constructors (method named after the class) have no return
        // obligation; everyone else gets a warning, not an error.
        if !method.is_void() && !self.has_return && method.name != class_name {
            self.warn(
                &format!(
                    "Method '{}' may not return a value on all paths",
                    method.name
                ),
                method.line,
            );
        }

        self.current_method.clear();
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn validate_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.validate_stmt(stmt);
        }
    }

    fn validate_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(decl) => self.validate_var_decl(decl),
            Stmt::InstanceDecl(decl) => {
                if !self.is_known_class(&decl.class_name) {
                    self.error(
                        &format!(
                            "Unknown class type '{}' in instance declaration",
                            decl.class_name
                        ),
                        decl.line,
                    );
                }
                self.scope_vars.insert(decl.name.clone());
            }
            Stmt::Assign(assign) => {
                if !self.is_known_variable(&assign.name) && !self.class_members.contains(&assign.name) {
                    self.error(
                        &format!("Assignment to undefined variable: '{}'", assign.name),
                        assign.line,
                    );
                }
            }
            Stmt::MemberAssign(assign) => {
                if assign.instance != "this"
                    && !self.is_known_variable(&assign.instance)
                    && !self.class_members.contains(&assign.instance)
                {
                    self.error(
                        &format!(
                            "Member access on undefined instance: '{}'",
                            assign.instance
                        ),
                        assign.line,
                    );
                }
            }
            Stmt::MethodCall(call) => {
                // Only the chain head is checkable statically; nested
                // segments resolve through instances at runtime.
                let head = call.instance_path.split('.').next().unwrap_or("");
                if !head.is_empty()
                    && head != "this"
                    && head != "super"
                    && !self.is_known_variable(head)
                    && !self.class_members.contains(head)
                    && !self.is_known_class(head)
                {
                    self.error(
                        &format!("Method call on undefined instance: '{}'", head),
                        call.line,
                    );
                }
            }
            Stmt::Call(_) => {
                // Bare calls resolve against native functions and the
                // implicit receiver at runtime.
            }
            Stmt::Increment(inc) => {
                if !self.is_known_variable(&inc.name) && !self.class_members.contains(&inc.name) {
                    self.error(
                        &format!("Assignment to undefined variable: '{}'", inc.name),
                        inc.line,
                    );
                }
            }
            Stmt::Return(_) => {
                self.has_return = true;
            }
            Stmt::If(stmt) => {
                self.validate_block(&stmt.then_block);
                for (_, block) in &stmt.else_ifs {
                    self.validate_block(block);
                }
                if let Some(block) = &stmt.else_block {
                    self.validate_block(block);
                }
            }
            Stmt::For(stmt) => {
                self.scope_vars.insert(stmt.var.clone());
                self.validate_block(&stmt.body);
            }
            Stmt::While(stmt) => {
                self.validate_block(&stmt.body);
            }
        }
    }

    fn validate_var_decl(&mut self, decl: &VarDecl) {
        if self.scope_vars.contains(&decl.name) {
            self.warn(
                &format!("Variable '{}' shadows existing declaration", decl.name),
                decl.line,
            );
        }
        self.scope_vars.insert(decl.name.clone());
        self.check_type_name(&decl.type_name, &format!("variable '{}'", decl.name), decl.line);
    }

    // ── Helpers ────────────────────────────────────────────────────────

    /// A type name is acceptable when it is a primitive keyword, a generic
    /// parameter of the enclosing class, or a known class.
    fn check_type_name(&mut self, type_name: &str, what: &str, line: u32) {
        if type_name.is_empty() || VALID_TYPES.contains(&type_name) {
            return;
        }
        if self.type_params.iter().any(|p| p == type_name) {
            return;
        }
        if SHORTHAND_TYPES.contains(&type_name) {
            self.error(&format!("Unknown type '{}' for {}", type_name, what), line);
            return;
        }
        if !self.is_known_class(type_name) {
            self.error(&format!("Unknown type '{}' for {}", type_name, what), line);
        }
    }

    fn is_known_class(&self, name: &str) -> bool {
        self.known_classes.contains(name) || self.declared_classes.contains(name)
    }

    fn is_known_variable(&self, name: &str) -> bool {
        self.scope_vars.contains(name)
    }

    fn error(&mut self, message: &str, line: u32) {
        let context = self.context();
        self.collector
            .report(Severity::Error, message, line, 0, 0, "validator", &context);
    }

    fn warn(&mut self, message: &str, line: u32) {
        let context = self.context();
        self.collector
            .report(Severity::Warning, message, line, 0, 0, "validator", &context);
    }

    fn context(&self) -> String {
        match (self.current_class.is_empty(), self.current_method.is_empty()) {
            (false, false) => format!("{}.{}", self.current_class, self.current_method),
            (false, true) => self.current_class.clone(),
            _ => String::new(),
        }
    }
}

/// Convenience wrapper: validate with no host-registered classes.
pub fn validate(program: &Program, collector: &mut ErrorCollector) -> bool {
    Validator::new(collector).validate(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlang_common::diag::ErrorCollector;

    fn check(source: &str) -> ErrorCollector {
        let mut collector = ErrorCollector::new();
        let parse = qlang_parser::parse(source, &mut collector);
        validate(&parse.program, &mut collector);
        collector
    }

    fn messages(collector: &ErrorCollector) -> Vec<String> {
        collector
            .diagnostics()
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }

    #[test]
    fn clean_program_validates() {
        let collector = check(
            "class Box\n  int32 v;\n  method Box(int32 x)\n    this.v = x;\n  end\nend\nBox b = new Box(7);\n",
        );
        assert!(!collector.has_errors(), "{}", collector.list_errors(false));
    }

    #[test]
    fn unknown_parent_class_reported() {
        let collector = check("class Child(Ghost)\nend\n");
        assert!(messages(&collector)
            .iter()
            .any(|m| m.contains("Parent class 'Ghost' not found")));
    }

    #[test]
    fn duplicate_member_reported() {
        let collector = check("class A\n  int32 x;\n  int32 x;\nend\n");
        assert!(messages(&collector)
            .iter()
            .any(|m| m.contains("Duplicate member 'x'")));
    }

    #[test]
    fn duplicate_parameter_reported() {
        let collector = check("class A\n  method F(int32 a, int32 a)\n  end\nend\n");
        assert!(messages(&collector)
            .iter()
            .any(|m| m.contains("Duplicate parameter 'a'")));
    }

    #[test]
    fn shorthand_type_names_rejected() {
        let collector = check("int a;\n");
        assert!(messages(&collector)
            .iter()
            .any(|m| m.contains("Unknown type 'int'")));
        // `short` is the real keyword, not a shorthand
        let collector = check("short s;\n");
        assert!(!collector.has_errors());
    }

    #[test]
    fn missing_return_is_a_warning() {
        let collector = check("class A\n  method int32 F()\n  end\nend\n");
        assert!(!collector.has_errors());
        assert!(messages(&collector)
            .iter()
            .any(|m| m.contains("may not return a value")));
    }

    #[test]
    fn constructors_need_no_return() {
        let collector = check("class A\n  method A A()\n  end\nend\n");
        assert_eq!(collector.warning_count(), 0, "{}", collector.list_errors(false));
    }

    #[test]
    fn generic_member_types_are_known() {
        let collector = check("class Pair<K, V>\n  K first;\n  V second;\nend\n");
        assert!(!collector.has_errors(), "{}", collector.list_errors(false));
    }

    #[test]
    fn host_registered_classes_resolve() {
        let mut collector = ErrorCollector::new();
        let parse = qlang_parser::parse("class Child(Engine)\nend\n", &mut collector);
        let mut validator = Validator::new(&mut collector);
        validator.register_known_class("Engine");
        assert!(validator.validate(&parse.program));
    }

    #[test]
    fn assignment_to_undefined_variable_reported() {
        let collector = check("class A\n  method F()\n    q = 1;\n  end\nend\n");
        assert!(messages(&collector)
            .iter()
            .any(|m| m.contains("Assignment to undefined variable: 'q'")));
    }

    #[test]
    fn duplicate_enum_member_reported() {
        let collector = check("enum E\n  A\n  A\nend\n");
        assert!(messages(&collector)
            .iter()
            .any(|m| m.contains("Duplicate enum member 'A'")));
    }

    #[test]
    fn unknown_instance_class_reported() {
        let collector = check("Ghost g = new Ghost();\n");
        // the parser sees `Ghost g` as a declaration with unknown type
        assert!(collector.has_errors());
    }
}
