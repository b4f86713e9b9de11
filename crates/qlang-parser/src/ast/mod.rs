//! Typed AST for QLang.
//!
//! The tree is an owned tagged-variant hierarchy: a [`Program`] owns classes,
//! enums, and a top-level [`Block`]; statements are [`Stmt`] variants.
//! Expressions stay as flat token lists ([`expr::Expr`]) whose precedence is
//! resolved by the evaluator. The AST is immutable after parsing.

pub mod expr;
pub mod item;

use qlang_common::diag::ErrorCollector;
use qlang_common::token::TokenKind;
use serde::Serialize;

pub use expr::Expr;
pub use item::{Class, EnumDef, InstanceDecl, InstanceInit, Method, Param, VarDecl};

/// A parsed program: imports, classes, enums, and top-level code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Program {
    pub imports: Vec<String>,
    pub classes: Vec<Class>,
    pub enums: Vec<EnumDef>,
    pub code: Block,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post-parse hook: run expression pre-validation over every expression
    /// in the tree. Problems are reported, not fatal.
    pub fn check_for_errors(&self, collector: &mut ErrorCollector) {
        for cls in &self.classes {
            for member in &cls.members {
                if let Some(init) = &member.init {
                    init.check_for_errors(collector, &cls.name);
                }
            }
            for method in &cls.methods {
                let context = format!("{}.{}", cls.name, method.name);
                method.body.check_for_errors(collector, &context);
            }
        }
        self.code.check_for_errors(collector, "");
    }
}

/// An ordered statement container (`class`/`method`/`if`/`for`/`while`
/// bodies and the top-level code).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    fn check_for_errors(&self, collector: &mut ErrorCollector, context: &str) {
        for stmt in &self.stmts {
            stmt.check_for_errors(collector, context);
        }
    }
}

/// Every statement form the parser produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    VarDecl(VarDecl),
    InstanceDecl(InstanceDecl),
    Assign(Assign),
    MemberAssign(MemberAssign),
    MethodCall(MethodCall),
    Call(Call),
    Increment(Increment),
    Return(Return),
    If(If),
    For(For),
    While(While),
}

impl Stmt {
    fn check_for_errors(&self, collector: &mut ErrorCollector, context: &str) {
        match self {
            Stmt::VarDecl(decl) => {
                if let Some(init) = &decl.init {
                    init.check_for_errors(collector, context);
                }
            }
            Stmt::InstanceDecl(decl) => match &decl.init {
                InstanceInit::New(args) => {
                    for arg in args {
                        arg.check_for_errors(collector, context);
                    }
                }
                InstanceInit::Expr(expr) => expr.check_for_errors(collector, context),
                InstanceInit::None => {}
            },
            Stmt::Assign(assign) => {
                if let Some(index) = &assign.index {
                    index.check_for_errors(collector, context);
                }
                assign.value.check_for_errors(collector, context);
            }
            Stmt::MemberAssign(assign) => assign.value.check_for_errors(collector, context),
            Stmt::MethodCall(call) => {
                for arg in &call.args {
                    arg.check_for_errors(collector, context);
                }
            }
            Stmt::Call(call) => {
                for arg in &call.args {
                    arg.check_for_errors(collector, context);
                }
            }
            Stmt::Increment(_) => {}
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    value.check_for_errors(collector, context);
                }
            }
            Stmt::If(stmt) => {
                stmt.cond.check_for_errors(collector, context);
                stmt.then_block.check_for_errors(collector, context);
                for (cond, block) in &stmt.else_ifs {
                    cond.check_for_errors(collector, context);
                    block.check_for_errors(collector, context);
                }
                if let Some(block) = &stmt.else_block {
                    block.check_for_errors(collector, context);
                }
            }
            Stmt::For(stmt) => {
                stmt.start.check_for_errors(collector, context);
                stmt.end.check_for_errors(collector, context);
                if let Some(step) = &stmt.step {
                    step.check_for_errors(collector, context);
                }
                stmt.body.check_for_errors(collector, context);
            }
            Stmt::While(stmt) => {
                stmt.cond.check_for_errors(collector, context);
                stmt.body.check_for_errors(collector, context);
            }
        }
    }
}

/// Simple or indexed assignment: `name = expr` / `name[index] = expr`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assign {
    pub name: String,
    pub index: Option<Expr>,
    pub value: Expr,
    pub line: u32,
}

/// Member assignment through a dotted chain: the receiver variable plus a
/// member path whose last segment is the field actually mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberAssign {
    pub instance: String,
    pub member_path: String,
    pub value: Expr,
    pub line: u32,
}

/// Method call statement with a dotted instance path: `a.b.c.Method(args)`.
/// The receiver `"super"` routes lookup to the parent class chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodCall {
    pub instance_path: String,
    pub method: String,
    pub args: Vec<Expr>,
    pub line: u32,
}

/// Bare function-call statement: `Log(a, b)`. Resolves to a native function,
/// a method on the implicit receiver, or an implicit constructor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    pub line: u32,
}

/// `name++` / `name--`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Increment {
    pub name: String,
    pub is_increment: bool,
    pub line: u32,
}

/// `return [expr];`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Return {
    pub value: Option<Expr>,
    pub line: u32,
}

/// `if cond ... [elseif cond ...]* [else ...] end`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct If {
    pub cond: Expr,
    pub then_block: Block,
    pub else_ifs: Vec<(Expr, Block)>,
    pub else_block: Option<Block>,
}

/// `for [TYPE] var = start to end [: step] ... next`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct For {
    pub var: String,
    pub var_kind: Option<TokenKind>,
    pub start: Expr,
    pub end: Expr,
    pub step: Option<Expr>,
    pub body: Block,
}

/// `while cond ... wend`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct While {
    pub cond: Expr,
    pub body: Block,
}
