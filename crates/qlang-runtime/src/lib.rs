//! QLang runtime: scoped environments, class instances, and the
//! tree-walking evaluator.
//!
//! The typical host flow:
//!
//! ```ignore
//! let mut collector = ErrorCollector::new();
//! let parse = qlang_parser::parse(source, &mut collector);
//! let mut runner = Runner::new(collector);
//! runner.register_native_function("Log", |args| { /* ... */ Value::Null });
//! runner.run(&parse.program);
//! let result = runner.find_var("result");
//! ```
//!
//! A fatal diagnostic or an unresolved name terminates the current run but
//! never the host process; everything lands in the runner's collector.

mod eval;
pub mod instance;
pub mod scope;
pub mod value;

pub use eval::Runner;
pub use instance::{ClassInstance, InstanceRef};
pub use scope::{NativeFn, ScopeRef};
pub use value::Value;
