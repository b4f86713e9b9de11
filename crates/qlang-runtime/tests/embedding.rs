//! Host embedding surface: variables, classes, instances, and method calls
//! driven from the host side after a run.

use qlang_common::diag::ErrorCollector;
use qlang_runtime::{Runner, Value};

fn runner_for(source: &str) -> Runner {
    let mut collector = ErrorCollector::new();
    let parse = qlang_parser::parse(source, &mut collector);
    let mut runner = Runner::new(collector);
    runner.run(&parse.program);
    runner
}

const SHIP: &str = "\
class Ship
  int32 hull = 100;
  string name = \"unnamed\";
  method Damage(int32 amount)
    hull = hull - amount;
  end
  method int32 Hull()
    return hull;
  end
end
Ship flagship = new Ship();
";

#[test]
fn find_set_has_var() {
    let runner = runner_for("int32 a = 5;\n");
    assert!(runner.has_var("a"));
    assert_eq!(runner.find_var("a"), Value::I32(5));
    assert_eq!(runner.find_var("missing"), Value::Null);

    runner.set_var("b", Value::Str("from host".into()));
    assert_eq!(runner.find_var("b"), Value::Str("from host".into()));
}

#[test]
fn find_class_and_instance() {
    let runner = runner_for(SHIP);
    let class = runner.find_class("Ship").expect("class should be registered");
    assert_eq!(class.name, "Ship");
    assert!(runner.find_class("Ghost").is_none());

    let instance = runner
        .find_class_instance("flagship")
        .expect("flagship should be an instance");
    assert_eq!(instance.borrow().class_name(), "Ship");
    assert_eq!(instance.borrow().get_field("hull"), Some(Value::I32(100)));

    // a non-instance variable is not an instance
    let runner = runner_for("int32 a = 1;\n");
    assert!(runner.find_class_instance("a").is_none());
}

#[test]
fn host_create_instance_and_call_method() {
    let mut runner = runner_for(SHIP);

    let ship = runner
        .create_instance("Ship", &[])
        .expect("construction should succeed");
    assert_eq!(ship.borrow().get_field("hull"), Some(Value::I32(100)));

    runner.call_method(&ship, "Damage", &[Value::I32(30)]);
    let hull = runner.call_method(&ship, "Hull", &[]);
    assert_eq!(hull, Value::I32(70));
}

#[test]
fn host_create_instance_unknown_class_reports() {
    let mut runner = runner_for("");
    assert!(runner.create_instance("Ghost", &[]).is_none());
    assert!(runner
        .error_collector()
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("class not found: Ghost")));
}

#[test]
fn call_method_with_no_matching_overload_reports() {
    let mut runner = runner_for(SHIP);
    let ship = runner.create_instance("Ship", &[]).unwrap();
    let result = runner.call_method(&ship, "Damage", &[Value::I32(1), Value::I32(2)]);
    assert_eq!(result, Value::Null);
    assert!(runner
        .error_collector()
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("method 'Damage' not found")));
}

#[test]
fn call_stack_is_empty_between_calls() {
    let mut runner = runner_for(SHIP);
    assert!(runner.call_stack().is_empty());
    let ship = runner.create_instance("Ship", &[]).unwrap();
    runner.call_method(&ship, "Damage", &[Value::I32(5)]);
    assert!(runner.call_stack().is_empty());
}

#[test]
fn runtime_diagnostics_carry_stack_context() {
    let source = "\
class T
  method Go()
    Missing();
  end
end
T t = new T();
t.Go();
";
    let runner = runner_for(source);
    let diag = runner
        .error_collector()
        .diagnostics()
        .iter()
        .find(|d| d.message.contains("unknown function or method"))
        .expect("expected a runtime diagnostic");
    assert_eq!(diag.origin, "runtime");
    assert!(diag.message.contains("Stack trace:"));
    assert!(diag.context.contains("T.Go()"));
}

#[test]
fn error_counters_accumulate_until_cleared() {
    let mut runner = runner_for("int32 a = ghost;\nint32 b = phantom;\n");
    assert_eq!(runner.error_collector().error_count(), 2);
    assert!(runner.has_errors());
    runner.error_collector_mut().clear_errors();
    assert_eq!(runner.error_collector().error_count(), 0);
    assert!(!runner.has_errors());
}

#[test]
fn statics_persist_across_runs() {
    let source = "\
static class Registry
  int32 hits;
  method Touch()
    hits = hits + 1;
  end
end
Registry.Touch();
";
    let mut collector = ErrorCollector::new();
    let parse = qlang_parser::parse(source, &mut collector);
    let mut runner = Runner::new(collector);
    runner.run(&parse.program);
    runner.run(&parse.program);

    // the singleton survived both runs
    let mut check_collector = ErrorCollector::new();
    let check = qlang_parser::parse("int32 n = Registry.hits;\n", &mut check_collector);
    runner.run(&check.program);
    assert_eq!(runner.find_var("n"), Value::I32(2));
}
