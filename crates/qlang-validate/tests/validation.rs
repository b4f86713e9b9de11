//! Integration tests: parse + validate whole programs and check the
//! diagnostics that come out the other end.

use qlang_common::diag::ErrorCollector;
use qlang_validate::{diagnostics::render_all, validate, Validator};

fn run(source: &str) -> ErrorCollector {
    let mut collector = ErrorCollector::new();
    let parse = qlang_parser::parse(source, &mut collector);
    validate(&parse.program, &mut collector);
    collector
}

#[test]
fn full_program_passes_validation() {
    let source = "\
class Vec3
  float32 x; float32 y; float32 z;
  method Vec3 Vec3(float32 a, float32 b, float32 c)
    this.x = a; this.y = b; this.z = c;
  end
  method float32 SumXY()
    return x + y;
  end
end
class Point(Vec3)
  string name = \"p\";
end
Point p = new Point(1.0, 2.0, 3.0);
";
    let collector = run(source);
    assert!(!collector.has_errors(), "{}", collector.list_errors(true));
}

#[test]
fn multiple_problems_all_surface() {
    let source = "\
class A(Missing)
  int32 x;
  int32 x;
  method int32 F(int32 p, int32 p)
  end
end
int q;
";
    let collector = run(source);
    let listing = collector.list_errors(false);
    assert!(listing.contains("Parent class 'Missing' not found"));
    assert!(listing.contains("Duplicate member 'x'"));
    assert!(listing.contains("Duplicate parameter 'p'"));
    assert!(listing.contains("Unknown type 'int'"));
    // missing-return on F is a warning on top of the errors
    assert!(listing.contains("may not return a value"));
    assert!(collector.error_count() >= 4);
}

#[test]
fn validator_context_names_class_and_method() {
    let source = "class A\n  method F()\n    q = 1;\n  end\nend\n";
    let collector = run(source);
    let offending = collector
        .diagnostics()
        .iter()
        .find(|d| d.message.contains("undefined variable"))
        .expect("expected an undefined-variable diagnostic");
    assert_eq!(offending.context, "A.F");
}

#[test]
fn known_classes_can_come_from_host() {
    let source = "class Player(Entity)\n  Entity target;\nend\n";
    let mut collector = ErrorCollector::new();
    let parse = qlang_parser::parse(source, &mut collector);
    let mut validator = Validator::new(&mut collector);
    validator.register_known_classes(["Entity", "Component"]);
    assert!(validator.validate(&parse.program));
}

#[test]
fn ariadne_rendering_covers_all_diagnostics() {
    let source = "class A(Missing)\nend\n";
    let collector = run(source);
    let rendered = render_all(collector.diagnostics(), source);
    assert!(rendered.contains("Parent class 'Missing' not found"));
}
