//! Parser integration tests using compact AST dumps and insta snapshots.

use insta::assert_snapshot;
use qlang_common::diag::ErrorCollector;
use qlang_parser::ast::{Block, InstanceInit, Program, Stmt};

fn parse_and_dump(source: &str) -> String {
    let mut collector = ErrorCollector::new();
    let parse = qlang_parser::parse(source, &mut collector);
    let mut out = dump_program(&parse.program);
    if collector.has_any_issues() {
        out.push_str("diagnostics:\n");
        for diag in collector.diagnostics() {
            out.push_str(&format!("  {}\n", diag.to_line()));
        }
    }
    out
}

fn dump_program(program: &Program) -> String {
    let mut out = String::new();
    for import in &program.imports {
        out.push_str(&format!("import {}\n", import));
    }
    for def in &program.enums {
        out.push_str(&format!("enum {}", def.name));
        let members: Vec<String> = def
            .members
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        out.push_str(&format!(" [{}]\n", members.join(" ")));
    }
    for cls in &program.classes {
        out.push_str(&format!("class {}", cls.name));
        if let Some(parent) = &cls.parent {
            out.push_str(&format!(" : {}", parent));
        }
        if !cls.type_params.is_empty() {
            out.push_str(&format!("<{}>", cls.type_params.join(",")));
        }
        if cls.is_static {
            out.push_str(" static");
        }
        out.push('\n');
        for member in &cls.members {
            out.push_str(&format!(
                "  member {} {}{}\n",
                member.type_name,
                member.name,
                if member.init.is_some() { " = <expr>" } else { "" }
            ));
        }
        for method in &cls.methods {
            let params: Vec<String> = method
                .params
                .iter()
                .map(|p| format!("{} {}", p.type_name, p.name))
                .collect();
            out.push_str(&format!(
                "  method {} {}({})\n",
                method.return_type_name,
                method.name,
                params.join(", ")
            ));
            dump_block(&method.body, 2, &mut out);
        }
    }
    dump_block(&program.code, 0, &mut out);
    out
}

fn dump_block(block: &Block, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    for stmt in &block.stmts {
        match stmt {
            Stmt::VarDecl(decl) => {
                out.push_str(&format!(
                    "{}var {} {}{}\n",
                    pad,
                    decl.type_name,
                    decl.name,
                    if decl.init.is_some() { " = <expr>" } else { "" }
                ));
            }
            Stmt::InstanceDecl(decl) => {
                let init = match &decl.init {
                    InstanceInit::None => "null",
                    InstanceInit::New(_) => "new",
                    InstanceInit::Expr(_) => "<expr>",
                };
                out.push_str(&format!(
                    "{}instance {} {} = {}\n",
                    pad, decl.class_name, decl.name, init
                ));
            }
            Stmt::Assign(assign) => {
                out.push_str(&format!("{}assign {}\n", pad, assign.name));
            }
            Stmt::MemberAssign(assign) => {
                out.push_str(&format!(
                    "{}member-assign {}.{}\n",
                    pad, assign.instance, assign.member_path
                ));
            }
            Stmt::MethodCall(call) => {
                out.push_str(&format!(
                    "{}method-call {}.{}/{}\n",
                    pad,
                    call.instance_path,
                    call.method,
                    call.args.len()
                ));
            }
            Stmt::Call(call) => {
                out.push_str(&format!("{}call {}/{}\n", pad, call.name, call.args.len()));
            }
            Stmt::Increment(inc) => {
                out.push_str(&format!(
                    "{}{} {}\n",
                    pad,
                    if inc.is_increment { "inc" } else { "dec" },
                    inc.name
                ));
            }
            Stmt::Return(ret) => {
                out.push_str(&format!(
                    "{}return{}\n",
                    pad,
                    if ret.value.is_some() { " <expr>" } else { "" }
                ));
            }
            Stmt::If(stmt) => {
                out.push_str(&format!("{}if\n", pad));
                dump_block(&stmt.then_block, indent + 1, out);
                for (_, block) in &stmt.else_ifs {
                    out.push_str(&format!("{}elseif\n", pad));
                    dump_block(block, indent + 1, out);
                }
                if let Some(block) = &stmt.else_block {
                    out.push_str(&format!("{}else\n", pad));
                    dump_block(block, indent + 1, out);
                }
            }
            Stmt::For(stmt) => {
                out.push_str(&format!(
                    "{}for {}{}\n",
                    pad,
                    stmt.var,
                    if stmt.step.is_some() { " step" } else { "" }
                ));
                dump_block(&stmt.body, indent + 1, out);
            }
            Stmt::While(stmt) => {
                out.push_str(&format!("{}while\n", pad));
                dump_block(&stmt.body, indent + 1, out);
            }
        }
    }
}

#[test]
fn snapshot_point_example() {
    let source = "\
import MathLib
class Vec3
  float32 x; float32 y; float32 z;
  method Vec3 Vec3(float32 x, float32 y, float32 z)
    this.x = x; this.y = y; this.z = z;
  end
  method float32 Length()
    return Math.Sqrt(x*x + y*y + z*z);
  end
end
class Point(Vec3)
  string name = \"p\";
end
Point p = new Point(1.0, 2.0, 3.0);
for int32 i = 0 to 9 : 1
  Log(i, p.name, p.Length());
next
";
    assert_snapshot!(parse_and_dump(source), @r"
    import MathLib
    class Vec3
      member float32 x
      member float32 y
      member float32 z
      method Vec3 Vec3(float32 x, float32 y, float32 z)
        member-assign this.x
        member-assign this.y
        member-assign this.z
      method float32 Length()
        return <expr>
    class Point : Vec3
      member string name = <expr>
    instance Point p = new
    for i step
      call Log/3
    ");
}

#[test]
fn snapshot_control_flow() {
    let source = "\
int32 n = 3;
if n > 2
  n = 1;
elseif n > 1
  n = 2;
else
  n = 3;
end
while n < 10
  n++;
wend
";
    assert_snapshot!(parse_and_dump(source), @r"
    var int32 n = <expr>
    if
      assign n
    elseif
      assign n
    else
      assign n
    while
      inc n
    ");
}

#[test]
fn snapshot_enum_and_static_class() {
    let source = "\
enum Mode
  Off
  On = 5
end
static class Console
  method Write(string msg)
  end
end
";
    assert_snapshot!(parse_and_dump(source), @r"
    enum Mode [Off=0 On=5]
    class Console static
      method void Write(string msg)
    ");
}

#[test]
fn snapshot_error_recovery() {
    let source = "int32 a = 1;\nfoo\nint32 b = 2;\n";
    assert_snapshot!(parse_and_dump(source), @r"
    var int32 a = <expr>
    call foo/0
    var int32 b = <expr>
    diagnostics:
      [Error] Line 2:4 - Expected '(' after function or method name 'foo'
    ");
}
