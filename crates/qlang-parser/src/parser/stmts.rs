//! Statement parsers: the block dispatcher and every statement form.

use qlang_common::diag::Severity;
use qlang_common::token::TokenKind;

use crate::ast::{
    Assign, Block, Expr, For, If, Increment, InstanceDecl, InstanceInit, MemberAssign, MethodCall,
    Return, Stmt, While, Call,
};

use super::Parser;

impl Parser<'_> {
    /// Parse statements until a block terminator: `end`, `elseif`, `else`,
    /// `next`, `wend`, or end-of-file. The terminator is left unconsumed.
    ///
    /// Classification of an identifier-led statement uses one token of
    /// lookahead, except for dotted chains which are resolved by the
    /// save/walk/restore protocol in [`Parser::classify_chain`].
    pub(crate) fn parse_block(&mut self) -> Block {
        let mut block = Block::new();

        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::End
                | TokenKind::ElseIf
                | TokenKind::Else
                | TokenKind::Next
                | TokenKind::Wend => break,

                TokenKind::If => {
                    if let Some(stmt) = self.parse_if() {
                        block.stmts.push(Stmt::If(stmt));
                    }
                }
                TokenKind::For => {
                    if let Some(stmt) = self.parse_for() {
                        block.stmts.push(Stmt::For(stmt));
                    }
                }
                TokenKind::While => {
                    if let Some(stmt) = self.parse_while() {
                        block.stmts.push(Stmt::While(stmt));
                    }
                }
                TokenKind::Return => {
                    block.stmts.push(Stmt::Return(self.parse_return()));
                }
                TokenKind::Super => {
                    if let Some(stmt) = self.parse_super_call() {
                        block.stmts.push(Stmt::MethodCall(stmt));
                    }
                }
                kind if kind.is_type_keyword() => {
                    if let Some(decl) = self.parse_variable_decl() {
                        block.stmts.push(Stmt::VarDecl(decl));
                    }
                }
                TokenKind::Ident
                    if self.is_class_name(&self.peek().text)
                        && self.peek_next().kind != TokenKind::Dot =>
                {
                    // `ClassName name ...` declares an instance;
                    // `ClassName.` is a static-class chain handled below.
                    if let Some(decl) = self.parse_instance_decl() {
                        block.stmts.push(Stmt::InstanceDecl(decl));
                    }
                }
                TokenKind::Ident | TokenKind::This => {
                    if let Some(stmt) = self.parse_ident_statement() {
                        block.stmts.push(stmt);
                    }
                }
                TokenKind::Eol => {
                    self.advance();
                }
                _ => {
                    let text = self.peek().text.clone();
                    self.report(&format!("Unexpected token '{}'", text));
                    self.advance();
                }
            }
        }

        block
    }

    /// Dispatch an identifier- or `this`-led statement by its second token.
    fn parse_ident_statement(&mut self) -> Option<Stmt> {
        let next_kind = self.peek_next().kind;
        let next_text = self.peek_next().text.clone();
        match next_kind {
            TokenKind::Dot => self.classify_chain(),
            TokenKind::LBracket => self.parse_assign().map(Stmt::Assign),
            TokenKind::Operator if next_text == "=" => self.parse_assign().map(Stmt::Assign),
            TokenKind::Operator if next_text == "++" || next_text == "--" => {
                self.parse_increment().map(Stmt::Increment)
            }
            TokenKind::Ident | TokenKind::Less if self.at(TokenKind::Ident) => {
                // `Type name` where Type is not (yet) a known class: treat as
                // a declaration and let the validator/runtime judge the type.
                self.parse_variable_decl().map(Stmt::VarDecl)
            }
            _ if self.at(TokenKind::Ident) => self.parse_call().map(Stmt::Call),
            _ => {
                // `this` followed by something other than '.'
                let text = self.peek().text.clone();
                self.report(&format!("Unexpected token '{}'", text));
                self.advance();
                None
            }
        }
    }

    /// Disambiguate `a.b.c...`: save the cursor, walk the chain, inspect the
    /// follower, restore, and parse the winning form. `(` means method call,
    /// `=` means member assignment; anything else is an error consuming one
    /// token.
    fn classify_chain(&mut self) -> Option<Stmt> {
        let saved = self.save();
        self.advance(); // first identifier (or `this`)

        while self.at(TokenKind::Dot) {
            self.advance();
            if !self.at(TokenKind::Ident) {
                self.restore(saved);
                self.report("expected identifier after '.'");
                self.advance();
                return None;
            }
            self.advance();
        }

        if self.at(TokenKind::LParen) {
            self.restore(saved);
            self.parse_method_call().map(Stmt::MethodCall)
        } else if self.at_op("=") {
            self.restore(saved);
            self.parse_member_assign().map(Stmt::MemberAssign)
        } else {
            self.restore(saved);
            self.report("expected '(' or '=' after member access chain");
            self.advance();
            None
        }
    }

    /// Parse `a.b.c.Method(args)` -- the chain minus its last segment is the
    /// instance path, the last segment the method name.
    pub(crate) fn parse_method_call(&mut self) -> Option<MethodCall> {
        let first = self.advance();
        let line = first.line;

        let mut parts = vec![first.text];
        while self.at(TokenKind::Dot) {
            self.advance();
            if !self.at(TokenKind::Ident) {
                self.report("expected identifier after '.'");
                return None;
            }
            parts.push(self.advance().text);
        }

        if parts.len() < 2 {
            self.report("incomplete method call");
            return None;
        }

        let method = parts.pop().unwrap_or_default();
        let instance_path = parts.join(".");

        let args = if self.at(TokenKind::LParen) {
            self.parse_arguments()
        } else {
            Vec::new()
        };

        self.eat(TokenKind::Eol);

        Some(MethodCall {
            instance_path,
            method,
            args,
            line,
        })
    }

    /// Parse `a.b.c.field = expr;` -- receiver variable plus the member path.
    pub(crate) fn parse_member_assign(&mut self) -> Option<MemberAssign> {
        let instance = self.advance();
        let line = instance.line;

        if !self.expect(TokenKind::Dot, "expected '.'") {
            return None;
        }
        if !self.at(TokenKind::Ident) {
            self.report("expected member name");
            return None;
        }

        let mut member_path = self.advance().text;
        while self.at(TokenKind::Dot) {
            self.advance();
            if !self.at(TokenKind::Ident) {
                self.report("expected member name after '.'");
                return None;
            }
            member_path.push('.');
            member_path.push_str(&self.advance().text);
        }

        if !self.at_op("=") {
            self.report("expected '='");
            return None;
        }
        self.advance();

        let value = self.parse_expression();
        self.eat(TokenKind::Eol);

        Some(MemberAssign {
            instance: instance.text,
            member_path,
            value,
            line,
        })
    }

    /// Parse `super::Method(args)` as a method call with receiver `super`.
    fn parse_super_call(&mut self) -> Option<MethodCall> {
        let super_token = self.advance();

        if !self.expect(TokenKind::Scope, "expected '::' after 'super'") {
            return None;
        }
        if !self.at(TokenKind::Ident) {
            self.report("expected method name after 'super::'");
            return None;
        }
        let method = self.advance();

        let args = if self.at(TokenKind::LParen) {
            self.parse_arguments()
        } else {
            Vec::new()
        };

        self.eat(TokenKind::Eol);

        Some(MethodCall {
            instance_path: "super".to_owned(),
            method: method.text,
            args,
            line: super_token.line,
        })
    }

    /// Parse `name = expr;` or `name[index] = expr;`.
    ///
    /// Assigning to a name that is neither a declared local nor a member of
    /// the enclosing class is a warning, not an error: the runtime still
    /// attempts the write.
    pub(crate) fn parse_assign(&mut self) -> Option<Assign> {
        let name = self.advance();
        let line = name.line;

        let index = if self.at(TokenKind::LBracket) {
            self.advance();
            let mut expr = Expr::new();
            let mut depth: u32 = 1;
            while !self.is_at_end() && depth > 0 {
                match self.peek().kind {
                    TokenKind::LBracket => {
                        depth += 1;
                        expr.push(self.advance());
                    }
                    TokenKind::RBracket => {
                        depth -= 1;
                        if depth > 0 {
                            expr.push(self.advance());
                        } else {
                            self.advance();
                        }
                    }
                    _ => expr.push(self.advance()),
                }
            }
            Some(expr)
        } else {
            None
        };

        if !self.at_op("=") {
            self.report("expected '='");
            return None;
        }
        self.advance();

        if !self.is_declared(&name.text) {
            self.report_severity(
                &format!("Undeclared variable '{}'", name.text),
                Severity::Warning,
            );
        }

        let value = self.parse_expression();
        self.eat(TokenKind::Eol);

        Some(Assign {
            name: name.text,
            index,
            value,
            line,
        })
    }

    /// Parse `name++;` / `name--;`.
    pub(crate) fn parse_increment(&mut self) -> Option<Increment> {
        let name = self.advance();

        if !self.at(TokenKind::Operator) {
            self.report("expected '++' or '--'");
            return None;
        }
        let op = self.advance();

        self.eat(TokenKind::Eol);

        Some(Increment {
            name: name.text,
            is_increment: op.text == "++",
            line: op.line,
        })
    }

    /// Parse `return [expr];`.
    pub(crate) fn parse_return(&mut self) -> Return {
        let ret = self.advance();

        let value = if !self.at(TokenKind::Eol) && !self.is_at_end() && !self.at(TokenKind::End) {
            Some(self.parse_expression())
        } else {
            None
        };

        self.eat(TokenKind::Eol);

        Return {
            value,
            line: ret.line,
        }
    }

    /// Parse a bare function-call statement `Name(args);`. Strict syntax:
    /// the parentheses are mandatory for anything that is not a declaration
    /// or assignment.
    pub(crate) fn parse_call(&mut self) -> Option<Call> {
        let name = self.advance();
        let line = name.line;

        let args = if self.at(TokenKind::LParen) {
            self.parse_arguments()
        } else {
            self.report(&format!(
                "Expected '(' after function or method name '{}'",
                name.text
            ));
            Vec::new()
        };

        self.eat(TokenKind::Eol);

        Some(Call {
            name: name.text,
            args,
            line,
        })
    }

    /// Parse `ClassName [<TypeArgs>] name [= new ClassName[<...>](args) | = expr];`.
    pub(crate) fn parse_instance_decl(&mut self) -> Option<InstanceDecl> {
        let class_token = self.advance();

        let type_args = if self.at(TokenKind::Less) {
            self.parse_type_arg_list()
        } else {
            Vec::new()
        };

        if !self.at(TokenKind::Ident) {
            self.report("expected instance name");
            return None;
        }
        let name_token = self.advance();
        self.declare_var(&name_token.text);

        let mut decl = InstanceDecl {
            class_name: class_token.text.clone(),
            name: name_token.text,
            type_args,
            init: InstanceInit::None,
            line: name_token.line,
        };

        // `Box b;` stays uninitialized and binds null.
        if self.eat(TokenKind::Eol) {
            return Some(decl);
        }

        if !self.at_op("=") {
            self.report("expected '=' or ';'");
            return None;
        }
        self.advance();

        if self.at(TokenKind::New) {
            self.advance();

            if self.at(TokenKind::Ident) {
                if self.peek().text != class_token.text {
                    self.report("constructor class name doesn't match");
                }
                self.advance();
            } else {
                self.report("expected class name after 'new'");
            }

            // Type arguments on the constructor side are allowed but the
            // declaration's list wins: `List<int32> xs = new List<int32>()`.
            if self.at(TokenKind::Less) {
                self.parse_type_arg_list();
            }

            let args = if self.at(TokenKind::LParen) {
                self.parse_arguments()
            } else {
                Vec::new()
            };
            decl.init = InstanceInit::New(args);
        } else {
            decl.init = InstanceInit::Expr(self.parse_expression());
        }

        self.eat(TokenKind::Eol);

        Some(decl)
    }

    /// Parse `< arg , ... >` where each arg is any single type token.
    fn parse_type_arg_list(&mut self) -> Vec<String> {
        let mut args = Vec::new();
        self.eat(TokenKind::Less);
        while !self.is_at_end() && !self.at(TokenKind::Greater) {
            args.push(self.advance().text);
            self.eat(TokenKind::Comma);
        }
        self.eat(TokenKind::Greater);
        args
    }

    /// Parse `if COND ... [elseif COND ...]* [else ...] end`.
    pub(crate) fn parse_if(&mut self) -> Option<If> {
        self.advance(); // 'if'

        let cond = self.parse_expression();
        let then_block = self.parse_block();

        let mut stmt = If {
            cond,
            then_block,
            else_ifs: Vec::new(),
            else_block: None,
        };

        while self.at(TokenKind::ElseIf) {
            self.advance();
            let cond = self.parse_expression();
            let block = self.parse_block();
            stmt.else_ifs.push((cond, block));
        }

        if self.eat(TokenKind::Else) {
            stmt.else_block = Some(self.parse_block());
        }

        self.expect(TokenKind::End, "Expected 'end' after if statement");

        Some(stmt)
    }

    /// Parse `for [TYPE] VAR = START to END [: STEP] ... next`.
    pub(crate) fn parse_for(&mut self) -> Option<For> {
        self.advance(); // 'for'

        let mut var_kind = None;
        if self.peek().kind.is_type_keyword() {
            let kind = self.peek().kind;
            if kind == TokenKind::Bool || kind == TokenKind::StringTy {
                let text = self.peek().text.clone();
                self.report(&format!("Illegal for loop type '{}'", text));
                self.recover_to_next_statement();
                return None;
            }
            var_kind = Some(kind);
            self.advance();
        }

        if !self.at(TokenKind::Ident) {
            self.report("expected variable name");
            self.recover_to_next_statement();
            return None;
        }
        let var = self.advance();
        self.declare_var(&var.text);

        if !self.at_op("=") {
            self.report("expected '='");
            self.recover_to_next_statement();
            return None;
        }
        self.advance();

        let start = self.parse_expression();

        if !self.expect(TokenKind::To, "expected 'to'") {
            self.recover_to_next_statement();
            return None;
        }

        let end = self.parse_expression();

        let step = if self.eat(TokenKind::Colon) {
            Some(self.parse_expression())
        } else {
            None
        };

        let body = self.parse_block();

        if !self.eat(TokenKind::Next) {
            self.report("expected 'next'");
        }

        Some(For {
            var: var.text,
            var_kind,
            start,
            end,
            step,
            body,
        })
    }

    /// Parse `while COND ... wend`.
    pub(crate) fn parse_while(&mut self) -> Option<While> {
        self.advance(); // 'while'

        let cond = self.parse_expression();
        if cond.is_empty() {
            self.report("expected expression");
        }

        let body = self.parse_block();

        if !self.eat(TokenKind::Wend) {
            self.report("expected 'wend'");
        }

        Some(While { cond, body })
    }
}

#[cfg(test)]
mod tests {
    use qlang_common::diag::ErrorCollector;
    use qlang_lexer::Lexer;

    use super::*;
    use crate::ast::Program;

    fn parse_source(source: &str) -> (Program, ErrorCollector) {
        let mut collector = ErrorCollector::new();
        let tokens = Lexer::tokenize_into(source, &mut collector);
        let mut parser = Parser::new(tokens, &mut collector);
        let program = parser.parse();
        (program, collector)
    }

    fn single_stmt(source: &str) -> Stmt {
        let (program, collector) = parse_source(source);
        assert!(
            !collector.has_errors(),
            "unexpected errors:\n{}",
            collector.list_errors(false)
        );
        assert_eq!(program.code.stmts.len(), 1, "expected exactly one statement");
        program.code.stmts.into_iter().next().unwrap()
    }

    #[test]
    fn var_decl_with_initializer() {
        let Stmt::VarDecl(decl) = single_stmt("int32 a = 2 + 3 * 4;") else {
            panic!("expected variable declaration");
        };
        assert_eq!(decl.name, "a");
        assert_eq!(decl.type_name, "int32");
        assert_eq!(decl.init.as_ref().map(|e| e.tokens.len()), Some(5));
    }

    #[test]
    fn simple_assignment() {
        let (program, collector) = parse_source("int32 a;\na = 5;\n");
        assert!(!collector.has_errors());
        assert!(matches!(program.code.stmts[1], Stmt::Assign(_)));
    }

    #[test]
    fn undeclared_assignment_warns() {
        let (_, collector) = parse_source("q = 5;\n");
        assert!(!collector.has_errors()); // warning, not error
        assert_eq!(collector.warning_count(), 1);
        assert!(collector.diagnostics()[0]
            .message
            .contains("Undeclared variable 'q'"));
    }

    #[test]
    fn indexed_assignment() {
        let (program, collector) = parse_source("int32 xs;\nxs[i + 1] = 5;\n");
        assert!(!collector.has_errors());
        let Stmt::Assign(assign) = &program.code.stmts[1] else {
            panic!("expected assignment");
        };
        assert_eq!(assign.index.as_ref().map(|e| e.tokens.len()), Some(3));
    }

    #[test]
    fn increment_and_decrement() {
        let (program, collector) = parse_source("int32 i;\ni++;\ni--;\n");
        assert!(!collector.has_errors());
        let Stmt::Increment(inc) = &program.code.stmts[1] else {
            panic!();
        };
        assert!(inc.is_increment);
        let Stmt::Increment(dec) = &program.code.stmts[2] else {
            panic!();
        };
        assert!(!dec.is_increment);
    }

    #[test]
    fn chained_method_call() {
        let Stmt::MethodCall(call) = single_stmt("t1.ot.Value(1, 2);") else {
            panic!("expected method call");
        };
        assert_eq!(call.instance_path, "t1.ot");
        assert_eq!(call.method, "Value");
        assert_eq!(call.args.len(), 2);
    }

    #[test]
    fn chained_member_assign() {
        let Stmt::MemberAssign(assign) = single_stmt("t1.ot.check = 50;") else {
            panic!("expected member assignment");
        };
        assert_eq!(assign.instance, "t1");
        assert_eq!(assign.member_path, "ot.check");
    }

    #[test]
    fn this_member_assign() {
        let Stmt::MemberAssign(assign) = single_stmt("this.x = 1;") else {
            panic!("expected member assignment");
        };
        assert_eq!(assign.instance, "this");
        assert_eq!(assign.member_path, "x");
    }

    #[test]
    fn chain_without_call_or_assign_is_error() {
        let (_, collector) = parse_source("a.b.c + 1;\n");
        assert!(collector.has_errors());
        assert!(collector.list_errors(false).contains("expected '(' or '='"));
    }

    #[test]
    fn bare_call_requires_parens() {
        let (_, collector) = parse_source("int32 foo;\nfoo\n");
        assert!(collector.has_errors());
        assert!(collector
            .list_errors(false)
            .contains("Expected '(' after function or method name 'foo'"));
    }

    #[test]
    fn function_call_statement() {
        let Stmt::Call(call) = single_stmt("Log(1, \"two\", 3.0);") else {
            panic!("expected call");
        };
        assert_eq!(call.name, "Log");
        assert_eq!(call.args.len(), 3);
    }

    #[test]
    fn instance_decl_forms() {
        let source = "\
class Box
end
Box a;
Box b = new Box();
Box c = new Box(1, 2);
Box d = new Box;
";
        let (program, collector) = parse_source(source);
        assert!(!collector.has_errors(), "{}", collector.list_errors(false));
        let stmts = &program.code.stmts;
        let Stmt::InstanceDecl(a) = &stmts[0] else { panic!() };
        assert_eq!(a.init, InstanceInit::None);
        let Stmt::InstanceDecl(b) = &stmts[1] else { panic!() };
        assert_eq!(b.init, InstanceInit::New(Vec::new()));
        let Stmt::InstanceDecl(c) = &stmts[2] else { panic!() };
        let InstanceInit::New(args) = &c.init else { panic!() };
        assert_eq!(args.len(), 2);
        let Stmt::InstanceDecl(d) = &stmts[3] else { panic!() };
        assert_eq!(d.init, InstanceInit::New(Vec::new()));
    }

    #[test]
    fn instance_decl_with_expression_initializer() {
        let source = "class Vec3\nend\nVec3 p = GetPosition();\n";
        let (program, collector) = parse_source(source);
        assert!(!collector.has_errors());
        let Stmt::InstanceDecl(decl) = &program.code.stmts[0] else {
            panic!();
        };
        assert!(matches!(decl.init, InstanceInit::Expr(_)));
    }

    #[test]
    fn generic_instance_decl() {
        let source = "class List<T>\nend\nList<int32> xs = new List<int32>();\n";
        let (program, collector) = parse_source(source);
        assert!(!collector.has_errors(), "{}", collector.list_errors(false));
        let Stmt::InstanceDecl(decl) = &program.code.stmts[0] else {
            panic!();
        };
        assert_eq!(decl.type_args, vec!["int32"]);
    }

    #[test]
    fn if_elseif_else_chain() {
        let source = "\
int32 a;
if a == 1
  a = 2;
elseif a == 2
  a = 3;
elseif a == 3
  a = 4;
else
  a = 5;
end
";
        let (program, collector) = parse_source(source);
        assert!(!collector.has_errors(), "{}", collector.list_errors(false));
        let Stmt::If(stmt) = &program.code.stmts[1] else {
            panic!();
        };
        assert_eq!(stmt.else_ifs.len(), 2);
        assert!(stmt.else_block.is_some());
    }

    #[test]
    fn for_with_type_and_step() {
        let Stmt::For(stmt) = single_stmt("for int32 i = 0 to 10 : 2\nnext") else {
            panic!();
        };
        assert_eq!(stmt.var, "i");
        assert_eq!(stmt.var_kind, Some(TokenKind::Int32));
        assert!(stmt.step.is_some());
    }

    #[test]
    fn for_rejects_bool_and_string_types() {
        let (_, collector) = parse_source("for bool i = 0 to 10\nnext\n");
        assert!(collector.has_errors());
        assert!(collector
            .list_errors(false)
            .contains("Illegal for loop type 'bool'"));
    }

    #[test]
    fn while_loop() {
        let Stmt::While(stmt) = single_stmt("while x < 10\nwend") else {
            panic!();
        };
        assert_eq!(stmt.cond.tokens.len(), 3);
    }

    #[test]
    fn return_with_and_without_value() {
        let (program, collector) = parse_source("class A\nmethod int32 F()\nreturn 5;\nend\nmethod G()\nreturn;\nend\nend\n");
        assert!(!collector.has_errors());
        let f = &program.classes[0].methods[0];
        let Stmt::Return(ret) = &f.body.stmts[0] else { panic!() };
        assert!(ret.value.is_some());
        let g = &program.classes[0].methods[1];
        let Stmt::Return(ret) = &g.body.stmts[0] else { panic!() };
        assert!(ret.value.is_none());
    }

    #[test]
    fn super_call_statement() {
        let source = "class A\nmethod Init()\nend\nend\nclass B(A)\nmethod Init()\nsuper::Init(1);\nend\nend\n";
        let (program, collector) = parse_source(source);
        assert!(!collector.has_errors(), "{}", collector.list_errors(false));
        let init = &program.classes[1].methods[0];
        let Stmt::MethodCall(call) = &init.body.stmts[0] else {
            panic!();
        };
        assert_eq!(call.instance_path, "super");
        assert_eq!(call.method, "Init");
        assert_eq!(call.args.len(), 1);
    }

    #[test]
    fn unexpected_token_reported_and_skipped() {
        let (_, collector) = parse_source("}\nint32 a;\n");
        assert!(collector.has_errors());
        assert!(collector.list_errors(false).contains("Unexpected token '}'"));
    }
}
