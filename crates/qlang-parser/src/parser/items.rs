//! Declaration parsers: classes, enums, methods, and member declarations.

use qlang_common::token::TokenKind;

use crate::ast::{Class, EnumDef, Method, Param, VarDecl};

use super::Parser;

impl Parser<'_> {
    /// Parse `class NAME [( PARENT )] [< T, U, ... >] body end`.
    ///
    /// The class name is registered *before* the body is parsed so members
    /// of the class's own type (`Node next`) classify correctly.
    pub(crate) fn parse_class(&mut self) -> Option<Class> {
        self.advance(); // 'class'

        if !self.at(TokenKind::Ident) {
            self.report("expected class name after 'class'");
            self.recover_to_next_statement();
            return None;
        }
        let name_token = self.advance();

        self.class_names.insert(name_token.text.clone());

        let previous_context = std::mem::replace(&mut self.context, name_token.text.clone());
        self.class_members.clear();

        let mut cls = Class::new(name_token.text);

        // Inheritance: class Name(Parent)
        if self.eat(TokenKind::LParen) {
            if self.at(TokenKind::Ident) {
                let parent = self.advance();
                // Parent resolution is deferred to instance construction so
                // children may precede their parents in the source.
                cls.parent = Some(parent.text);
            } else {
                self.report("expected parent class name after '('");
            }
            if !self.eat(TokenKind::RParen) {
                self.report("expected ')' after parent class name");
            }
        }

        // Generic type parameters: class Name<T, U>
        if self.at(TokenKind::Less) {
            cls.type_params = self.parse_type_param_list();
        }

        let previous_type_params =
            std::mem::replace(&mut self.type_params, cls.type_params.clone());

        while !self.is_at_end() && !self.at(TokenKind::End) {
            match self.peek().kind {
                TokenKind::Method => {
                    if let Some(method) = self.parse_method() {
                        cls.methods.push(method);
                    }
                }
                kind if kind.is_type_keyword() => {
                    if let Some(member) = self.parse_variable_decl() {
                        self.class_members.insert(member.name.clone());
                        cls.members.push(member);
                    }
                }
                TokenKind::Ident => {
                    let text = self.peek().text.clone();
                    let next = self.peek_next().kind;
                    if self.is_type_param(&text) {
                        // generic member: `T value;`
                        if let Some(member) = self.parse_variable_decl() {
                            self.class_members.insert(member.name.clone());
                            cls.members.push(member);
                        }
                    } else if self.is_class_name(&text)
                        || next == TokenKind::Ident
                        || next == TokenKind::Less
                    {
                        if let Some(member) = self.parse_class_type_member() {
                            self.class_members.insert(member.name.clone());
                            cls.members.push(member);
                        }
                    } else {
                        self.advance();
                    }
                }
                TokenKind::Eol => {
                    self.advance();
                }
                _ => {
                    // unknown token inside a class body
                    self.advance();
                }
            }
        }

        if !self.eat(TokenKind::End) {
            self.report("expected 'end' to close class");
            self.recover_to_next_statement();
        }

        self.type_params = previous_type_params;
        self.context = previous_context;

        Some(cls)
    }

    /// Parse `method [RETURN_TYPE] NAME ( PARAMS ) [virtual|override] body end`.
    pub(crate) fn parse_method(&mut self) -> Option<Method> {
        self.advance(); // 'method'

        let mut return_kind = TokenKind::Void;
        let mut return_type_name = "void".to_owned();

        // Return type: void, a primitive keyword, or a class identifier.
        // A class return type is only taken when another identifier (the
        // method name) follows, so `method Length()` keeps its name.
        if self.at(TokenKind::Void) || self.peek().kind.is_type_keyword() {
            let tok = self.advance();
            return_kind = tok.kind;
            return_type_name = tok.text;
        } else if self.at(TokenKind::Ident) && self.peek_next().kind == TokenKind::Ident {
            let tok = self.advance();
            return_kind = tok.kind;
            return_type_name = tok.text;
        }

        if !self.at(TokenKind::Ident) {
            self.report("expected method name");
            self.recover_to_next_statement();
            return None;
        }

        let name_token = self.advance();
        let start_line = name_token.line;

        let mut method = Method::new(name_token.text, start_line);
        method.return_kind = return_kind;
        method.return_type_name = return_type_name;

        let full_context = if self.context.is_empty() {
            method.name.clone()
        } else {
            format!("{}.{}", self.context, method.name)
        };
        let previous_context = std::mem::replace(&mut self.context, full_context.clone());

        // Parameters seed a fresh declared-variable scope.
        self.declared_vars.clear();

        if self.eat(TokenKind::LParen) {
            while !self.is_at_end() && !self.at(TokenKind::RParen) {
                if self.peek().kind.is_type_keyword() || self.at(TokenKind::Ident) {
                    let type_token = self.advance();
                    if self.at(TokenKind::Ident) {
                        let param_name = self.advance();
                        self.declare_var(&param_name.text);
                        method.params.push(Param {
                            kind: type_token.kind,
                            name: param_name.text,
                            type_name: type_token.text,
                        });
                    } else {
                        self.report("expected parameter name");
                    }
                } else {
                    self.report("expected parameter type");
                    self.advance();
                }
                self.eat(TokenKind::Comma);
            }
            self.eat(TokenKind::RParen);
        }

        if self.eat(TokenKind::Virtual) {
            method.is_virtual = true;
        } else if self.eat(TokenKind::Override) {
            method.is_override = true;
        }

        method.body = self.parse_block();

        if !self.eat(TokenKind::End) {
            self.report("expected 'end' to close method");
        }

        let end_line = self.previous().line;
        self.collector
            .register_context(full_context, start_line, end_line);

        self.context = previous_context;

        Some(method)
    }

    /// Parse `enum NAME` then members until `end`. Members are bare names
    /// (auto-increment from the previous value) or `NAME = INT`.
    pub(crate) fn parse_enum(&mut self) -> Option<EnumDef> {
        self.advance(); // 'enum'

        if !self.at(TokenKind::Ident) {
            self.report("expected enum name after 'enum'");
            self.recover_to_next_statement();
            return None;
        }
        let name_token = self.advance();
        let mut def = EnumDef::new(name_token.text);
        let mut next_value: i32 = 0;

        while !self.is_at_end() && !self.at(TokenKind::End) {
            match self.peek().kind {
                TokenKind::Ident => {
                    let member = self.advance();
                    let value = if self.at_op("=") {
                        self.advance();
                        if self.at(TokenKind::Int) {
                            let value_token = self.advance();
                            value_token.text.parse::<i32>().unwrap_or(next_value)
                        } else {
                            self.report("expected integer value for enum member");
                            next_value
                        }
                    } else {
                        next_value
                    };
                    next_value = value + 1;
                    def.members.push((member.text, value));
                }
                TokenKind::Eol | TokenKind::Comma => {
                    self.advance();
                }
                _ => {
                    self.report("unexpected token in enum body");
                    self.advance();
                }
            }
        }

        if !self.eat(TokenKind::End) {
            self.report("expected 'end' to close enum");
        }

        Some(def)
    }

    /// Parse a primitive/generic variable declaration:
    /// `TYPE [<T, ...>] NAME [= EXPR] ;`
    pub(crate) fn parse_variable_decl(&mut self) -> Option<VarDecl> {
        let type_token = self.advance();

        let type_params = if self.at(TokenKind::Less) {
            self.parse_type_param_list()
        } else {
            Vec::new()
        };

        if !self.at(TokenKind::Ident) {
            self.report(&format!(
                "Expected variable name (identifier) after type '{}'",
                type_token.text
            ));
            return None;
        }

        let name_token = self.advance();
        self.declare_var(&name_token.text);

        let mut decl = VarDecl {
            kind: type_token.kind,
            name: name_token.text,
            type_name: type_token.text,
            type_params,
            init: None,
            line: name_token.line,
        };

        if self.at_op("=") {
            self.advance();
            decl.init = Some(self.parse_expression());
        }

        if !self.eat(TokenKind::Eol) && !self.is_at_end() {
            self.report("Expected end of line (or ';') after variable declaration");
        }

        Some(decl)
    }

    /// Parse a class-typed member declaration inside a class body:
    /// `ClassName [<T, ...>] NAME [= EXPR] ;`
    ///
    /// The declaration carries `Ident` kind; the class name lives in
    /// `type_name`. The initializer (typically `new ClassName(...)`) stays
    /// an unparsed expression, interpreted at instance construction.
    pub(crate) fn parse_class_type_member(&mut self) -> Option<VarDecl> {
        let class_type_token = self.advance();

        let type_params = if self.at(TokenKind::Less) {
            self.parse_type_param_list()
        } else {
            Vec::new()
        };

        if !self.at(TokenKind::Ident) {
            self.report("expected member name");
            return None;
        }
        let name_token = self.advance();

        let mut member = VarDecl {
            kind: TokenKind::Ident,
            name: name_token.text,
            type_name: class_type_token.text,
            type_params,
            init: None,
            line: name_token.line,
        };

        if self.at_op("=") {
            self.advance();
            member.init = Some(self.parse_expression());
        }

        if !self.eat(TokenKind::Eol) && !self.is_at_end() {
            self.report("Expected end of line (or ';') after member declaration");
        }

        Some(member)
    }

    /// Parse `< NAME | TYPE_KEYWORD , ... >`, returning the collected names.
    pub(crate) fn parse_type_param_list(&mut self) -> Vec<String> {
        let mut params = Vec::new();
        self.eat(TokenKind::Less);

        while !self.is_at_end() && !self.at(TokenKind::Greater) {
            if self.at(TokenKind::Ident) || self.peek().kind.is_type_keyword() {
                params.push(self.advance().text);
            } else {
                self.report("Expected type parameter");
                self.advance();
            }
            self.eat(TokenKind::Comma);
        }

        if !self.eat(TokenKind::Greater) {
            self.report("Expected '>' to close type parameters");
        }

        params
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

    #[test]
    fn parse_class_with_members_and_methods() {
        let source = "\
class Vec3
  float32 x;
  float32 y;
  method Vec3 Vec3(float32 a, float32 b)
    this.x = a;
    this.y = b;
  end
  method float32 Sum()
    return x + y;
  end
end
";
        let (program, collector) = parse_source(source);
        assert!(!collector.has_errors(), "{}", collector.list_errors(false));
        assert_eq!(program.classes.len(), 1);
        let cls = &program.classes[0];
        assert_eq!(cls.name, "Vec3");
        assert_eq!(cls.members.len(), 2);
        assert_eq!(cls.methods.len(), 2);
        assert_eq!(cls.methods[0].name, "Vec3");
        assert_eq!(cls.methods[0].params.len(), 2);
        assert_eq!(cls.methods[1].return_type_name, "float32");
    }

    #[test]
    fn parse_inheritance_and_generics() {
        let source = "\
class Pair<K, V>
  K first;
  V second;
end
class Child(Pair)
end
";
        let (program, collector) = parse_source(source);
        assert!(!collector.has_errors());
        assert_eq!(program.classes[0].type_params, vec!["K", "V"]);
        assert_eq!(program.classes[0].members[0].kind, TokenKind::Ident);
        assert_eq!(program.classes[0].members[0].type_name, "K");
        assert_eq!(program.classes[1].parent.as_deref(), Some("Pair"));
    }

    #[test]
    fn static_class_flag() {
        let (program, collector) = parse_source("static class Math\nend\n");
        assert!(!collector.has_errors());
        assert!(program.classes[0].is_static);
    }

    #[test]
    fn self_referential_member_allowed() {
        let (program, collector) = parse_source("class Node\n  Node next;\nend\n");
        assert!(!collector.has_errors());
        assert_eq!(program.classes[0].members[0].type_name, "Node");
        assert_eq!(program.classes[0].members[0].kind, TokenKind::Ident);
    }

    #[test]
    fn missing_end_is_reported() {
        let (_, collector) = parse_source("class Foo\n  int32 x;\n");
        assert!(collector.has_errors());
        let listing = collector.list_errors(false);
        assert!(listing.contains("expected 'end' to close class"));
    }

    #[test]
    fn method_without_return_type_is_void() {
        let (program, collector) = parse_source("class A\n  method Go()\n  end\nend\n");
        assert!(!collector.has_errors());
        assert!(program.classes[0].methods[0].is_void());
    }

    #[test]
    fn virtual_and_override_markers() {
        let source = "\
class A
  method Go() virtual
  end
end
class B(A)
  method Go() override
  end
end
";
        let (program, collector) = parse_source(source);
        assert!(!collector.has_errors());
        assert!(program.classes[0].methods[0].is_virtual);
        assert!(program.classes[1].methods[0].is_override);
    }

    #[test]
    fn enum_members_auto_increment() {
        let source = "enum Color\n  Red\n  Green\n  Blue = 10\n  Alpha\nend\n";
        let (program, collector) = parse_source(source);
        assert!(!collector.has_errors());
        let def = &program.enums[0];
        assert_eq!(
            def.members,
            vec![
                ("Red".to_owned(), 0),
                ("Green".to_owned(), 1),
                ("Blue".to_owned(), 10),
                ("Alpha".to_owned(), 11),
            ]
        );
    }

    #[test]
    fn method_context_registered_for_listing() {
        let source = "class Bar\n  method baz()\n    int32 q;\n  end\nend\n";
        let (_, mut collector) = parse_source(source);
        collector.report(
            qlang_common::diag::Severity::Error,
            "test",
            3,
            5,
            0,
            "parser",
            "Bar.baz",
        );
        let listing = collector.list_errors(true);
        assert!(listing.contains("Function: baz of class type Bar"));
        assert!(listing.contains(">> 3:     int32 q;"));
    }
}
