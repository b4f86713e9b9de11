//! Expression evaluation over flat token lists.
//!
//! Pipeline: fuse dotted chains and call groups into single tokens, fuse
//! unary minus into negative literals, convert to RPN with Shunting-Yard,
//! then fold the RPN with a value stack. All operators are left-associative;
//! precedence lives in [`precedence`].

use qlang_common::token::{Token, TokenKind};
use qlang_lexer::Lexer;
use qlang_parser::ast::Expr;

use crate::value::Value;

use super::Runner;

/// Operator precedence; higher binds tighter.
fn precedence(op: &str) -> u8 {
    match op {
        "||" => 1,
        "&&" => 2,
        "==" | "!=" => 3,
        "<" | ">" | "<=" | ">=" => 4,
        "+" | "-" => 5,
        "*" | "/" => 6,
        _ => 0,
    }
}

impl Runner {
    /// Evaluate a flat-token expression to a value.
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> Value {
        if expr.tokens.is_empty() {
            return Value::Null;
        }

        let elements = self.preprocess_member_access(&expr.tokens);
        let elements = fuse_unary_minus(elements);

        if elements.len() == 1 {
            return self.token_to_value(&elements[0]);
        }

        // Shunting-Yard: infix -> RPN.
        let mut output: Vec<Token> = Vec::new();
        let mut operators: Vec<Token> = Vec::new();

        for token in elements {
            match token.kind {
                TokenKind::LParen => operators.push(token),
                TokenKind::RParen => {
                    while let Some(top) = operators.last() {
                        if top.kind == TokenKind::LParen {
                            break;
                        }
                        output.push(operators.pop().expect("checked non-empty"));
                    }
                    if operators.last().map(|t| t.kind) == Some(TokenKind::LParen) {
                        operators.pop();
                    } else {
                        self.report_runtime("mismatched parentheses in expression", token.line, token.column, 0);
                    }
                }
                TokenKind::Operator => {
                    while let Some(top) = operators.last() {
                        if top.kind == TokenKind::LParen {
                            break;
                        }
                        // left-associative: pop equal or higher precedence
                        if precedence(&token.text) <= precedence(&top.text) {
                            output.push(operators.pop().expect("checked non-empty"));
                        } else {
                            break;
                        }
                    }
                    operators.push(token);
                }
                _ => output.push(token),
            }
        }
        while let Some(op) = operators.pop() {
            output.push(op);
        }

        // RPN evaluation.
        let mut stack: Vec<Value> = Vec::new();
        for token in &output {
            if token.kind == TokenKind::Operator {
                if stack.len() < 2 {
                    self.report_runtime(
                        &format!("not enough operands for operator '{}'", token.text),
                        token.line,
                        token.column,
                        0,
                    );
                    return Value::Null;
                }
                let right = stack.pop().expect("stack length checked");
                let left = stack.pop().expect("stack length checked");
                let result = self.apply_operator(left, &token.text, right);
                stack.push(result);
            } else {
                let value = self.token_to_value(token);
                stack.push(value);
            }
        }

        stack.pop().unwrap_or(Value::Null)
    }

    // ── Preprocessing ──────────────────────────────────────────────────

    /// Fuse `IDENT ('.' IDENT)* ('(' ... ')')?` runs into single tokens so
    /// Shunting-Yard sees one operand per chain. A leading `new` is folded
    /// into the fused token's kind. Bare `<`/`>` become comparison
    /// operators here.
    fn preprocess_member_access(&self, elements: &[Token]) -> Vec<Token> {
        let mut result = Vec::new();
        let mut i = 0;

        while i < elements.len() {
            let mut has_new = false;
            if elements[i].kind == TokenKind::New {
                has_new = true;
                i += 1;
                if i >= elements.len() {
                    result.push(elements[i - 1].clone());
                    break;
                }
            }

            let tok = &elements[i];
            let starts_chain = matches!(tok.kind, TokenKind::Ident | TokenKind::This)
                && i + 1 < elements.len()
                && matches!(elements[i + 1].kind, TokenKind::Dot | TokenKind::LParen);

            if starts_chain {
                let standalone_call = elements[i + 1].kind == TokenKind::LParen;
                let mut chain = tok.text.clone();
                let mut j = i + 1;

                if !standalone_call {
                    while j + 1 < elements.len()
                        && elements[j].kind == TokenKind::Dot
                        && elements[j + 1].kind == TokenKind::Ident
                    {
                        chain.push('.');
                        chain.push_str(&elements[j + 1].text);
                        j += 2;
                    }
                }

                if j < elements.len() && elements[j].kind == TokenKind::LParen {
                    // call: consume through the matching paren, rebuilding
                    // the argument text for re-tokenization
                    let mut full = format!("{}(", chain);
                    let mut balance = 1u32;
                    let mut k = j + 1;
                    let mut first_piece = true;
                    while k < elements.len() && balance > 0 {
                        match elements[k].kind {
                            TokenKind::LParen => balance += 1,
                            TokenKind::RParen => balance -= 1,
                            _ => {}
                        }
                        if balance > 0 {
                            if !first_piece {
                                full.push(' ');
                            }
                            if elements[k].kind == TokenKind::Str {
                                full.push('"');
                                full.push_str(&elements[k].text);
                                full.push('"');
                            } else {
                                full.push_str(&elements[k].text);
                            }
                            first_piece = false;
                        }
                        k += 1;
                    }
                    full.push(')');

                    result.push(Token::new(
                        if has_new { TokenKind::New } else { TokenKind::Ident },
                        full,
                        tok.line,
                        tok.column,
                    ));
                    i = k;
                } else {
                    result.push(Token::new(
                        if has_new { TokenKind::New } else { TokenKind::Ident },
                        chain,
                        tok.line,
                        tok.column,
                    ));
                    i = j;
                }
            } else {
                let mut copy = tok.clone();
                if has_new {
                    copy.kind = TokenKind::New;
                } else if matches!(tok.kind, TokenKind::Less | TokenKind::Greater) {
                    // bare angle brackets act as comparison operators in
                    // expression position
                    copy.kind = TokenKind::Operator;
                }
                result.push(copy);
                i += 1;
            }
        }

        result
    }

    // ── Token to value ─────────────────────────────────────────────────

    /// Evaluate one (possibly fused) operand token.
    pub(crate) fn token_to_value(&mut self, token: &Token) -> Value {
        match token.kind {
            TokenKind::New | TokenKind::Ident => self.ident_to_value(token),
            TokenKind::Int => parse_int(&token.text),
            TokenKind::Float => Value::F32(token.text.parse::<f32>().unwrap_or(0.0)),
            TokenKind::Str => Value::Str(token.text.clone()),
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            TokenKind::Null => Value::Null,
            TokenKind::This => match self.scope.get_var("this") {
                Some(value) => value,
                None => {
                    self.report_runtime(
                        "'this' used outside of a method",
                        token.line,
                        token.column,
                        token.text.len() as u32,
                    );
                    Value::Null
                }
            },
            _ => Value::Str(token.text.clone()),
        }
    }

    /// Identifier-shaped operand: a fused call, a fused member chain, a
    /// `new` construction, or a bare variable.
    fn ident_to_value(&mut self, token: &Token) -> Value {
        let is_new = token.kind == TokenKind::New;
        let text = &token.text;

        if text.len() > 2 && text.ends_with(')') {
            return self.eval_fused_call(token, is_new);
        }

        if is_new {
            // `new ClassName` without parens: default construction
            return match self.create_instance(text, &[]) {
                Some(instance) => Value::Instance(instance),
                None => Value::Null,
            };
        }

        if text.contains('.') {
            return self.eval_member_chain(token);
        }

        match self.scope.get_var(text) {
            Some(value) => value,
            None => {
                self.report_runtime(
                    &format!("unknown variable '{}'", text),
                    token.line,
                    token.column,
                    text.len() as u32,
                );
                Value::Null
            }
        }
    }

    /// A fused `path(args)` token: re-tokenize the argument text, evaluate
    /// each top-level comma group, and dispatch.
    fn eval_fused_call(&mut self, token: &Token, is_new: bool) -> Value {
        let text = &token.text;
        let open = match text.find('(') {
            Some(pos) => pos,
            None => return Value::Null,
        };
        let path = text[..open].to_owned();
        let args_text = &text[open + 1..text.len() - 1];

        let args = self.eval_call_args(args_text);

        if is_new {
            return match self.create_instance(&path, &args) {
                Some(instance) => Value::Instance(instance),
                None => Value::Null,
            };
        }

        if let Some(dot) = path.rfind('.') {
            let instance_path = &path[..dot];
            let method_name = &path[dot + 1..];
            let parts: Vec<&str> = instance_path.split('.').collect();

            let Some(receiver) = self.lookup_receiver(parts[0]) else {
                self.report_runtime(
                    &format!("unknown variable '{}'", token.text),
                    token.line,
                    token.column,
                    token.text.len() as u32,
                );
                return Value::Null;
            };
            let Some(instance) = receiver.as_instance().cloned() else {
                self.report_runtime(
                    &format!("'{}' is not a class instance", parts[0]),
                    token.line,
                    token.column,
                    token.text.len() as u32,
                );
                return Value::Null;
            };

            let Some(target) = self.traverse_nested(instance, &parts[1..]) else {
                return Value::Null;
            };

            let class = target.borrow().class().clone();
            let type_args = target.borrow().type_args().clone();
            let Some((method_class, idx)) =
                self.find_method(&class, method_name, &args, &type_args)
            else {
                self.report_runtime(
                    &format!(
                        "method '{}' not found in class '{}' matching arguments",
                        method_name, class.name
                    ),
                    token.line,
                    token.column,
                    0,
                );
                return Value::Null;
            };

            self.has_return = false;
            self.execute_method(&method_class, idx, &target, &args);
            if self.has_return {
                self.take_return()
            } else {
                Value::Null
            }
        } else {
            self.eval_standalone_call(&path, &args, token)
        }
    }

    /// `Name(args)` with no receiver: a native function, a method on the
    /// implicit `this`, or an implicit constructor when `Name` is a class.
    fn eval_standalone_call(&mut self, name: &str, args: &[Value], token: &Token) -> Value {
        if let Some(func) = self.scope.find_native(name) {
            return func(args);
        }

        if let Some(Value::Instance(this_instance)) = self.scope.get_var("__this__") {
            let class = this_instance.borrow().class().clone();
            let type_args = this_instance.borrow().type_args().clone();
            if let Some((method_class, idx)) = self.find_method(&class, name, args, &type_args) {
                self.has_return = false;
                self.execute_method(&method_class, idx, &this_instance, args);
                return if self.has_return {
                    self.take_return()
                } else {
                    Value::Null
                };
            }
        }

        if self.classes.contains_key(name) {
            return match self.create_instance(name, args) {
                Some(instance) => Value::Instance(instance),
                None => Value::Null,
            };
        }

        self.report_runtime(
            &format!("unknown function or method '{}'", name),
            token.line,
            token.column,
            0,
        );
        Value::Null
    }

    /// A fused member chain `a.b.c` with no call: traverse nested
    /// instances; the final segment is a primitive field or a nested
    /// handle. `Enum.Member` resolves through the enum registry when no
    /// variable shadows the enum name.
    fn eval_member_chain(&mut self, token: &Token) -> Value {
        let parts: Vec<&str> = token.text.split('.').collect();
        if parts.len() < 2 {
            return Value::Null;
        }

        let first = parts[0];

        if !self.scope.has_var(first) {
            if let Some(def) = self.enums.get(first).cloned() {
                if parts.len() == 2 {
                    return match def.value_of(parts[1]) {
                        Some(value) => Value::I32(value),
                        None => {
                            self.report_runtime(
                                &format!("unknown enum member '{}.{}'", first, parts[1]),
                                token.line,
                                token.column,
                                token.text.len() as u32,
                            );
                            Value::Null
                        }
                    };
                }
            }
        }

        let Some(receiver) = self.lookup_receiver(first) else {
            self.report_runtime(
                &format!("unknown variable '{}'", first),
                token.line,
                token.column,
                token.text.len() as u32,
            );
            return Value::Null;
        };
        let Some(instance) = receiver.as_instance().cloned() else {
            self.report_runtime(
                &format!("'{}' is not a class instance", first),
                token.line,
                token.column,
                token.text.len() as u32,
            );
            return Value::Null;
        };

        let middle = &parts[1..parts.len() - 1];
        let Some(target) = self.traverse_nested(instance, middle) else {
            return Value::Null;
        };

        let final_name = parts[parts.len() - 1];
        let field = target.borrow().get_field(final_name);
        if let Some(value) = field {
            return value;
        }
        let nested = target.borrow().get_nested(final_name);
        if let Some(handle) = nested {
            return Value::Instance(handle);
        }

        self.report_runtime(
            &format!("member '{}' not found", final_name),
            token.line,
            token.column,
            0,
        );
        Value::Null
    }

    /// Re-tokenize a fused argument string and evaluate each top-level
    /// comma group as its own expression.
    pub(crate) fn eval_call_args(&mut self, args_text: &str) -> Vec<Value> {
        if args_text.trim().is_empty() {
            return Vec::new();
        }

        let (tokens, _) = Lexer::tokenize(args_text);

        let mut groups: Vec<Expr> = Vec::new();
        let mut current = Expr::new();
        let mut balance = 0i32;

        for tok in tokens {
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::LParen => {
                    balance += 1;
                    current.push(tok);
                }
                TokenKind::RParen => {
                    balance -= 1;
                    current.push(tok);
                }
                TokenKind::Comma if balance == 0 => {
                    if !current.is_empty() {
                        groups.push(std::mem::take(&mut current));
                    }
                }
                _ => current.push(tok),
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }

        groups.iter().map(|expr| self.eval_expr(expr)).collect()
    }

    // ── Binary operators ───────────────────────────────────────────────

    /// Apply a binary operator, trying operator-overload methods first
    /// when the left operand is a class instance.
    pub(crate) fn apply_operator(&mut self, left: Value, op: &str, right: Value) -> Value {
        if let Value::Instance(instance) = &left {
            let method_name = match op {
                "+" => Some("Plus"),
                "-" => Some("Minus"),
                "*" => Some("Multiply"),
                "/" => Some("Divide"),
                _ => None,
            };
            if let Some(method_name) = method_name {
                let class = instance.borrow().class().clone();
                let type_args = instance.borrow().type_args().clone();
                let overload_args = [right.clone()];
                if let Some((method_class, idx)) =
                    self.find_method(&class, method_name, &overload_args, &type_args)
                {
                    let instance = instance.clone();
                    self.has_return = false;
                    self.execute_method(&method_class, idx, &instance, &overload_args);
                    return if self.has_return {
                        self.take_return()
                    } else {
                        Value::Null
                    };
                }
            }
        }

        // Logical operators: truthiness on both sides, no short-circuit.
        match op {
            "&&" => return Value::Bool(left.to_bool() && right.to_bool()),
            "||" => return Value::Bool(left.to_bool() || right.to_bool()),
            _ => {}
        }

        if matches!(op, "==" | "!=" | "<" | ">" | "<=" | ">=") {
            return self.apply_comparison(&left, op, &right);
        }

        // String concatenation: `+` with any string operand.
        if op == "+" && (matches!(left, Value::Str(_)) || matches!(right, Value::Str(_))) {
            return Value::Str(format!("{}{}", left.to_string_raw(), right.to_string_raw()));
        }

        // Arithmetic: float-kind operands compute in f64 and return f32;
        // integer operands compute in i64 and return i32. Division by zero
        // yields zero.
        if left.is_float() || right.is_float() {
            let l = left.to_f64();
            let r = right.to_f64();
            let result = match op {
                "+" => l + r,
                "-" => l - r,
                "*" => l * r,
                "/" => {
                    if r != 0.0 {
                        l / r
                    } else {
                        0.0
                    }
                }
                _ => {
                    self.report_unsupported(&left, op, &right);
                    return Value::Null;
                }
            };
            return Value::F32(result as f32);
        }

        if left.is_numeric() || matches!(left, Value::Bool(_)) {
            let l = left.to_i64();
            let r = right.to_i64();
            let result = match op {
                "+" => l + r,
                "-" => l - r,
                "*" => l * r,
                "/" => {
                    if r != 0 {
                        l / r
                    } else {
                        0
                    }
                }
                _ => {
                    self.report_unsupported(&left, op, &right);
                    return Value::Null;
                }
            };
            return Value::I32(result as i32);
        }

        self.report_unsupported(&left, op, &right);
        Value::Null
    }

    /// Comparison semantics: null equals only null, strings compare
    /// lexicographically, bools as bools, everything else numerically
    /// after f64 promotion.
    fn apply_comparison(&mut self, left: &Value, op: &str, right: &Value) -> Value {
        let left_null = left.is_null();
        let right_null = right.is_null();
        if left_null || right_null {
            return match op {
                "==" => Value::Bool(left_null && right_null),
                "!=" => Value::Bool(left_null != right_null),
                _ => Value::Bool(false),
            };
        }

        if let (Value::Str(l), Value::Str(r)) = (left, right) {
            return Value::Bool(match op {
                "==" => l == r,
                "!=" => l != r,
                "<" => l < r,
                ">" => l > r,
                "<=" => l <= r,
                _ => l >= r,
            });
        }

        if let (Value::Bool(l), Value::Bool(r)) = (left, right) {
            match op {
                "==" => return Value::Bool(l == r),
                "!=" => return Value::Bool(l != r),
                _ => {}
            }
        }

        let l = left.to_f64();
        let r = right.to_f64();
        Value::Bool(match op {
            "==" => l == r,
            "!=" => l != r,
            "<" => l < r,
            ">" => l > r,
            "<=" => l <= r,
            _ => l >= r,
        })
    }

    fn report_unsupported(&mut self, left: &Value, op: &str, right: &Value) {
        self.report_runtime(
            &format!(
                "unsupported operation: {} {} {}",
                left.type_name(),
                op,
                right.type_name()
            ),
            0,
            0,
            0,
        );
    }
}

/// Fuse a unary `-` (at expression start, or after an operator or `(`)
/// with a following numeric literal into a negative literal token.
fn fuse_unary_minus(elements: Vec<Token>) -> Vec<Token> {
    let mut result: Vec<Token> = Vec::new();
    let mut i = 0;

    while i < elements.len() {
        let token = &elements[i];

        if token.is_op("-") {
            let is_unary = match result.last() {
                None => true,
                Some(prev) => {
                    prev.kind == TokenKind::Operator || prev.kind == TokenKind::LParen
                }
            };
            if is_unary && i + 1 < elements.len() {
                let next = &elements[i + 1];
                if matches!(next.kind, TokenKind::Int | TokenKind::Float) {
                    result.push(Token::new(
                        next.kind,
                        format!("-{}", next.text),
                        token.line,
                        token.column,
                    ));
                    i += 2;
                    continue;
                }
            }
        }

        result.push(token.clone());
        i += 1;
    }

    result
}

/// Integer literal parsing: i32 first, i64 on overflow, base-16 for the
/// `0x` prefix.
fn parse_int(text: &str) -> Value {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        let value = i64::from_str_radix(hex, 16).unwrap_or(0);
        return Value::I64(if negative { -value } else { value });
    }

    if let Ok(value) = text.parse::<i32>() {
        return Value::I32(value);
    }
    if let Ok(value) = text.parse::<i64>() {
        return Value::I64(value);
    }
    Value::I32(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_table_matches_tiers() {
        assert!(precedence("*") > precedence("+"));
        assert!(precedence("+") > precedence("<"));
        assert!(precedence("<") > precedence("=="));
        assert!(precedence("==") > precedence("&&"));
        assert!(precedence("&&") > precedence("||"));
        assert_eq!(precedence("="), 0);
    }

    #[test]
    fn parse_int_widths() {
        assert_eq!(parse_int("5"), Value::I32(5));
        assert_eq!(parse_int("-5"), Value::I32(-5));
        assert_eq!(parse_int("5000000000"), Value::I64(5_000_000_000));
        assert_eq!(parse_int("0x10"), Value::I64(16));
        assert_eq!(parse_int("0XFF"), Value::I64(255));
        assert_eq!(parse_int("junk"), Value::I32(0));
    }

    #[test]
    fn unary_minus_fuses_at_start_and_after_operators() {
        let (tokens, _) = Lexer::tokenize("-5 + 3 * -2");
        let tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::Eof | TokenKind::Eol))
            .collect();
        let fused = fuse_unary_minus(tokens);
        let texts: Vec<&str> = fused.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["-5", "+", "3", "*", "-2"]);
    }

    #[test]
    fn binary_minus_not_fused() {
        let (tokens, _) = Lexer::tokenize("7 - 2");
        let tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::Eof | TokenKind::Eol))
            .collect();
        let fused = fuse_unary_minus(tokens);
        assert_eq!(fused.len(), 3);
        assert_eq!(fused[1].text, "-");
    }
}
