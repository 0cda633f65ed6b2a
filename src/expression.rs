use crate::error::{ErrorKind, InterpretError};
use crate::interpreter::{found, Interpreter};
use crate::operators;
use crate::token::{Class, Clause, Operator, Separator, Token, TokenType};
use crate::value::Value;
use num_enum::IntoPrimitive;
use std::io::Write;

/// Binding strength; a lower number binds tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
enum Precedence {
    Negate = 0,
    Power = 1,
    Factor = 2,
    Term = 3,
    Comparison = 4,
}

fn precedence(operator: Operator) -> Precedence {
    match operator {
        Operator::Caret => Precedence::Power,
        Operator::Star | Operator::Slash => Precedence::Factor,
        Operator::Plus | Operator::Minus => Precedence::Term,
        _ => Precedence::Comparison,
    }
}

fn binds_at_least_as_tight(top: Precedence, incoming: Precedence) -> bool {
    u8::from(top) <= u8::from(incoming)
}

/// Entries of the operator stack.
#[derive(Debug)]
enum Pending {
    Binary(Operator, Token),
    Negate(Token),
    Paren(Token),
    /// The `#` sentinel under a function call's opening parenthesis.
    Call(Token),
}

impl Pending {
    /// Precedence of a reducible entry; `None` for the delimiters that stop
    /// a reduction.
    fn precedence(&self) -> Option<Precedence> {
        match self {
            Pending::Binary(op, _) => Some(precedence(*op)),
            Pending::Negate(_) => Some(Precedence::Negate),
            Pending::Paren(_) | Pending::Call(_) => None,
        }
    }
}

fn is_expression_operator(operator: Operator) -> bool {
    !(operator == Operator::Equal || operator.is_compound_assignment())
}

/// Lexemes that end a single-operator expression.
fn ends_simple_expression(token: &Token) -> bool {
    match token.tokentype {
        TokenType::Separator(Separator::Semicolon)
        | TokenType::Separator(Separator::Comma)
        | TokenType::Separator(Separator::RightParen)
        | TokenType::Separator(Separator::Colon)
        | TokenType::Clause(Clause::To)
        | TokenType::Clause(Clause::By) => true,
        _ => false,
    }
}

impl<W: Write> Interpreter<W> {
    /// Evaluates the infix expression that starts after the current token.
    /// On return the last token of the expression is current and the token
    /// that ended it is next; its text is the value's terminator.
    pub(crate) fn expression(&mut self) -> Result<Value, InterpretError> {
        self.evaluate(None)
    }

    /// Evaluates the parenthesised argument of `function`, which is the
    /// current token. Ends with the closing `)` current.
    pub(crate) fn call_argument(&mut self, function: &Token) -> Result<Value, InterpretError> {
        self.evaluate(Some(function))
    }

    fn evaluate(&mut self, call: Option<&Token>) -> Result<Value, InterpretError> {
        let mut values: Vec<Value> = Vec::new();
        let mut ops: Vec<Pending> = Vec::new();
        let mut expect_operand = true;

        if let Some(function) = call {
            if !self.next().is_separator(Separator::LeftParen) {
                return Err(self.error(
                    ErrorKind::SyntaxError,
                    format!("'{}' must be followed by '('", function.lexeme),
                ));
            }
            ops.push(Pending::Call(function.clone()));
        }

        loop {
            let next = self.next().clone();
            match next.tokentype {
                TokenType::Identifier
                | TokenType::Integer
                | TokenType::Float
                | TokenType::Boolean
                | TokenType::Str
                | TokenType::BuiltIn(_)
                | TokenType::UserFunction => {
                    if !expect_operand {
                        return Err(InterpretError::at(
                            ErrorKind::SyntaxError,
                            &next,
                            format!("expected an operator but found {}", found(&next)),
                        ));
                    }
                    self.advance()?;
                    let value = match next.tokentype {
                        TokenType::BuiltIn(_) | TokenType::UserFunction => {
                            self.call_in_expression(&next)?
                        }
                        _ => self.operand(&next)?,
                    };
                    values.push(value);
                    apply_pending_negation(&mut ops, &mut values)?;
                    expect_operand = false;
                }
                TokenType::Operator(op) => {
                    if !is_expression_operator(op) {
                        return Err(InterpretError::at(
                            ErrorKind::SyntaxError,
                            &next,
                            format!("'{}' cannot appear inside an expression", op),
                        ));
                    }
                    self.advance()?;
                    if expect_operand {
                        if op != Operator::Minus || !self.starts_operand() {
                            return Err(InterpretError::at(
                                ErrorKind::SyntaxError,
                                &next,
                                format!("expected an operand but found '{}'", op),
                            ));
                        }
                        ops.push(Pending::Negate(next));
                    } else {
                        let incoming = precedence(op);
                        while ops
                            .last()
                            .and_then(Pending::precedence)
                            .map_or(false, |top| binds_at_least_as_tight(top, incoming))
                        {
                            if let Some(top) = ops.pop() {
                                reduce(top, &mut values)?;
                            }
                        }
                        ops.push(Pending::Binary(op, next));
                        expect_operand = true;
                    }
                }
                TokenType::Separator(Separator::LeftParen) => {
                    if !expect_operand {
                        return Err(InterpretError::at(
                            ErrorKind::SyntaxError,
                            &next,
                            "expected an operator but found '('",
                        ));
                    }
                    self.advance()?;
                    ops.push(Pending::Paren(next));
                }
                TokenType::Separator(Separator::RightParen) => {
                    if !has_open_paren(&ops) {
                        // Belongs to an enclosing construct.
                        break;
                    }
                    if expect_operand {
                        return Err(InterpretError::at(
                            ErrorKind::SyntaxError,
                            &next,
                            "expected an operand but found ')'",
                        ));
                    }
                    self.advance()?;
                    while let Some(top) = ops.pop() {
                        if let Pending::Paren(_) = top {
                            break;
                        }
                        reduce(top, &mut values)?;
                    }
                    if let Some(Pending::Call(_)) = ops.last() {
                        let result = single(values, &next)?;
                        return self.finish(result, ")");
                    }
                    apply_pending_negation(&mut ops, &mut values)?;
                }
                TokenType::Separator(Separator::LeftBracket)
                | TokenType::Separator(Separator::RightBracket) => {
                    return Err(InterpretError::at(
                        ErrorKind::NotImplemented,
                        &next,
                        "array subscripts are not supported",
                    ));
                }
                _ => break,
            }
        }

        let end = self.next().clone();
        if expect_operand {
            return Err(InterpretError::at(
                ErrorKind::SyntaxError,
                &end,
                format!("expected an operand but found {}", found(&end)),
            ));
        }
        while let Some(top) = ops.pop() {
            match top {
                Pending::Paren(paren) => {
                    return Err(InterpretError::at(
                        ErrorKind::SyntaxError,
                        &paren,
                        "'(' is never closed",
                    ))
                }
                Pending::Call(function) => {
                    return Err(InterpretError::at(
                        ErrorKind::SyntaxError,
                        &end,
                        format!(
                            "expected ')' to close the call to '{}' but found {}",
                            function.lexeme,
                            found(&end)
                        ),
                    ))
                }
                _ => reduce(top, &mut values)?,
            }
        }
        let result = single(values, &end)?;
        self.finish(result, &end.lexeme)
    }

    /// Single-operator form: `operand [operator operand]`, each operand
    /// optionally negated. Used for loop bounds, delimiters and `print`
    /// arguments.
    pub(crate) fn simple_expression(&mut self) -> Result<Value, InterpretError> {
        let left = self.simple_operand()?;
        let next = self.next().clone();
        if ends_simple_expression(&next) {
            return self.finish(left, &next.lexeme);
        }
        let op = match next.tokentype {
            TokenType::Operator(op) if is_expression_operator(op) => op,
            _ => {
                return Err(InterpretError::at(
                    ErrorKind::SyntaxError,
                    &next,
                    format!("expected an operator but found {}", found(&next)),
                ))
            }
        };
        self.advance()?;
        let right = self.simple_operand()?;
        let result = operators::apply(op, &left, &right).map_err(|e| e.at(&next))?;
        let end = self.next().lexeme.clone();
        self.finish(result, &end)
    }

    fn simple_operand(&mut self) -> Result<Value, InterpretError> {
        self.advance()?;
        let mut negative = None;
        if self.current().is(TokenType::Operator(Operator::Minus)) {
            negative = Some(self.current().clone());
            self.advance()?;
        }
        let token = self.current().clone();
        let value = match token.tokentype {
            TokenType::BuiltIn(_) | TokenType::UserFunction => self.call_in_expression(&token)?,
            t if t.is_operand() => self.operand(&token)?,
            _ => {
                return Err(self.error(
                    ErrorKind::SyntaxError,
                    format!("expected an operand but found {}", found(&token)),
                ))
            }
        };
        match negative {
            Some(minus) => operators::negate(&value).map_err(|e| e.at(&minus)),
            None => Ok(value),
        }
    }

    /// Value of an identifier or literal lexeme.
    pub(crate) fn operand(&self, token: &Token) -> Result<Value, InterpretError> {
        if token.tokentype != TokenType::Identifier {
            return Value::literal(token).map_err(|e| e.at(token));
        }
        match self.environment.get(&token.lexeme) {
            Some(value) if value.is_array() => Err(InterpretError::at(
                ErrorKind::NotImplemented,
                token,
                format!("array '{}' cannot be used as a value", token.lexeme),
            )),
            Some(value) => Ok(value.clone()),
            None => Err(InterpretError::at(
                ErrorKind::NameError,
                token,
                format!("'{}' is used before it is declared", token.lexeme),
            )),
        }
    }

    /// Whether the next token can follow a unary minus.
    fn starts_operand(&self) -> bool {
        let next = self.next();
        next.tokentype.is_operand()
            || next.is_separator(Separator::LeftParen)
            || next.tokentype.class() == Class::Function
    }

    fn finish(&mut self, value: Value, terminator: &str) -> Result<Value, InterpretError> {
        if self.trace.expressions {
            self.emit(&format!("\t\t...Result Value: {}", value.text))?;
        }
        Ok(value.terminated(terminator))
    }
}

fn has_open_paren(ops: &[Pending]) -> bool {
    for entry in ops.iter().rev() {
        match entry {
            Pending::Paren(_) => return true,
            Pending::Call(_) => return false,
            _ => {}
        }
    }
    false
}

fn apply_pending_negation(
    ops: &mut Vec<Pending>,
    values: &mut Vec<Value>,
) -> Result<(), InterpretError> {
    while let Some(Pending::Negate(_)) = ops.last() {
        if let Some(top) = ops.pop() {
            reduce(top, values)?;
        }
    }
    Ok(())
}

fn missing_operand(at: &Token) -> InterpretError {
    InterpretError::at(
        ErrorKind::SyntaxError,
        at,
        format!("'{}' is missing an operand", at.lexeme),
    )
}

fn reduce(entry: Pending, values: &mut Vec<Value>) -> Result<(), InterpretError> {
    match entry {
        Pending::Binary(op, token) => {
            let right = values.pop().ok_or_else(|| missing_operand(&token))?;
            let left = values.pop().ok_or_else(|| missing_operand(&token))?;
            let result = operators::apply(op, &left, &right).map_err(|e| e.at(&token))?;
            values.push(result);
        }
        Pending::Negate(token) => {
            let operand = values.pop().ok_or_else(|| missing_operand(&token))?;
            values.push(operators::negate(&operand).map_err(|e| e.at(&token))?);
        }
        Pending::Paren(token) | Pending::Call(token) => {
            return Err(InterpretError::at(
                ErrorKind::SyntaxError,
                &token,
                format!("unbalanced '{}'", token.lexeme),
            ))
        }
    }
    Ok(())
}

fn single(mut values: Vec<Value>, at: &Token) -> Result<Value, InterpretError> {
    match (values.pop(), values.is_empty()) {
        (Some(value), true) => Ok(value),
        _ => Err(InterpretError::at(
            ErrorKind::SyntaxError,
            at,
            "malformed expression",
        )),
    }
}

#[cfg(test)]
mod expression_tests {
    use crate::error::{ErrorKind, InterpretError};
    use crate::interpreter::Interpreter;
    use crate::scanner::Scanner;
    use crate::token::DataType;
    use crate::value::Value;

    /// Evaluates `source` as the right-hand side of an assignment after
    /// running the statements in `setup`.
    fn eval_with(setup: &str, source: &str) -> Result<Value, InterpretError> {
        let program = format!("{} String result; result = {};", setup, source);
        let mut interp = Interpreter::new(Scanner::new(&program).unwrap(), Vec::new());
        while interp.next().lexeme != "result" {
            interp.statement(true)?;
        }
        interp.advance()?;
        interp.advance()?;
        interp.expression()
    }

    fn eval(source: &str) -> Value {
        eval_with("", source).unwrap()
    }

    fn eval_err(source: &str) -> ErrorKind {
        eval_with("", source).unwrap_err().kind
    }

    #[test]
    fn precedence() {
        assert_eq!(eval("2 + 3 * 4").text, "14");
        assert_eq!(eval("(2 + 3) * 4").text, "20");
        assert_eq!(eval("10 - 4 - 3").text, "3");
        assert_eq!(eval("2 * 3 ^ 2").text, "18");
        assert_eq!(eval("1 + 2 < 4").text, "T");
        assert_eq!(eval("4 > 1 + 2").text, "T");
    }

    #[test]
    fn power_reduces_left_to_right() {
        assert_eq!(eval("2 ^ 3 ^ 2").text, "64");
    }

    #[test]
    fn unary_minus() {
        assert_eq!(eval("5 - -3").text, "8");
        assert_eq!(eval_with("Int x = 4;", "-x * 2").unwrap().text, "-8");
        assert_eq!(eval("-(2 + 3) * 2").text, "-10");
        assert_eq!(eval("2 * -(3 + 1)").text, "-8");
        assert_eq!(eval("-2.5 + 1").text, "-1.5");
        assert_eq!(eval("(-3)").text, "-3");
    }

    #[test]
    fn booleans() {
        assert_eq!(eval("3 < 5").text, "T");
        assert_eq!(eval("3 >= 5").text, "F");
        assert_eq!(eval("3 < 5").dtype, DataType::Bool);
    }

    #[test]
    fn terminator_is_left_as_next_token() {
        let value = eval("1 + 2");
        assert_eq!(value.terminator, ";");
    }

    #[test]
    fn function_call_inside_expression() {
        assert_eq!(eval("LENGTH(\"abc\") + 1").text, "4");
        assert_eq!(eval("2 * LENGTH(\"ab\" ) * 3").text, "12");
        assert_eq!(eval("LENGTH((\"a\"))").text, "1");
        assert_eq!(eval("-LENGTH(\"abcd\")").text, "-4");
        assert_eq!(eval("SPACES(\"   \")").text, "T");
        assert_eq!(eval_with("String s = \"hello\";", "LENGTH(s) * 2").unwrap().text, "10");
    }

    #[test]
    fn mismatched_parentheses() {
        assert_eq!(eval_err("(1 + 2"), ErrorKind::SyntaxError);
        assert_eq!(eval_err("LENGTH(\"x\""), ErrorKind::SyntaxError);
    }

    #[test]
    fn malformed_expressions() {
        assert_eq!(eval_err("1 2"), ErrorKind::SyntaxError);
        assert_eq!(eval_err("1 +"), ErrorKind::SyntaxError);
        assert_eq!(eval_err("* 2"), ErrorKind::SyntaxError);
        assert_eq!(eval_err("()"), ErrorKind::SyntaxError);
        assert_eq!(eval_err("1 = 2"), ErrorKind::SyntaxError);
    }

    #[test]
    fn undeclared_operand() {
        assert_eq!(eval_err("y + 1"), ErrorKind::NameError);
    }

    #[test]
    fn print_has_no_value() {
        assert_eq!(eval_err("print(1)"), ErrorKind::TypeError);
    }

    #[test]
    fn user_function_in_expression() {
        assert_eq!(eval_err("f(1) + 2"), ErrorKind::NotImplemented);
    }

    #[test]
    fn subscripts_are_not_implemented() {
        assert_eq!(eval_with("Int a[3];", "a[1]").unwrap_err().kind, ErrorKind::NotImplemented);
    }
}
