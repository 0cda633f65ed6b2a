use crate::error::{ErrorKind, InterpretError};
use crate::interpreter::{found, Interpreter};
use crate::token::{BuiltIn, Operator, Separator, Token, TokenType};
use crate::value::Value;
use log::warn;
use std::io::Write;

impl<W: Write> Interpreter<W> {
    /// A function call used as a statement, with the function name current.
    /// Ends on the `;`.
    pub(crate) fn function_statement(&mut self, exec: bool) -> Result<Value, InterpretError> {
        let function = self.current().clone();
        if function.tokentype == TokenType::UserFunction {
            warn!(
                "line {}: call to user function '{}' skipped",
                function.line, function.lexeme
            );
            self.scanner.skip_until(TokenType::Separator(Separator::Semicolon))?;
            return Ok(Value::void(";"));
        }
        if !self.next().is_separator(Separator::LeftParen) {
            let next = self.next();
            return Err(InterpretError::at(
                ErrorKind::SyntaxError,
                next,
                format!(
                    "expected '(' after '{}' but found {}",
                    function.lexeme,
                    found(next)
                ),
            ));
        }
        if exec {
            self.call_builtin(&function)?;
        } else {
            self.skip_arguments(&function)?;
        }
        self.expect_next(Separator::Semicolon, "expected ';' after function call")?;
        Ok(Value::void(";"))
    }

    /// A function call used as an operand, with the function name current.
    /// Ends on the closing `)`.
    pub(crate) fn call_in_expression(
        &mut self,
        function: &Token,
    ) -> Result<Value, InterpretError> {
        match function.tokentype {
            TokenType::BuiltIn(BuiltIn::Print) => Err(InterpretError::at(
                ErrorKind::TypeError,
                function,
                "'print' has no value and cannot be used in an expression",
            )),
            TokenType::BuiltIn(_) => {
                if !self.next().is_separator(Separator::LeftParen) {
                    let next = self.next();
                    return Err(InterpretError::at(
                        ErrorKind::SyntaxError,
                        next,
                        format!(
                            "expected '(' after '{}' but found {}",
                            function.lexeme,
                            found(next)
                        ),
                    ));
                }
                match self.call_builtin(function)? {
                    Some(value) => Ok(value),
                    None => Err(InterpretError::at(
                        ErrorKind::TypeError,
                        function,
                        format!("'{}' has no value", function.lexeme),
                    )),
                }
            }
            _ => Err(InterpretError::at(
                ErrorKind::NotImplemented,
                function,
                format!("user function '{}' cannot be called", function.lexeme),
            )),
        }
    }

    /// Runs a built-in whose `(` is the next token. Ends on the closing `)`.
    fn call_builtin(&mut self, function: &Token) -> Result<Option<Value>, InterpretError> {
        let builtin = match function.tokentype {
            TokenType::BuiltIn(builtin) => builtin,
            _ => {
                return Err(InterpretError::at(
                    ErrorKind::NotImplemented,
                    function,
                    format!("'{}' is not a built-in function", function.lexeme),
                ))
            }
        };
        match builtin {
            BuiltIn::Print => {
                self.print()?;
                Ok(None)
            }
            BuiltIn::Length => {
                let value = self.call_argument(function)?;
                Ok(Some(Value::int(value.text.chars().count() as i64)))
            }
            BuiltIn::Spaces => {
                self.advance()?;
                let value = self.simple_expression()?;
                let message = "expected ')' after the argument of 'SPACES'";
                self.expect_next(Separator::RightParen, message)?;
                Ok(Some(Value::boolean(value.text.trim().is_empty())))
            }
        }
    }

    /// `print(a, b, ...)`: the argument texts joined by single spaces.
    fn print(&mut self) -> Result<(), InterpretError> {
        self.advance()?;
        let mut line = String::new();
        if self.next().is_separator(Separator::RightParen) {
            self.advance()?;
            return self.emit(&line);
        }
        loop {
            let value = self.expression()?;
            line.push_str(&value.text);
            self.advance()?;
            let separator = self.current().clone();
            match separator.tokentype {
                TokenType::Separator(Separator::Comma) => line.push(' '),
                TokenType::Separator(Separator::RightParen) => break,
                _ => {
                    return Err(InterpretError::at(
                        ErrorKind::SyntaxError,
                        &separator,
                        format!(
                            "expected ',' or ')' in 'print' but found {}",
                            found(&separator)
                        ),
                    ))
                }
            }
        }
        self.emit(&line)
    }

    /// Moves past a parenthesised argument list without evaluating it,
    /// checking that operands and operators alternate.
    fn skip_arguments(&mut self, function: &Token) -> Result<(), InterpretError> {
        let mut depth = 0usize;
        let mut expect_operand = true;
        let mut after_open = false;
        loop {
            self.advance()?;
            let token = self.current().clone();
            let well_placed = match token.tokentype {
                TokenType::Separator(Separator::LeftParen) => {
                    depth += 1;
                    expect_operand
                }
                TokenType::Separator(Separator::RightParen) => {
                    let placed = !expect_operand || after_open;
                    depth -= 1;
                    if depth == 0 && placed {
                        return Ok(());
                    }
                    expect_operand = false;
                    placed
                }
                TokenType::Separator(Separator::Comma)
                | TokenType::Separator(Separator::LeftBracket) => {
                    let placed = !expect_operand;
                    expect_operand = true;
                    placed
                }
                TokenType::Separator(Separator::RightBracket) => {
                    let placed = !expect_operand;
                    expect_operand = false;
                    placed
                }
                TokenType::Operator(Operator::Equal) => false,
                TokenType::Operator(op) if op.is_compound_assignment() => false,
                TokenType::Operator(op) => {
                    let placed = !expect_operand || op == Operator::Minus;
                    expect_operand = true;
                    placed
                }
                TokenType::BuiltIn(_) | TokenType::UserFunction => {
                    expect_operand && self.next().is_separator(Separator::LeftParen)
                }
                t if t.is_operand() => {
                    let placed = expect_operand;
                    expect_operand = false;
                    placed
                }
                TokenType::EOF => {
                    return Err(InterpretError::at(
                        ErrorKind::UnterminatedConstruct,
                        function,
                        format!("call to '{}' is never closed", function.lexeme),
                    ))
                }
                _ => false,
            };
            after_open = token.is_separator(Separator::LeftParen);
            if !well_placed {
                return Err(InterpretError::at(
                    ErrorKind::SyntaxError,
                    &token,
                    format!(
                        "unexpected {} in the arguments of '{}'",
                        found(&token),
                        function.lexeme
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
mod functions_tests {
    use crate::error::ErrorKind;
    use crate::interpreter::Interpreter;
    use crate::scanner::Scanner;

    fn run(source: &str) -> Result<String, crate::error::InterpretError> {
        let mut interp = Interpreter::new(Scanner::new(source).unwrap(), Vec::new());
        interp.interpret()?;
        Ok(String::from_utf8(interp.into_output()).unwrap())
    }

    #[test]
    fn print_joins_arguments_with_spaces() {
        assert_eq!(run("print(\"a\", 1, 2.5, T);").unwrap(), "a 1 2.5 T\n");
        assert_eq!(run("print();").unwrap(), "\n");
        assert_eq!(run("Int x = 3; print(\"x is\", x * 2);").unwrap(), "x is 6\n");
        assert_eq!(run("print(-4, 1 - 3);").unwrap(), "-4 -2\n");
    }

    #[test]
    fn print_arguments_are_full_expressions() {
        assert_eq!(run("print(1 + 2 * 3);").unwrap(), "7\n");
        assert_eq!(run("print((1 + 2) * 3, 4);").unwrap(), "9 4\n");
        assert_eq!(run("Int x = 5; print(\"x\", x - 1 - 1);").unwrap(), "x 3\n");
    }

    #[test]
    fn print_argument_may_call_a_function() {
        assert_eq!(run("print(LENGTH(\"four\"));").unwrap(), "4\n");
    }

    #[test]
    fn print_rejects_bad_separators() {
        assert_eq!(run("print(1; 2);").unwrap_err().kind, ErrorKind::SyntaxError);
        assert_eq!(run("print 1;").unwrap_err().kind, ErrorKind::SyntaxError);
        assert_eq!(run("print(1)").unwrap_err().kind, ErrorKind::SyntaxError);
    }

    #[test]
    fn length_counts_characters() {
        assert_eq!(run("Int n = LENGTH(\"héllo\"); print(n);").unwrap(), "5\n");
        assert_eq!(run("Int n = LENGTH(\"\"); print(n);").unwrap(), "0\n");
        assert_eq!(run("Int n = LENGTH(12 * 10); print(n);").unwrap(), "3\n");
    }

    #[test]
    fn spaces_tests_for_blank_text() {
        assert_eq!(run("Bool b = SPACES(\"  \"); print(b);").unwrap(), "T\n");
        assert_eq!(run("Bool b = SPACES(\"\"); print(b);").unwrap(), "T\n");
        assert_eq!(run("Bool b = SPACES(\" x \"); print(b);").unwrap(), "F\n");
    }

    #[test]
    fn builtin_as_statement_discards_value() {
        assert_eq!(run("LENGTH(\"abc\");").unwrap(), "");
    }

    #[test]
    fn skipped_calls_are_not_run() {
        assert_eq!(run("if F: print((1), LENGTH(\"x\")); endif;").unwrap(), "");
        assert_eq!(run("if F: print(-x, a[2], f(1)); endif;").unwrap(), "");
        let err = run("if F: print(1; endif;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
        let err = run("if F: print(LENGTH(\"x\"); endif;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
        let err = run("if F: print(1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedConstruct);
    }

    #[test]
    fn skipped_calls_are_checked_like_executed_ones() {
        for source in &["print(1 2);", "print(1 +);", "print(, 1);", "print(* 2);"] {
            assert_eq!(run(source).unwrap_err().kind, ErrorKind::SyntaxError);
            let skipped = format!("if F: {} endif;", source);
            assert_eq!(run(&skipped).unwrap_err().kind, ErrorKind::SyntaxError);
        }
        assert_eq!(run("if F: print(); endif;").unwrap(), "");
    }

    #[test]
    fn user_function_statement_is_skipped() {
        assert_eq!(run("helper(1, 2); print(\"after\");").unwrap(), "after\n");
    }
}
