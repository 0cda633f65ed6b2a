use crate::environment::Environment;
use crate::error::{ErrorKind, InterpretError};
use crate::scanner::Scanner;
use crate::token::{BlockEnd, DataType, Flow, Operator, Separator, Token, TokenType};
use crate::value::{Shape, Value};
use log::debug;
use std::io::Write;
use std::str::FromStr;
use strum_macros::EnumString;

/// The three switches flipped by `debug` directives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Trace {
    pub tokens: bool,
    pub expressions: bool,
    pub assignments: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
enum TraceKind {
    Token,
    Expr,
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
enum Switch {
    #[strum(serialize = "on")]
    On,
    #[strum(serialize = "off")]
    Off,
}

/// Execution context shared by the statement interpreter and the expression
/// evaluator: the token cursor, the variables, the trace switches and the
/// sink that `print` and the traces write to.
pub struct Interpreter<W: Write> {
    pub(crate) scanner: Scanner,
    pub(crate) environment: Environment,
    pub(crate) trace: Trace,
    pub(crate) out: W,
}

/// Text used for a token in error messages.
pub(crate) fn found(token: &Token) -> String {
    if token.is_eof() {
        "end of file".to_string()
    } else {
        format!("'{}'", token.lexeme)
    }
}

impl<W: Write> Interpreter<W> {
    pub fn new(scanner: Scanner, out: W) -> Interpreter<W> {
        Interpreter {
            scanner,
            environment: Environment::new(),
            trace: Trace::default(),
            out,
        }
    }

    pub fn with_trace(mut self, trace: Trace) -> Interpreter<W> {
        self.trace = trace;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn trace(&self) -> Trace {
        self.trace
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs statements until the end of the program.
    pub fn interpret(&mut self) -> Result<(), InterpretError> {
        debug!("interpreting {} tokens", self.scanner.len());
        while !self.scanner.next().is_eof() {
            self.statement(true)?;
            if let TokenType::End(end) = self.current().tokentype {
                return Err(self.error(
                    ErrorKind::SyntaxError,
                    format!("'{}' does not close any statement", end),
                ));
            }
        }
        let at = self.current().clone();
        self.out
            .flush()
            .map_err(|e| InterpretError::at(ErrorKind::IoError, &at, e.to_string()))
    }

    pub(crate) fn current(&self) -> &Token {
        self.scanner.current()
    }

    pub(crate) fn next(&self) -> &Token {
        self.scanner.next()
    }

    pub(crate) fn advance(&mut self) -> Result<(), InterpretError> {
        self.scanner.advance();
        if self.trace.tokens {
            let token = self.current().clone();
            let subclass = token
                .tokentype
                .subclass()
                .map_or_else(|| "-".to_string(), |s| s.to_string());
            self.emit(&format!(
                "\t\t...Token: {} {} {}",
                token.tokentype.class(),
                subclass,
                token.lexeme
            ))?;
        }
        Ok(())
    }

    pub(crate) fn error(&self, kind: ErrorKind, message: impl Into<String>) -> InterpretError {
        InterpretError::at(kind, self.current(), message)
    }

    /// Requires the next token to be `separator` and moves onto it.
    pub(crate) fn expect_next(
        &mut self,
        separator: Separator,
        message: &str,
    ) -> Result<(), InterpretError> {
        if self.next().is_separator(separator) {
            return self.advance();
        }
        let next = self.next();
        Err(InterpretError::at(
            ErrorKind::SyntaxError,
            next,
            format!("{} but found {}", message, found(next)),
        ))
    }

    pub(crate) fn emit(&mut self, line: &str) -> Result<(), InterpretError> {
        writeln!(self.out, "{}", line).map_err(|e| {
            InterpretError::at(ErrorKind::IoError, self.scanner.current(), e.to_string())
        })
    }

    /// Reads one statement and executes it when `exec` is set; otherwise only
    /// checks it and moves past it. Both modes consume the same tokens.
    pub fn statement(&mut self, exec: bool) -> Result<Value, InterpretError> {
        self.advance()?;
        let token = self.current().clone();
        match token.tokentype {
            TokenType::Declare(dtype) => self.declare_statement(exec, dtype),
            TokenType::Flow(Flow::If) => self.if_statement(exec),
            TokenType::Flow(Flow::While) => self.while_statement(exec),
            TokenType::Flow(Flow::For) => self.for_statement(exec),
            TokenType::End(_) => Ok(Value::void(token.lexeme)),
            TokenType::Identifier => self.assign_statement(exec),
            TokenType::BuiltIn(_) | TokenType::UserFunction => self.function_statement(exec),
            TokenType::Debug => self.debug_statement(exec),
            TokenType::Separator(Separator::Semicolon) => Ok(Value::void(";")),
            TokenType::EOF => Ok(Value::void(token.lexeme)),
            _ => Err(self.error(
                ErrorKind::SyntaxError,
                format!("{} cannot start a statement", found(&token)),
            )),
        }
    }

    /// Runs statements until one of the `stop` keywords is reached. On return
    /// that keyword is the current token. `opener` is the statement owning
    /// the block and locates the error when the block is never closed.
    pub fn statements(
        &mut self,
        exec: bool,
        stop: &[BlockEnd],
        opener: &Token,
    ) -> Result<Value, InterpretError> {
        loop {
            let result = self.statement(exec)?;
            match self.current().tokentype {
                TokenType::End(end) if stop.contains(&end) => return Ok(result),
                TokenType::End(end) => {
                    return Err(self.error(
                        ErrorKind::SyntaxError,
                        format!(
                            "expected {} for '{}' on line {} but found '{}'",
                            expected(stop),
                            opener.lexeme,
                            opener.line,
                            end
                        ),
                    ))
                }
                TokenType::EOF => {
                    return Err(InterpretError::at(
                        ErrorKind::SyntaxError,
                        opener,
                        format!("'{}' is never closed by {}", opener.lexeme, expected(stop)),
                    ))
                }
                _ => {}
            }
        }
    }

    /// Requires the `;` after a block's closing keyword and moves onto it.
    pub(crate) fn close_block(
        &mut self,
        opener: &Token,
        end: BlockEnd,
    ) -> Result<(), InterpretError> {
        if self.next().is_separator(Separator::Semicolon) {
            return self.advance();
        }
        Err(InterpretError::at(
            ErrorKind::SyntaxError,
            opener,
            format!(
                "expected '{};' to close '{}' but found '{}' {}",
                end,
                opener.lexeme,
                end,
                found(self.next())
            ),
        ))
    }

    fn declare_statement(&mut self, exec: bool, dtype: DataType) -> Result<Value, InterpretError> {
        self.advance()?;
        let name = self.current().clone();
        if name.tokentype != TokenType::Identifier {
            return Err(self.error(
                ErrorKind::SyntaxError,
                format!("expected a variable name after '{}' but found {}", dtype, found(&name)),
            ));
        }
        let (shape, dimensions) = self.array_tag()?;
        if exec {
            self.environment
                .declare(&name.lexeme, dtype, shape, dimensions)
                .map_err(|e| e.at(&name))?;
        }
        let next = self.next().clone();
        match next.tokentype {
            TokenType::Operator(Operator::Equal) if shape == Shape::Scalar => {
                self.assign_statement(exec)
            }
            TokenType::Operator(Operator::Equal) if exec => Err(InterpretError::at(
                ErrorKind::NotImplemented,
                &next,
                format!("array '{}' cannot be initialised", name.lexeme),
            )),
            TokenType::Operator(Operator::Equal) => {
                self.scanner.skip_until(TokenType::Separator(Separator::Semicolon))?;
                Ok(Value::void(";"))
            }
            TokenType::Operator(op) => Err(InterpretError::at(
                ErrorKind::SyntaxError,
                &next,
                format!("'{}' cannot be applied to '{}' before it is initialised", op, name.lexeme),
            )),
            _ => {
                self.expect_next(Separator::Semicolon, "expected ';' after declaration")?;
                Ok(Value::void(";"))
            }
        }
    }

    /// Optional `[n]` or `[]` after a declared name.
    fn array_tag(&mut self) -> Result<(Shape, Vec<usize>), InterpretError> {
        if !self.next().is_separator(Separator::LeftBracket) {
            return Ok((Shape::Scalar, vec![]));
        }
        self.advance()?;
        self.advance()?;
        let size = self.current().clone();
        match size.tokentype {
            TokenType::Separator(Separator::RightBracket) => Ok((Shape::GrowableArray, vec![])),
            TokenType::Integer => {
                let n = size.lexeme.parse::<usize>().map_err(|_| {
                    self.error(
                        ErrorKind::NumericError,
                        format!("array size '{}' is too large", size.lexeme),
                    )
                })?;
                self.expect_next(Separator::RightBracket, "expected ']' after array size")?;
                Ok((Shape::FixedArray, vec![n]))
            }
            _ => Err(self.error(
                ErrorKind::SyntaxError,
                format!("expected an array size or ']' but found {}", found(&size)),
            )),
        }
    }

    /// `name = expr;` with the current token on `name`. Ends on the `;`.
    pub(crate) fn assign_statement(&mut self, exec: bool) -> Result<Value, InterpretError> {
        if !exec {
            if let TokenType::Operator(_) = self.next().tokentype {
                self.advance()?;
                self.scanner.skip_until(TokenType::Separator(Separator::Semicolon))?;
                return Ok(Value::void(";"));
            }
            let next = self.next();
            return Err(InterpretError::at(
                ErrorKind::SyntaxError,
                next,
                format!("expected an assignment operator but found {}", found(next)),
            ));
        }
        let result = self.assignment()?;
        self.expect_next(Separator::Semicolon, "expected ';' after assignment")?;
        Ok(result.terminated(";"))
    }

    /// Evaluates and stores an assignment to the current identifier, leaving
    /// the token that ended the expression as the next token.
    pub(crate) fn assignment(&mut self) -> Result<Value, InterpretError> {
        let target = self.current().clone();
        let declaration = match self.environment.declaration(&target.lexeme) {
            Some(declaration) => declaration.clone(),
            None => {
                return Err(self.error(
                    ErrorKind::NameError,
                    format!("'{}' is assigned before it is declared", target.lexeme),
                ))
            }
        };
        self.advance()?;
        match self.current().tokentype {
            TokenType::Operator(Operator::Equal) => {}
            TokenType::Operator(op) if op.is_compound_assignment() => {
                return Err(self.error(
                    ErrorKind::NotImplemented,
                    format!("compound assignment '{}' is not supported", op),
                ))
            }
            _ => {
                let current = self.current().clone();
                return Err(self.error(
                    ErrorKind::SyntaxError,
                    format!(
                        "expected an assignment operator after '{}' but found {}",
                        target.lexeme,
                        found(&current)
                    ),
                ));
            }
        }
        if declaration.shape != Shape::Scalar {
            return Err(self.error(
                ErrorKind::NotImplemented,
                format!("assignment to array '{}' is not supported", target.lexeme),
            ));
        }
        let value = self.expression()?;
        let stored = value.coerce(declaration.dtype).map_err(|e| {
            InterpretError::at(
                e.kind,
                &target,
                format!(
                    "cannot assign to {} '{}': {}",
                    declaration.dtype, target.lexeme, e.message
                ),
            )
        })?;
        self.environment.put(&target.lexeme, stored.clone());
        if self.trace.assignments {
            self.emit(&format!(
                "\t\t...Variable Name: {} Value: {}",
                target.lexeme, stored.text
            ))?;
        }
        Ok(stored)
    }

    /// `debug Token|Expr|Assign on|off;`
    fn debug_statement(&mut self, exec: bool) -> Result<Value, InterpretError> {
        self.advance()?;
        let kind = TraceKind::from_str(&self.current().lexeme).map_err(|_| {
            self.error(
                ErrorKind::SyntaxError,
                format!(
                    "expected 'Token', 'Expr' or 'Assign' after 'debug' but found {}",
                    found(self.current())
                ),
            )
        })?;
        self.advance()?;
        let switch = Switch::from_str(&self.current().lexeme).map_err(|_| {
            self.error(
                ErrorKind::SyntaxError,
                format!("expected 'on' or 'off' but found {}", found(self.current())),
            )
        })?;
        self.expect_next(Separator::Semicolon, "expected ';' after debug directive")?;
        if exec {
            let on = switch == Switch::On;
            match kind {
                TraceKind::Token => self.trace.tokens = on,
                TraceKind::Expr => self.trace.expressions = on,
                TraceKind::Assign => self.trace.assignments = on,
            }
        }
        Ok(Value::void(";"))
    }
}

fn expected(stop: &[BlockEnd]) -> String {
    stop.iter()
        .map(|end| format!("'{}'", end))
        .collect::<Vec<_>>()
        .join(" or ")
}

#[cfg(test)]
mod interpreter_tests {
    use super::*;
    use crate::token::DataType;

    fn interpreter(source: &str) -> Interpreter<Vec<u8>> {
        Interpreter::new(Scanner::new(source).unwrap(), Vec::new())
    }

    fn output(interpreter: Interpreter<Vec<u8>>) -> String {
        String::from_utf8(interpreter.into_output()).unwrap()
    }

    #[test]
    fn declare_and_initialise() {
        let mut interp = interpreter("Int x = 7; Float y = 7; Bool b; String s = \"hi\";");
        interp.interpret().unwrap();
        let env = interp.environment();
        assert_eq!(env.get("x").unwrap().text, "7");
        assert_eq!(env.get("y").unwrap().text.parse::<f64>().unwrap(), 7.0);
        assert_eq!(env.get("y").unwrap().dtype, DataType::Float);
        assert_eq!(env.get("b").unwrap().text, "F");
        assert_eq!(env.get("s").unwrap().text, "hi");
    }

    #[test]
    fn statement_reports_terminator() {
        let mut interp = interpreter("Int x = 1; endif");
        let first = interp.statement(true).unwrap();
        assert_eq!(first.terminator, ";");
        let second = interp.statement(true).unwrap();
        assert_eq!(second.terminator, "endif");
    }

    #[test]
    fn skipped_statement_has_no_effect() {
        let mut interp = interpreter("Int x = 1 / 0;");
        interp.statement(false).unwrap();
        assert!(interp.environment().get("x").is_none());
        assert!(interp.current().is_separator(Separator::Semicolon));
    }

    #[test]
    fn skip_is_idempotent() {
        let source = "if x > 1: y = 2; else: y = 3; endif; print(y);";
        let mut interp = interpreter(source);
        let start = interp.scanner.mark();
        interp.statement(false).unwrap();
        let first = interp.scanner.mark();
        interp.scanner.rewind(start);
        interp.statement(false).unwrap();
        assert_eq!(interp.scanner.mark(), first);
        assert_eq!(interp.next().lexeme, "print");
    }

    #[test]
    fn assign_undeclared_is_name_error() {
        let err = interpreter("x = 3;").interpret().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NameError);
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn assignment_coerces_to_declared_type() {
        let mut interp = interpreter("Int x; x = 2.9; String s; s = 4 * 2;");
        interp.interpret().unwrap();
        assert_eq!(interp.environment().get("x").unwrap().text, "2");
        assert_eq!(interp.environment().get("s").unwrap().text, "8");
        assert_eq!(
            interp.environment().get("s").unwrap().dtype,
            DataType::String
        );
    }

    #[test]
    fn bad_coercion_is_type_error() {
        let err = interpreter("Int x = \"seven\";").interpret().unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        let err = interpreter("Bool b = 1;").interpret().unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn compound_assignment_is_not_implemented() {
        let err = interpreter("Int x = 1; x += 2;").interpret().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotImplemented);
        // Skipped code only needs to be well formed.
        interpreter("if F: x += 2; endif;").interpret().unwrap();
    }

    #[test]
    fn debug_directives_flip_trace_flags() {
        let mut interp = interpreter("debug Expr on; debug Assign on; debug Expr off;");
        interp.interpret().unwrap();
        assert_eq!(
            interp.trace(),
            Trace {
                tokens: false,
                expressions: false,
                assignments: true
            }
        );
    }

    #[test]
    fn bad_debug_directive() {
        let err = interpreter("debug Token maybe;").interpret().unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
        let err = interpreter("debug Tokens on;").interpret().unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
    }

    #[test]
    fn assign_trace_output() {
        let mut interp = interpreter("debug Assign on; Int x = 3;");
        interp.interpret().unwrap();
        assert_eq!(output(interp), "\t\t...Variable Name: x Value: 3\n");
    }

    #[test]
    fn token_trace_output() {
        let mut interp = interpreter("debug Token on; x;");
        let err = interp.interpret().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NameError);
        assert_eq!(output(interp), "\t\t...Token: Operand Identifier x\n");
    }

    #[test]
    fn missing_semicolon_after_declaration() {
        let err = interpreter("Int x\nInt y;").interpret().unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn declaration_needs_a_name() {
        let err = interpreter("Int 5;").interpret().unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
    }

    #[test]
    fn array_declarations_are_tagged() {
        let mut interp = interpreter("Int a[5]; String names[];");
        interp.interpret().unwrap();
        assert_eq!(interp.environment().declaration("a").unwrap().shape, Shape::FixedArray);
        assert_eq!(
            interp.environment().declaration("names").unwrap().shape,
            Shape::GrowableArray
        );
        let err = interpreter("Int a[3]; a = 1;").interpret().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotImplemented);
    }

    #[test]
    fn stray_block_end_at_top_level() {
        let err = interpreter("Int x = 1;\nendwhile;").interpret().unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn empty_program() {
        interpreter("").interpret().unwrap();
        interpreter("// nothing here\n").interpret().unwrap();
    }
}
