use crate::error::{ErrorKind, InterpretError};
use crate::interpreter::{found, Interpreter};
use crate::scanner::Mark;
use crate::token::{BlockEnd, Clause, DataType, Operator, Separator, Token, TokenType};
use crate::value::{Shape, Value};
use log::{debug, trace};
use std::io::Write;

const COLON: TokenType = TokenType::Separator(Separator::Colon);

/// Splits `text` on the literal `delimiter`. Trailing empty records are
/// dropped, except that empty text is a single empty record. An empty
/// delimiter splits into characters.
pub(crate) fn split_records(text: &str, delimiter: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let mut records: Vec<String> = if delimiter.is_empty() {
        text.chars().map(String::from).collect()
    } else {
        text.split(delimiter).map(String::from).collect()
    };
    while records.last().map_or(false, |r| r.is_empty()) {
        records.pop();
    }
    records
}

impl<W: Write> Interpreter<W> {
    /// `if cond: ... [else: ...] endif;` with `if` current. Ends on the `;`.
    pub(crate) fn if_statement(&mut self, exec: bool) -> Result<Value, InterpretError> {
        let opener = self.current().clone();
        let taken = if exec {
            self.condition(&opener)?
        } else {
            self.scanner.skip_until(COLON)?;
            false
        };
        self.statements(exec && taken, &[BlockEnd::Else, BlockEnd::EndIf], &opener)?;
        if self.current().is(TokenType::End(BlockEnd::Else)) {
            self.expect_next(Separator::Colon, "expected ':' after 'else'")?;
            self.statements(exec && !taken, &[BlockEnd::EndIf], &opener)?;
        }
        self.close_block(&opener, BlockEnd::EndIf)?;
        Ok(Value::void(";"))
    }

    /// `while cond: ... endwhile;` with `while` current. Ends on the `;`.
    pub(crate) fn while_statement(&mut self, exec: bool) -> Result<Value, InterpretError> {
        let opener = self.current().clone();
        let start = self.scanner.mark();
        if exec {
            let mut iterations = 0usize;
            while self.condition(&opener)? {
                self.statements(true, &[BlockEnd::EndWhile], &opener)?;
                self.close_block(&opener, BlockEnd::EndWhile)?;
                iterations += 1;
                trace!("line {}: while iteration {}", opener.line, iterations);
                self.scanner.rewind(start);
            }
        } else {
            self.scanner.skip_until(COLON)?;
        }
        self.statements(false, &[BlockEnd::EndWhile], &opener)?;
        self.close_block(&opener, BlockEnd::EndWhile)?;
        Ok(Value::void(";"))
    }

    /// The three `for` forms, with `for` current. Ends on the `;` after
    /// `endfor`.
    pub(crate) fn for_statement(&mut self, exec: bool) -> Result<Value, InterpretError> {
        let opener = self.current().clone();
        let start = self.scanner.mark();
        if exec {
            self.advance()?;
            let control = self.current().clone();
            if control.tokentype != TokenType::Identifier {
                return Err(self.error(
                    ErrorKind::SyntaxError,
                    format!(
                        "expected a control variable after 'for' but found {}",
                        found(&control)
                    ),
                ));
            }
            let next = self.next().clone();
            match next.tokentype {
                TokenType::Operator(Operator::Equal) => {
                    self.counting_for(&opener, &control, start)?
                }
                TokenType::Clause(Clause::In) => self.characters_for(&opener, &control, start)?,
                TokenType::Clause(Clause::From) => self.records_for(&opener, &control, start)?,
                _ => {
                    return Err(InterpretError::at(
                        ErrorKind::SyntaxError,
                        &next,
                        format!(
                            "expected '=', 'in' or 'from' after '{}' but found {}",
                            control.lexeme,
                            found(&next)
                        ),
                    ))
                }
            }
        } else {
            self.scanner.skip_until(COLON)?;
        }
        self.statements(false, &[BlockEnd::EndFor], &opener)?;
        self.close_block(&opener, BlockEnd::EndFor)?;
        Ok(Value::void(";"))
    }

    /// Evaluates a condition up to and including its `:`.
    fn condition(&mut self, opener: &Token) -> Result<bool, InterpretError> {
        let value = self.expression()?;
        if value.dtype != DataType::Bool {
            return Err(InterpretError::at(
                ErrorKind::TypeError,
                opener,
                format!(
                    "'{}' condition must be Bool but {} '{}' was found",
                    opener.lexeme, value.dtype, value.text
                ),
            ));
        }
        let taken = value.as_bool().map_err(|e| e.at(opener))?;
        let message = format!("expected ':' after the '{}' condition", opener.lexeme);
        self.expect_next(Separator::Colon, &message)?;
        Ok(taken)
    }

    fn expect_clause(&mut self, clause: Clause, message: &str) -> Result<(), InterpretError> {
        if self.next().is(TokenType::Clause(clause)) {
            return self.advance();
        }
        let next = self.next();
        Err(InterpretError::at(
            ErrorKind::SyntaxError,
            next,
            format!("{} but found {}", message, found(next)),
        ))
    }

    fn int_bound(&mut self, control: &Token) -> Result<i64, InterpretError> {
        let value = self.simple_expression()?;
        value.as_int().map_err(|e| {
            InterpretError::at(
                e.kind,
                control,
                format!("bound of '{}' loop: {}", control.lexeme, e.message),
            )
        })
    }

    /// Runs one pass of the loop body, then moves back to the header's `:`.
    fn loop_body(&mut self, opener: &Token, start: Mark) -> Result<(), InterpretError> {
        self.statements(true, &[BlockEnd::EndFor], opener)?;
        self.close_block(opener, BlockEnd::EndFor)?;
        self.scanner.rewind(start);
        self.scanner.skip_until(COLON)
    }

    /// `for cv = first to end [by step]:`
    fn counting_for(
        &mut self,
        opener: &Token,
        control: &Token,
        start: Mark,
    ) -> Result<(), InterpretError> {
        match self.environment.declaration(&control.lexeme).map(|d| d.dtype) {
            None => self
                .environment
                .declare(&control.lexeme, DataType::Int, Shape::Scalar, vec![])
                .map_err(|e| e.at(control))?,
            Some(DataType::Int) => {}
            Some(other) => {
                return Err(InterpretError::at(
                    ErrorKind::TypeError,
                    control,
                    format!("control variable '{}' is {}, not Int", control.lexeme, other),
                ))
            }
        }
        let first = self.assignment()?.as_int().map_err(|e| e.at(control))?;
        self.expect_clause(Clause::To, "expected 'to' in counting 'for'")?;
        let end = self.int_bound(control)?;
        let step = if self.next().is(TokenType::Clause(Clause::By)) {
            self.advance()?;
            self.int_bound(control)?
        } else {
            1
        };
        self.expect_next(Separator::Colon, "expected ':' after the 'for' header")?;
        if step <= 0 {
            return Err(InterpretError::at(
                ErrorKind::NumericError,
                control,
                format!("'for' step must be positive but is {}", step),
            ));
        }
        debug!(
            "line {}: counting for {} from {} to {} by {}",
            opener.line, control.lexeme, first, end, step
        );

        let mut i = first;
        while i < end {
            self.statements(true, &[BlockEnd::EndFor], opener)?;
            self.close_block(opener, BlockEnd::EndFor)?;
            let stored = match self.environment.get(&control.lexeme) {
                Some(value) => value.as_int().map_err(|e| e.at(control))?,
                None => i,
            };
            self.scanner.rewind(start);
            self.scanner.skip_until(COLON)?;
            let bumped = stored.checked_add(step);
            if let Some(bumped) = bumped {
                self.environment.put(&control.lexeme, Value::int(bumped));
                trace!("line {}: {} = {}", opener.line, control.lexeme, bumped);
            }
            i = match i.checked_add(step) {
                Some(next) => next,
                // Past every Int, so past `end` too.
                None => break,
            };
            if bumped.is_none() && i < end {
                return Err(InterpretError::at(
                    ErrorKind::NumericError,
                    control,
                    format!("'{}' overflows", control.lexeme),
                ));
            }
        }
        Ok(())
    }

    /// `for item in text:` binds `item` to each character of `text`.
    fn characters_for(
        &mut self,
        opener: &Token,
        control: &Token,
        start: Mark,
    ) -> Result<(), InterpretError> {
        self.undeclared_control(control)?;
        self.advance()?;
        let source = self.simple_expression()?;
        self.expect_next(Separator::Colon, "expected ':' after the 'for' header")?;
        debug!(
            "line {}: for {} in {} characters",
            opener.line,
            control.lexeme,
            source.text.chars().count()
        );
        let characters: Vec<String> = source.text.chars().map(String::from).collect();
        self.iterate(opener, control, start, characters)
    }

    /// `for cv from text by delimiter:` binds `cv` to each record of `text`.
    fn records_for(
        &mut self,
        opener: &Token,
        control: &Token,
        start: Mark,
    ) -> Result<(), InterpretError> {
        self.undeclared_control(control)?;
        self.advance()?;
        let source = self.simple_expression()?;
        self.expect_clause(Clause::By, "expected 'by' and a delimiter")?;
        let delimiter = self.simple_expression()?;
        self.expect_next(Separator::Colon, "expected ':' after the 'for' header")?;
        let records = split_records(&source.text, &delimiter.text);
        debug!(
            "line {}: for {} from {} records",
            opener.line,
            control.lexeme,
            records.len()
        );
        self.iterate(opener, control, start, records)
    }

    fn undeclared_control(&self, control: &Token) -> Result<(), InterpretError> {
        if self.environment.is_declared(&control.lexeme) {
            return Err(InterpretError::at(
                ErrorKind::NameError,
                control,
                format!("control variable '{}' is already declared", control.lexeme),
            ));
        }
        Ok(())
    }

    fn iterate(
        &mut self,
        opener: &Token,
        control: &Token,
        start: Mark,
        items: Vec<String>,
    ) -> Result<(), InterpretError> {
        self.environment
            .declare(&control.lexeme, DataType::String, Shape::Scalar, vec![])
            .map_err(|e| e.at(control))?;
        for item in items {
            trace!("line {}: {} = {:?}", opener.line, control.lexeme, item);
            self.environment.put(&control.lexeme, Value::string(item));
            self.loop_body(opener, start)?;
        }
        Ok(())
    }
}
