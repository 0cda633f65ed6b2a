use crate::error::ValueError;
use crate::token::{DataType, Token, TokenType};
use std::fmt;
use std::fmt::Formatter;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Shape {
    Scalar,
    FixedArray,
    GrowableArray,
}

/// Parsed form of a numeric value's text, kept next to the text so that
/// arithmetic in loops does not re-parse it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

/// A runtime datum. The text is canonical; everything else is derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub text: String,
    pub dtype: DataType,
    pub shape: Shape,
    /// Text of the lexeme that ended the evaluation producing this value.
    pub terminator: String,
    numeric: Option<Numeric>,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

pub fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

/// Truncates toward zero, failing when the result does not fit an Int.
fn truncate(x: f64) -> Result<i64, ValueError> {
    let t = x.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    if t.is_finite() && t >= i64::min_value() as f64 && t < i64::max_value() as f64 {
        Ok(t as i64)
    } else {
        Err(ValueError::numeric(format!(
            "{} is out of range for an Int",
            format_float(x)
        )))
    }
}

fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

fn parse_float(text: &str) -> Option<f64> {
    let text = text.trim();
    // Rust accepts "inf" and "NaN"; the language does not.
    if text.is_empty() || text.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    text.parse::<f64>().ok()
}

impl Value {
    fn build(text: String, dtype: DataType, numeric: Option<Numeric>) -> Value {
        Value {
            text,
            dtype,
            shape: Shape::Scalar,
            terminator: String::new(),
            numeric,
        }
    }

    pub fn int(x: i64) -> Value {
        Value::build(x.to_string(), DataType::Int, Some(Numeric::Int(x)))
    }

    pub fn float(x: f64) -> Value {
        Value::build(format_float(x), DataType::Float, Some(Numeric::Float(x)))
    }

    pub fn boolean(x: bool) -> Value {
        Value::build(if x { "T" } else { "F" }.to_string(), DataType::Bool, None)
    }

    pub fn string(text: impl Into<String>) -> Value {
        Value::build(text.into(), DataType::String, None)
    }

    /// Result of a statement that produces no datum; only the terminator matters.
    pub fn void(terminator: impl Into<String>) -> Value {
        Value::string("").terminated(terminator)
    }

    /// The value a variable holds right after its declaration.
    pub fn zero(dtype: DataType, shape: Shape) -> Value {
        let mut value = match dtype {
            DataType::Int => Value::int(0),
            DataType::Float => Value::float(0.0),
            DataType::Bool => Value::boolean(false),
            DataType::String => Value::string(""),
        };
        value.shape = shape;
        value
    }

    /// Builds the value of a literal operand lexeme.
    pub fn literal(token: &Token) -> Result<Value, ValueError> {
        match token.tokentype {
            TokenType::Integer => parse_int(&token.lexeme).map(Value::int).ok_or_else(|| {
                ValueError::numeric(format!("integer literal '{}' is too large", token.lexeme))
            }),
            TokenType::Float => parse_float(&token.lexeme).map(Value::float).ok_or_else(|| {
                ValueError::numeric(format!("bad float literal '{}'", token.lexeme))
            }),
            TokenType::Boolean => Ok(Value::boolean(token.lexeme == "T")),
            TokenType::Str => Ok(Value::string(token.lexeme.clone())),
            _ => Err(ValueError::type_error(format!(
                "'{}' is not a literal",
                token.lexeme
            ))),
        }
    }

    pub fn terminated(mut self, terminator: impl Into<String>) -> Value {
        self.terminator = terminator.into();
        self
    }

    pub fn is_array(&self) -> bool {
        self.shape != Shape::Scalar
    }

    pub fn as_int(&self) -> Result<i64, ValueError> {
        match self.numeric {
            Some(Numeric::Int(x)) => Ok(x),
            Some(Numeric::Float(x)) => truncate(x),
            None => match self.dtype {
                DataType::Bool => Err(ValueError::type_error(format!(
                    "cannot use Bool '{}' as an Int",
                    self.text
                ))),
                _ => match parse_int(&self.text) {
                    Some(x) => Ok(x),
                    None => match parse_float(&self.text) {
                        Some(x) => truncate(x),
                        None => Err(ValueError::type_error(format!(
                            "'{}' is not a valid Int",
                            self.text
                        ))),
                    },
                },
            },
        }
    }

    pub fn as_float(&self) -> Result<f64, ValueError> {
        match self.numeric {
            Some(Numeric::Int(x)) => Ok(x as f64),
            Some(Numeric::Float(x)) => Ok(x),
            None => match self.dtype {
                DataType::Bool => Err(ValueError::type_error(format!(
                    "cannot use Bool '{}' as a Float",
                    self.text
                ))),
                _ => parse_float(&self.text).ok_or_else(|| {
                    ValueError::type_error(format!("'{}' is not a valid Float", self.text))
                }),
            },
        }
    }

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self.text.as_str() {
            "T" => Ok(true),
            "F" => Ok(false),
            _ => Err(ValueError::type_error(format!(
                "'{}' is not a valid Bool",
                self.text
            ))),
        }
    }

    /// Numeric view used by arithmetic: Int and Float values use their
    /// cached form, String values are read as Int first and then as Float.
    pub fn numeric(&self) -> Result<Numeric, ValueError> {
        if let Some(n) = self.numeric {
            return Ok(n);
        }
        match self.dtype {
            DataType::Bool => Err(ValueError::type_error(format!(
                "Bool '{}' is not numeric",
                self.text
            ))),
            _ => parse_int(&self.text)
                .map(Numeric::Int)
                .or_else(|| parse_float(&self.text).map(Numeric::Float))
                .ok_or_else(|| ValueError::type_error(format!("'{}' is not numeric", self.text))),
        }
    }

    /// Converts to the declared type of the variable receiving this value.
    pub fn coerce(&self, dtype: DataType) -> Result<Value, ValueError> {
        let coerced = match dtype {
            DataType::Int => Value::int(self.as_int()?),
            DataType::Float => Value::float(self.as_float()?),
            DataType::Bool => Value::boolean(self.as_bool()?),
            DataType::String => Value::string(self.text.clone()),
        };
        Ok(coerced.terminated(self.terminator.clone()))
    }
}
