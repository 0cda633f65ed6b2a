//! Operator semantics for the four scalar types.
//!
//! Arithmetic takes its type from the left operand and converts the right
//! operand to match. Comparisons always produce a Bool (`T`/`F`).

use crate::error::ValueError;
use crate::token::{DataType, Operator};
use crate::value::{Numeric, Value};
use std::cmp::Ordering;

pub fn apply(operator: Operator, left: &Value, right: &Value) -> Result<Value, ValueError> {
    match operator {
        Operator::Plus | Operator::Minus | Operator::Star | Operator::Slash | Operator::Caret => {
            arithmetic(operator, left, right)
        }
        Operator::Less
        | Operator::Greater
        | Operator::LessEqual
        | Operator::GreaterEqual
        | Operator::EqualEqual
        | Operator::BangEqual => compare(operator, left, right),
        _ => Err(ValueError::type_error(format!(
            "'{}' is not a valid operator in an expression",
            operator
        ))),
    }
}

/// Unary minus: the operand times Int `-1`, operand on the left so that its
/// type is kept.
pub fn negate(value: &Value) -> Result<Value, ValueError> {
    arithmetic(Operator::Star, value, &Value::int(-1))
}

fn arithmetic(operator: Operator, left: &Value, right: &Value) -> Result<Value, ValueError> {
    if left.dtype == DataType::Bool || right.dtype == DataType::Bool {
        return Err(ValueError::type_error(format!(
            "'{}' cannot be applied to Bool operands ({} {} {})",
            operator, left.text, operator, right.text
        )));
    }
    match left.numeric()? {
        Numeric::Int(l) => int_arithmetic(operator, l, right.as_int()?),
        Numeric::Float(l) => float_arithmetic(operator, l, right.as_float()?),
    }
}

fn overflow(operator: Operator, l: i64, r: i64) -> ValueError {
    ValueError::numeric(format!("integer overflow in {} {} {}", l, operator, r))
}

fn int_arithmetic(operator: Operator, l: i64, r: i64) -> Result<Value, ValueError> {
    let result = match operator {
        Operator::Plus => l.checked_add(r),
        Operator::Minus => l.checked_sub(r),
        Operator::Star => l.checked_mul(r),
        Operator::Slash => {
            if r == 0 {
                return Err(ValueError::numeric("division by zero"));
            }
            l.checked_div(r)
        }
        Operator::Caret => return int_power(l, r),
        _ => unreachable!("not an arithmetic operator"),
    };
    result
        .map(Value::int)
        .ok_or_else(|| overflow(operator, l, r))
}

fn int_power(l: i64, r: i64) -> Result<Value, ValueError> {
    if r < 0 {
        return match l {
            0 => Err(ValueError::numeric(format!("division by zero in 0 ^ {}", r))),
            1 => Ok(Value::int(1)),
            -1 if r % 2 == 0 => Ok(Value::int(1)),
            -1 => Ok(Value::int(-1)),
            // Any other base has a magnitude below one.
            _ => Ok(Value::int(0)),
        };
    }
    let result = match l {
        0 | 1 => Some(if r == 0 { 1 } else { l }),
        -1 => Some(if r % 2 == 0 { 1 } else { -1 }),
        _ if r > i64::from(u32::max_value()) => None,
        _ => l.checked_pow(r as u32),
    };
    result
        .map(Value::int)
        .ok_or_else(|| overflow(Operator::Caret, l, r))
}

fn float_arithmetic(operator: Operator, l: f64, r: f64) -> Result<Value, ValueError> {
    let result = match operator {
        Operator::Plus => l + r,
        Operator::Minus => l - r,
        Operator::Star => l * r,
        Operator::Slash => {
            if r == 0.0 {
                return Err(ValueError::numeric("division by zero"));
            }
            l / r
        }
        Operator::Caret => l.powf(r),
        _ => unreachable!("not an arithmetic operator"),
    };
    if result.is_finite() {
        Ok(Value::float(result))
    } else {
        Err(ValueError::numeric(format!(
            "{} {} {} is not a finite number",
            l, operator, r
        )))
    }
}

fn compare(operator: Operator, left: &Value, right: &Value) -> Result<Value, ValueError> {
    let ordering = match left.dtype {
        DataType::Bool => {
            let (l, r) = (left.as_bool()?, right.as_bool()?);
            return match operator {
                Operator::EqualEqual => Ok(Value::boolean(l == r)),
                Operator::BangEqual => Ok(Value::boolean(l != r)),
                _ => Err(ValueError::type_error(format!(
                    "Bool values cannot be ordered with '{}'",
                    operator
                ))),
            };
        }
        DataType::String => left.text.as_str().cmp(right.text.as_str()),
        DataType::Int | DataType::Float => match (left.numeric()?, right.numeric()?) {
            (Numeric::Int(l), Numeric::Int(r)) => l.cmp(&r),
            (l, r) => {
                let (l, r) = (as_f64(l), as_f64(r));
                l.partial_cmp(&r).unwrap_or(Ordering::Equal)
            }
        },
    };
    let result = match operator {
        Operator::Less => ordering == Ordering::Less,
        Operator::Greater => ordering == Ordering::Greater,
        Operator::LessEqual => ordering != Ordering::Greater,
        Operator::GreaterEqual => ordering != Ordering::Less,
        Operator::EqualEqual => ordering == Ordering::Equal,
        Operator::BangEqual => ordering != Ordering::Equal,
        _ => unreachable!("not a comparison operator"),
    };
    Ok(Value::boolean(result))
}

fn as_f64(n: Numeric) -> f64 {
    match n {
        Numeric::Int(x) => x as f64,
        Numeric::Float(x) => x,
    }
}

#[cfg(test)]
mod operators_tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn int_arithmetic_basics() {
        let r = apply(Operator::Plus, &Value::int(2), &Value::int(3)).unwrap();
        assert_eq!(r.text, "5");
        assert_eq!(r.dtype, DataType::Int);
        let r = apply(Operator::Slash, &Value::int(7), &Value::int(2)).unwrap();
        assert_eq!(r.text, "3");
        let r = apply(Operator::Caret, &Value::int(2), &Value::int(10)).unwrap();
        assert_eq!(r.text, "1024");
    }

    #[test]
    fn left_operand_selects_type() {
        let r = apply(Operator::Plus, &Value::int(2), &Value::float(2.7)).unwrap();
        assert_eq!(r.text, "4");
        let r = apply(Operator::Plus, &Value::float(2.5), &Value::int(2)).unwrap();
        assert_eq!(r.text, "4.5");
        let r = apply(Operator::Star, &Value::string("3"), &Value::int(4)).unwrap();
        assert_eq!(r.dtype, DataType::Int);
        assert_eq!(r.text, "12");
    }

    #[test]
    fn negate_keeps_type() {
        assert_eq!(negate(&Value::int(4)).unwrap().text, "-4");
        let f = negate(&Value::float(2.5)).unwrap();
        assert_eq!(f.dtype, DataType::Float);
        assert_eq!(f.text, "-2.5");
    }

    #[test]
    fn numeric_errors() {
        let err = apply(Operator::Slash, &Value::int(1), &Value::int(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NumericError);
        let err = apply(Operator::Star, &Value::int(i64::max_value()), &Value::int(2)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NumericError);
        let err = apply(Operator::Slash, &Value::float(1.0), &Value::int(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NumericError);
    }

    #[test]
    fn type_errors() {
        let err = apply(Operator::Plus, &Value::boolean(true), &Value::int(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        let err = apply(Operator::Plus, &Value::int(1), &Value::string("x")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        let err = apply(Operator::Less, &Value::boolean(true), &Value::boolean(false)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    fn text(operator: Operator, left: Value, right: Value) -> String {
        apply(operator, &left, &right).unwrap().text
    }

    #[test]
    fn comparisons_encode_as_t_and_f() {
        assert_eq!(text(Operator::Less, Value::int(3), Value::int(5)), "T");
        assert_eq!(text(Operator::GreaterEqual, Value::int(3), Value::int(5)), "F");
        assert_eq!(text(Operator::EqualEqual, Value::int(3), Value::float(3.0)), "T");
        assert_eq!(
            text(Operator::Less, Value::string("abc"), Value::string("abd")),
            "T"
        );
        assert_eq!(
            text(Operator::BangEqual, Value::boolean(true), Value::boolean(false)),
            "T"
        );
        assert_eq!(
            text(Operator::EqualEqual, Value::int(10), Value::string("10")),
            "T"
        );
    }

    #[test]
    fn negative_integer_exponent() {
        assert_eq!(text(Operator::Caret, Value::int(2), Value::int(-1)), "0");
        assert_eq!(text(Operator::Caret, Value::int(1), Value::int(-3)), "1");
        assert_eq!(text(Operator::Caret, Value::int(-1), Value::int(-3)), "-1");
        assert_eq!(text(Operator::Caret, Value::int(-1), Value::int(-4)), "1");
        let err = apply(Operator::Caret, &Value::int(0), &Value::int(-1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NumericError);
    }

    #[test]
    fn huge_exponents() {
        let huge = Value::int(5_000_000_000);
        assert_eq!(text(Operator::Caret, Value::int(1), huge.clone()), "1");
        assert_eq!(text(Operator::Caret, Value::int(0), huge.clone()), "0");
        assert_eq!(text(Operator::Caret, Value::int(-1), huge.clone()), "1");
        assert_eq!(text(Operator::Caret, Value::int(-1), Value::int(5_000_000_001)), "-1");
        assert_eq!(text(Operator::Caret, Value::int(0), Value::int(0)), "1");
        let err = apply(Operator::Caret, &Value::int(2), &huge).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NumericError);
    }
}
