//! Эталонное вычисление выражений проекции над строкой значений
//!
//! Поддерживает набор операторов, который порождает перезапись проекций.
//! Семантика NULL стандартная для SQL: NULL в аргументе дает NULL, кроме CASE.

use crate::common::{Error, Result, Row, SqlType, Value};
use crate::masking::hash_value;
use crate::relational::tree::{Expr, Operator, ProjectNode};
use regex::Regex;

/// Вычисляет выражение над строкой входа
pub fn evaluate(expr: &Expr, row: &[Value]) -> Result<Value> {
    match expr {
        Expr::ColumnRef { index } => row.get(*index).cloned().ok_or_else(|| {
            Error::evaluation(format!(
                "column ${} is out of range for row of width {}",
                index,
                row.len()
            ))
        }),
        Expr::Literal { value, .. } => Ok(value.clone()),
        Expr::Call {
            operator,
            operands,
            sql_type,
        } => evaluate_call(operator, operands, sql_type, row),
    }
}

/// Вычисляет все выражения проекции для каждой строки
pub fn evaluate_projection(project: &ProjectNode, rows: &[Row]) -> Result<Vec<Row>> {
    rows.iter()
        .map(|row| {
            project
                .expressions
                .iter()
                .map(|expr| evaluate(expr, row))
                .collect::<Result<Row>>()
        })
        .collect()
}

fn evaluate_call(
    operator: &Operator,
    operands: &[Expr],
    sql_type: &SqlType,
    row: &[Value],
) -> Result<Value> {
    // CASE вычисляет ветви лениво
    if *operator == Operator::Case {
        return evaluate_case(operands, row);
    }

    let args = operands
        .iter()
        .map(|operand| evaluate(operand, row))
        .collect::<Result<Vec<_>>>()?;
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }

    match operator {
        Operator::Substring => {
            expect_arity(operator, &args, 3)?;
            let text = text_arg(&args[0]);
            let start = integer_arg(operator, &args[1])?;
            let count = integer_arg(operator, &args[2])?;
            Ok(Value::Text(substring(&text, start, count)))
        }
        Operator::Concat => Ok(Value::Text(
            args.iter().map(text_arg).collect::<String>(),
        )),
        Operator::CharLength => {
            expect_arity(operator, &args, 1)?;
            Ok(Value::Integer(text_arg(&args[0]).chars().count() as i64))
        }
        Operator::Repeat => {
            expect_arity(operator, &args, 2)?;
            let count = integer_arg(operator, &args[1])?.max(0) as usize;
            Ok(Value::Text(text_arg(&args[0]).repeat(count)))
        }
        Operator::Plus | Operator::Minus => {
            expect_arity(operator, &args, 2)?;
            let left = integer_arg(operator, &args[0])?;
            let right = integer_arg(operator, &args[1])?;
            let result = if *operator == Operator::Plus {
                left.checked_add(right)
            } else {
                left.checked_sub(right)
            };
            result
                .map(Value::Integer)
                .ok_or_else(|| Error::evaluation(format!("integer overflow in {}", operator)))
        }
        Operator::Equals => {
            expect_arity(operator, &args, 2)?;
            Ok(Value::Boolean(text_arg(&args[0]) == text_arg(&args[1])))
        }
        Operator::LessOrEqual | Operator::GreaterThan => {
            expect_arity(operator, &args, 2)?;
            let left = integer_arg(operator, &args[0])?;
            let right = integer_arg(operator, &args[1])?;
            Ok(Value::Boolean(if *operator == Operator::LessOrEqual {
                left <= right
            } else {
                left > right
            }))
        }
        Operator::RegexpReplace => {
            expect_arity(operator, &args, 3)?;
            let pattern = Regex::new(&text_arg(&args[1]))
                .map_err(|e| Error::evaluation(format!("invalid pattern: {}", e)))?;
            let replacement = text_arg(&args[2]);
            Ok(Value::Text(
                pattern
                    .replace_all(&text_arg(&args[0]), replacement.as_str())
                    .into_owned(),
            ))
        }
        Operator::Hash => {
            expect_arity(operator, &args, 1)?;
            Ok(Value::Text(hash_value(&text_arg(&args[0]))))
        }
        Operator::Cast => {
            expect_arity(operator, &args, 1)?;
            cast(&args[0], sql_type)
        }
        Operator::Case => evaluate_case(operands, row),
    }
}

/// CASE WHEN cond THEN a [WHEN cond THEN b ...] [ELSE z] END
fn evaluate_case(operands: &[Expr], row: &[Value]) -> Result<Value> {
    let mut pairs = operands.chunks_exact(2);
    for pair in pairs.by_ref() {
        if evaluate(&pair[0], row)? == Value::Boolean(true) {
            return evaluate(&pair[1], row);
        }
    }
    match pairs.remainder() {
        [otherwise] => evaluate(otherwise, row),
        _ => Ok(Value::Null),
    }
}

/// Подстрока с позиции `start` (с единицы) длиной `count` символов
fn substring(text: &str, start: i64, count: i64) -> String {
    // Позиции до начала строки съедают часть длины, как в SQL
    let end = start.saturating_add(count.max(0));
    let from = start.max(1);
    if end <= from {
        return String::new();
    }
    text.chars()
        .skip((from - 1) as usize)
        .take((end - from) as usize)
        .collect()
}

fn cast(value: &Value, target: &SqlType) -> Result<Value> {
    if target.is_string() {
        return Ok(Value::Text(text_arg(value)));
    }
    if target.is_integer() {
        return value
            .as_integer()
            .map(Value::Integer)
            .ok_or_else(|| Error::evaluation(format!("cannot cast '{}' to {}", value, target)));
    }
    if target.is_fractional() {
        return match value {
            Value::Decimal(d) => Ok(Value::Decimal(*d)),
            Value::Integer(i) => Ok(Value::Decimal(*i as f64)),
            other => text_arg(other)
                .trim()
                .parse::<f64>()
                .map(Value::Decimal)
                .map_err(|_| Error::evaluation(format!("cannot cast '{}' to {}", other, target))),
        };
    }
    if *target == SqlType::Boolean {
        return match value {
            Value::Boolean(b) => Ok(Value::Boolean(*b)),
            other => match text_arg(other).trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Boolean(true)),
                "false" | "0" => Ok(Value::Boolean(false)),
                _ => Err(Error::evaluation(format!(
                    "cannot cast '{}' to {}",
                    other, target
                ))),
            },
        };
    }
    Ok(value.clone())
}

fn text_arg(value: &Value) -> String {
    value.as_text().map(|text| text.into_owned()).unwrap_or_default()
}

fn integer_arg(operator: &Operator, value: &Value) -> Result<i64> {
    value.as_integer().ok_or_else(|| {
        Error::evaluation(format!(
            "{} expects an integer argument, got '{}'",
            operator, value
        ))
    })
}

fn expect_arity(operator: &Operator, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(Error::evaluation(format!(
            "{} expects {} arguments, got {}",
            operator,
            expected,
            args.len()
        )));
    }
    Ok(())
}
