//! Тесты эталонного вычисления выражений

use crate::common::{Error, Result, SqlType, Value};
use crate::masking::hash_value;
use crate::relational::{evaluate, Expr, Operator};

fn call(operator: Operator, operands: Vec<Expr>, sql_type: SqlType) -> Expr {
    Expr::call(operator, operands, sql_type)
}

fn text(value: &str) -> Vec<Value> {
    vec![Value::from(value)]
}

#[test]
fn test_substring_is_one_based() -> Result<()> {
    let row = text("abcdef");
    let sub = |start: i64, count: i64| {
        call(
            Operator::Substring,
            vec![Expr::column(0), Expr::integer(start), Expr::integer(count)],
            SqlType::Varchar,
        )
    };

    assert_eq!(evaluate(&sub(1, 3), &row)?, Value::from("abc"));
    assert_eq!(evaluate(&sub(5, 10), &row)?, Value::from("ef"));
    assert_eq!(evaluate(&sub(7, 2), &row)?, Value::from(""));
    assert_eq!(evaluate(&sub(0, 2), &row)?, Value::from("a"));
    assert_eq!(evaluate(&sub(2, 0), &row)?, Value::from(""));
    Ok(())
}

#[test]
fn test_string_functions() -> Result<()> {
    let row = text("привет");

    let length = call(Operator::CharLength, vec![Expr::column(0)], SqlType::Integer);
    assert_eq!(evaluate(&length, &row)?, Value::Integer(6));

    let repeat = call(
        Operator::Repeat,
        vec![Expr::string("*"), Expr::integer(3)],
        SqlType::Varchar,
    );
    assert_eq!(evaluate(&repeat, &row)?, Value::from("***"));

    let negative = call(
        Operator::Repeat,
        vec![Expr::string("*"), Expr::integer(-1)],
        SqlType::Varchar,
    );
    assert_eq!(evaluate(&negative, &row)?, Value::from(""));

    let concat = call(
        Operator::Concat,
        vec![Expr::column(0), Expr::string("-"), Expr::integer(1)],
        SqlType::Varchar,
    );
    assert_eq!(evaluate(&concat, &row)?, Value::from("привет-1"));
    Ok(())
}

#[test]
fn test_arithmetic_and_comparison() -> Result<()> {
    let row: Vec<Value> = vec![];
    let minus = call(
        Operator::Minus,
        vec![Expr::integer(10), Expr::integer(4)],
        SqlType::Integer,
    );
    let plus = call(Operator::Plus, vec![minus, Expr::integer(1)], SqlType::Integer);
    assert_eq!(evaluate(&plus, &row)?, Value::Integer(7));

    let le = call(
        Operator::LessOrEqual,
        vec![Expr::integer(3), Expr::integer(3)],
        SqlType::Boolean,
    );
    assert_eq!(evaluate(&le, &row)?, Value::Boolean(true));

    let gt = call(
        Operator::GreaterThan,
        vec![Expr::integer(3), Expr::integer(3)],
        SqlType::Boolean,
    );
    assert_eq!(evaluate(&gt, &row)?, Value::Boolean(false));

    let eq = call(
        Operator::Equals,
        vec![Expr::string("a"), Expr::string("a")],
        SqlType::Boolean,
    );
    assert_eq!(evaluate(&eq, &row)?, Value::Boolean(true));
    Ok(())
}

#[test]
fn test_integer_overflow_is_an_error() {
    let row: Vec<Value> = vec![];
    let plus = call(
        Operator::Plus,
        vec![Expr::integer(i64::MAX), Expr::integer(1)],
        SqlType::BigInt,
    );
    assert!(matches!(evaluate(&plus, &row), Err(Error::Evaluation { .. })));

    let minus = call(
        Operator::Minus,
        vec![Expr::integer(i64::MIN), Expr::integer(1)],
        SqlType::BigInt,
    );
    assert!(matches!(evaluate(&minus, &row), Err(Error::Evaluation { .. })));
}

#[test]
fn test_case_evaluates_only_taken_branch() -> Result<()> {
    let row = text("abc");
    // Ветвь ELSE с ошибкой не вычисляется
    let broken = call(Operator::Plus, vec![Expr::column(0), Expr::integer(1)], SqlType::Integer);
    let case = call(
        Operator::Case,
        vec![
            Expr::literal(Value::Boolean(true), SqlType::Boolean),
            Expr::string("then"),
            broken.clone(),
        ],
        SqlType::Varchar,
    );
    assert_eq!(evaluate(&case, &row)?, Value::from("then"));

    let null_condition = call(
        Operator::Case,
        vec![
            Expr::literal(Value::Null, SqlType::Boolean),
            Expr::string("then"),
            Expr::string("else"),
        ],
        SqlType::Varchar,
    );
    assert_eq!(evaluate(&null_condition, &row)?, Value::from("else"));

    assert!(matches!(evaluate(&broken, &row), Err(Error::Evaluation { .. })));
    Ok(())
}

#[test]
fn test_regexp_replace_and_hash() -> Result<()> {
    let row = text("a1b22");
    let replace = call(
        Operator::RegexpReplace,
        vec![Expr::column(0), Expr::string("(?s)(.{1}).(.{0,1})"), Expr::string("${1}*${2}")],
        SqlType::Varchar,
    );
    assert_eq!(evaluate(&replace, &row)?, Value::from("a*b2*"));

    let hash = call(Operator::Hash, vec![Expr::column(0)], SqlType::Varchar);
    assert_eq!(evaluate(&hash, &row)?, Value::Text(hash_value("a1b22")));

    let invalid = call(
        Operator::RegexpReplace,
        vec![Expr::column(0), Expr::string("("), Expr::string("*")],
        SqlType::Varchar,
    );
    assert!(evaluate(&invalid, &row).is_err());
    Ok(())
}

#[test]
fn test_cast() -> Result<()> {
    let row: Vec<Value> = vec![];
    let cast = |value: Expr, target: SqlType| call(Operator::Cast, vec![value], target);

    assert_eq!(
        evaluate(&cast(Expr::string(" 42 "), SqlType::BigInt), &row)?,
        Value::Integer(42)
    );
    assert_eq!(
        evaluate(&cast(Expr::integer(3), SqlType::Double), &row)?,
        Value::Decimal(3.0)
    );
    assert_eq!(
        evaluate(&cast(Expr::integer(3), SqlType::Char), &row)?,
        Value::from("3")
    );
    assert_eq!(
        evaluate(&cast(Expr::string("TRUE"), SqlType::Boolean), &row)?,
        Value::Boolean(true)
    );
    assert!(evaluate(&cast(Expr::string("****"), SqlType::Integer), &row).is_err());
    Ok(())
}

#[test]
fn test_null_propagation_and_bad_reference() {
    let row = vec![Value::Null];
    let length = call(Operator::CharLength, vec![Expr::column(0)], SqlType::Integer);
    assert_eq!(evaluate(&length, &row).ok(), Some(Value::Null));

    assert!(matches!(
        evaluate(&Expr::column(3), &row),
        Err(Error::Evaluation { .. })
    ));
}
