//! Базовые типы данных слоя маскирования

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Объявленный SQL тип колонки или выражения
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Float,
    Double,
    /// Строка фиксированной длины
    Char,
    /// Строка переменной длины
    Varchar,
    Text,
    Date,
    Time,
    Timestamp,
    Binary,
    /// Тип неизвестен (например, NULL литерал без контекста)
    Null,
}

impl SqlType {
    /// Проверяет, является ли тип строковым
    pub fn is_string(&self) -> bool {
        matches!(self, SqlType::Char | SqlType::Varchar | SqlType::Text)
    }

    /// Проверяет, является ли тип целочисленным
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt
        )
    }

    /// Проверяет, является ли тип дробным числовым
    pub fn is_fractional(&self) -> bool {
        matches!(self, SqlType::Decimal | SqlType::Float | SqlType::Double)
    }

    /// Проверяет, является ли тип числовым
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_fractional()
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Decimal => "DECIMAL",
            SqlType::Float => "FLOAT",
            SqlType::Double => "DOUBLE",
            SqlType::Char => "CHAR",
            SqlType::Varchar => "VARCHAR",
            SqlType::Text => "TEXT",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Binary => "BINARY",
            SqlType::Null => "NULL",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for SqlType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BOOLEAN" | "BOOL" => Ok(SqlType::Boolean),
            "TINYINT" => Ok(SqlType::TinyInt),
            "SMALLINT" => Ok(SqlType::SmallInt),
            "INTEGER" | "INT" => Ok(SqlType::Integer),
            "BIGINT" | "LONG" => Ok(SqlType::BigInt),
            "DECIMAL" | "NUMERIC" => Ok(SqlType::Decimal),
            "FLOAT" | "REAL" => Ok(SqlType::Float),
            "DOUBLE" => Ok(SqlType::Double),
            "CHAR" => Ok(SqlType::Char),
            "VARCHAR" | "STRING" => Ok(SqlType::Varchar),
            "TEXT" => Ok(SqlType::Text),
            "DATE" => Ok(SqlType::Date),
            "TIME" => Ok(SqlType::Time),
            "TIMESTAMP" => Ok(SqlType::Timestamp),
            "BINARY" | "VARBINARY" | "BLOB" => Ok(SqlType::Binary),
            "NULL" => Ok(SqlType::Null),
            _ => Err(format!("Unsupported SQL type: {}", s)),
        }
    }
}

/// Скалярное значение ячейки результата
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl Value {
    /// Проверяет, является ли значение NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Строковое представление значения; для NULL возвращает None
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Boolean(b) => Some(Cow::Owned(b.to_string())),
            Value::Integer(i) => Some(Cow::Owned(i.to_string())),
            Value::Decimal(d) => Some(Cow::Owned(d.to_string())),
        }
    }

    /// Целочисленное представление значения, если оно есть
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Decimal(d) => Some(*d as i64),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Boolean(b) => Some(i64::from(*b)),
            Value::Null => None,
        }
    }

    /// Наиболее естественный SQL тип для значения
    pub fn natural_type(&self) -> SqlType {
        match self {
            Value::Null => SqlType::Null,
            Value::Boolean(_) => SqlType::Boolean,
            Value::Integer(_) => SqlType::BigInt,
            Value::Decimal(_) => SqlType::Decimal,
            Value::Text(_) => SqlType::Varchar,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("NULL"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Decimal(value)
    }
}

/// Строка результата: значения в порядке колонок
pub type Row = Vec<Value>;
