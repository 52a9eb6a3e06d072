//! Правило маскирования колонки

use crate::common::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Алгоритм маскирования, привязанный к колонке
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    /// Значение не маскируется
    Keep,
    /// Полное маскирование
    Full,
    /// Маскирование середины с прореживанием
    Middle,
    /// Видимы только первые символы
    Left,
    /// Видимы только последние символы
    Right,
    /// Замена совпадений регулярного выражения
    Regex,
    /// Одностороннее хеширование
    Hash,
}

impl RuleType {
    /// Все типы правил в порядке индексов таблицы диспетчеризации
    pub const ALL: [RuleType; 7] = [
        RuleType::Keep,
        RuleType::Full,
        RuleType::Middle,
        RuleType::Left,
        RuleType::Right,
        RuleType::Regex,
        RuleType::Hash,
    ];

    /// Индекс типа в таблице диспетчеризации
    pub fn index(self) -> usize {
        self as usize
    }

    /// Каноническое имя типа
    pub fn name(self) -> &'static str {
        match self {
            RuleType::Keep => "keep",
            RuleType::Full => "full",
            RuleType::Middle => "middle",
            RuleType::Left => "left",
            RuleType::Right => "right",
            RuleType::Regex => "regex",
            RuleType::Hash => "hash",
        }
    }

    /// Применим ли тип только к строковым колонкам при перезаписи плана
    pub fn requires_string(self) -> bool {
        matches!(
            self,
            RuleType::Middle | RuleType::Left | RuleType::Right | RuleType::Regex | RuleType::Hash
        )
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(RuleType::Keep),
            "full" | "mask_full" => Ok(RuleType::Full),
            "middle" | "mask_middle" | "partial" => Ok(RuleType::Middle),
            "left" | "mask_left" => Ok(RuleType::Left),
            "right" | "mask_right" => Ok(RuleType::Right),
            "regex" => Ok(RuleType::Regex),
            "hash" => Ok(RuleType::Hash),
            _ => Err(format!("Unsupported rule type: {}", s)),
        }
    }
}

/// Переопределения длин видимых фрагментов из параметров правила
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LengthOverrides {
    /// Сколько символов оставить в начале
    pub pre: Option<usize>,
    /// Сколько символов оставить в конце
    pub post: Option<usize>,
}

/// Правило маскирования колонки
///
/// Идентичность правила: `(schema, table, column)`, колонка сравнивается без учета регистра.
/// Правило неизменяемо после создания; параметры проверяются в конструкторе,
/// поэтому перезапись плана никогда не видит некорректное правило.
#[derive(Debug, Clone, Serialize)]
pub struct MaskingRule {
    schema: String,
    table: String,
    column: String,
    rule_type: RuleType,
    params: Vec<String>,
    enabled: bool,
    #[serde(skip)]
    column_key: String,
    #[serde(skip)]
    lengths: LengthOverrides,
    #[serde(skip)]
    pattern: Option<Regex>,
}

impl MaskingRule {
    /// Создает правило, проверяя параметры для его типа
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        rule_type: RuleType,
        params: Vec<String>,
        enabled: bool,
    ) -> Result<Self> {
        let schema = schema.into();
        let table = table.into();
        let column = column.into();

        if schema.is_empty() || table.is_empty() || column.is_empty() {
            return Err(Error::validation(
                "schema, table and column must be non-empty",
            ));
        }

        // Пустое поле оставляет значение по умолчанию для своей позиции
        let mut params: Vec<String> = params.into_iter().map(|p| p.trim().to_string()).collect();
        while params.last().is_some_and(|p| p.is_empty()) {
            params.pop();
        }

        let mut lengths = LengthOverrides::default();
        let mut pattern = None;

        match rule_type {
            RuleType::Full | RuleType::Middle => {
                lengths.pre = parse_length(&params, 0)?;
                lengths.post = parse_length(&params, 1)?;
            }
            RuleType::Left => lengths.pre = parse_length(&params, 0)?,
            RuleType::Right => lengths.post = parse_length(&params, 0)?,
            RuleType::Regex => {
                if let Some(source) = params.first().filter(|p| !p.is_empty()) {
                    let compiled = Regex::new(source).map_err(|e| {
                        Error::validation(format!("invalid pattern '{}': {}", source, e))
                    })?;
                    pattern = Some(compiled);
                }
            }
            RuleType::Keep | RuleType::Hash => {}
        }

        Ok(Self {
            column_key: column.to_lowercase(),
            schema,
            table,
            column,
            rule_type,
            params,
            enabled,
            lengths,
            pattern,
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Скомпилированный шаблон для правил `Regex`
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// Длина видимого префикса: параметр правила или значение по умолчанию
    pub fn pre_length(&self, default: usize) -> usize {
        self.lengths.pre.unwrap_or(default)
    }

    /// Длина видимого суффикса: параметр правила или значение по умолчанию
    pub fn post_length(&self, default: usize) -> usize {
        self.lengths.post.unwrap_or(default)
    }

    /// Ключ таблицы `schema.table`
    pub fn table_key(&self) -> String {
        table_key(&self.schema, &self.table)
    }

    /// Полное имя колонки `schema.table.column`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.schema, self.table, self.column)
    }

    /// Сравнивает колонку с уже приведенным к нижнему регистру именем
    pub(crate) fn matches_column_key(&self, lowercase_column: &str) -> bool {
        self.column_key == lowercase_column
    }

    /// Сравнивает колонку без учета регистра
    pub fn matches_column(&self, column: &str) -> bool {
        self.matches_column_key(&column.to_lowercase())
    }
}

impl PartialEq for MaskingRule {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self.table == other.table
            && self.column_key == other.column_key
            && self.rule_type == other.rule_type
            && self.params == other.params
            && self.enabled == other.enabled
    }
}

impl fmt::Display for MaskingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.qualified_name(), self.rule_type)?;
        if !self.params.is_empty() {
            write!(f, "({})", self.params.join(", "))?;
        }
        Ok(())
    }
}

/// Ключ таблицы в снимке правил
pub fn table_key(schema: &str, table: &str) -> String {
    format!("{}.{}", schema, table)
}

fn parse_length(params: &[String], position: usize) -> Result<Option<usize>> {
    match params.get(position).filter(|raw| !raw.is_empty()) {
        None => Ok(None),
        Some(raw) => raw.parse::<usize>().map(Some).map_err(|_| {
            Error::validation(format!("length parameter '{}' is not a number", raw))
        }),
    }
}
