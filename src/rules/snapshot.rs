//! Неизменяемый снимок набора правил маскирования
//!
//! Снимок строится целиком из одного чтения источника и никогда не изменяется на месте.
//! Формат записи (одна на строку, `#` начинает комментарий):
//!
//! ```text
//! schema,table,column,ruleType,param1,param2,...,enabled
//! ```

use crate::common::constants::{
    MIN_RULE_FIELDS, RULE_COMMENT_PREFIX, RULE_FIELD_SEPARATOR, RULE_HEADER_FIRST_FIELD,
};
use crate::common::{Error, Result};
use crate::rules::rule::{table_key, MaskingRule, RuleType};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;
use std::time::SystemTime;

/// Некорректная запись, пропущенная при загрузке
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedRecord {
    /// Номер строки (с единицы)
    pub line: usize,
    /// Причина отказа
    pub reason: String,
}

/// Итоги одной загрузки
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Принятые правила
    pub accepted: usize,
    /// Отключенные записи (`enabled=false`)
    pub disabled: usize,
    /// Пропущенные некорректные записи
    pub malformed: Vec<MalformedRecord>,
}

impl LoadReport {
    /// Общее число записей, не считая комментариев и заголовка
    pub fn total_records(&self) -> usize {
        self.accepted + self.disabled + self.malformed.len()
    }

    /// Источник содержал записи, но ни одна не разобрана
    pub fn is_unparseable(&self) -> bool {
        self.accepted == 0 && self.disabled == 0 && !self.malformed.is_empty()
    }
}

/// Снимок правил: `schema.table` -> упорядоченный список правил
#[derive(Debug, Clone, Serialize)]
pub struct RuleSnapshot {
    tables: IndexMap<String, Vec<MaskingRule>>,
    source: Option<String>,
    loaded_at: SystemTime,
    report: LoadReport,
}

impl Default for RuleSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl RuleSnapshot {
    /// Пустой снимок
    pub fn empty() -> Self {
        Self {
            tables: IndexMap::new(),
            source: None,
            loaded_at: SystemTime::now(),
            report: LoadReport::default(),
        }
    }

    /// Собирает снимок из готовых правил; отключенные правила отбрасываются
    pub fn from_rules(rules: impl IntoIterator<Item = MaskingRule>) -> Self {
        let mut snapshot = Self::empty();
        for rule in rules {
            if rule.is_enabled() {
                snapshot.report.accepted += 1;
                snapshot.insert(rule);
            } else {
                snapshot.report.disabled += 1;
            }
        }
        snapshot
    }

    /// Разбирает текст правил; некорректные записи пропускаются с предупреждением
    pub fn parse(text: &str) -> Self {
        Self::parse_with_source(text, None)
    }

    /// Разбирает текст правил, запоминая имя источника
    pub fn parse_with_source(text: &str, source: Option<&str>) -> Self {
        let mut snapshot = Self::empty();
        snapshot.source = source.map(str::to_string);
        let source_name = source.unwrap_or("<inline>");
        let mut first_record = true;

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(RULE_COMMENT_PREFIX) {
                continue;
            }

            if first_record {
                first_record = false;
                if is_header(line) {
                    continue;
                }
            }

            match parse_record(line_no, line) {
                Ok(Some(rule)) => {
                    snapshot.report.accepted += 1;
                    snapshot.insert(rule);
                }
                Ok(None) => snapshot.report.disabled += 1,
                Err(e) => {
                    log::warn!("Пропущена запись правила маскирования в {}: {}", source_name, e);
                    snapshot.report.malformed.push(MalformedRecord {
                        line: line_no,
                        reason: e.to_string(),
                    });
                }
            }
        }

        snapshot
    }

    /// Разбирает текст и отвергает источник, в котором не разобрана ни одна запись
    pub fn parse_strict(text: &str, source: Option<&str>) -> Result<Self> {
        let snapshot = Self::parse_with_source(text, source);
        if snapshot.report.is_unparseable() {
            let line = snapshot.report.malformed[0].line;
            return Err(Error::rule_parse(
                line,
                format!(
                    "no valid records in {} ({} malformed)",
                    source.unwrap_or("<inline>"),
                    snapshot.report.malformed.len()
                ),
            ));
        }
        Ok(snapshot)
    }

    /// Загружает снимок из файла
    pub fn load(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config_load(name.clone(), e.to_string()))?;
        Self::parse_strict(&text, Some(&name))
    }

    fn insert(&mut self, rule: MaskingRule) {
        self.tables.entry(rule.table_key()).or_default().push(rule);
    }

    /// Ищет правило для колонки; при дубликатах побеждает первое
    pub fn lookup(&self, schema: &str, table: &str, column: &str) -> Option<&MaskingRule> {
        let rules = self.tables.get(&table_key(schema, table))?;
        let column_key = column.to_lowercase();
        rules.iter().find(|rule| rule.matches_column_key(&column_key))
    }

    /// Все правила таблицы в порядке загрузки
    pub fn rules_for_table(&self, schema: &str, table: &str) -> &[MaskingRule] {
        self.tables
            .get(&table_key(schema, table))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Итератор по всем правилам снимка
    pub fn rules(&self) -> impl Iterator<Item = &MaskingRule> {
        self.tables.values().flatten()
    }

    /// Ключи таблиц, для которых есть правила
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Количество правил
    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn loaded_at(&self) -> SystemTime {
        self.loaded_at
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}

fn is_header(line: &str) -> bool {
    line.split(RULE_FIELD_SEPARATOR)
        .next()
        .map(|field| field.trim().eq_ignore_ascii_case(RULE_HEADER_FIRST_FIELD))
        .unwrap_or(false)
}

/// Разбирает одну запись; `Ok(None)` для отключенного правила
fn parse_record(line_no: usize, line: &str) -> Result<Option<MaskingRule>> {
    let fields: Vec<&str> = line.split(RULE_FIELD_SEPARATOR).map(str::trim).collect();
    if fields.len() < MIN_RULE_FIELDS {
        return Err(Error::rule_parse(
            line_no,
            format!(
                "expected at least {} fields, found {}",
                MIN_RULE_FIELDS,
                fields.len()
            ),
        ));
    }

    let enabled_field = fields[fields.len() - 1];
    let enabled = match enabled_field.to_lowercase().as_str() {
        "true" => true,
        "false" => false,
        _ => {
            return Err(Error::rule_parse(
                line_no,
                format!("enabled flag must be true or false, found '{}'", enabled_field),
            ))
        }
    };
    if !enabled {
        return Ok(None);
    }

    let rule_type: RuleType = fields[3]
        .parse()
        .map_err(|e: String| Error::rule_parse(line_no, e))?;
    let params = fields[4..fields.len() - 1]
        .iter()
        .map(|p| p.to_string())
        .collect();

    MaskingRule::new(fields[0], fields[1], fields[2], rule_type, params, true)
        .map(Some)
        .map_err(|e| Error::rule_parse(line_no, e.to_string()))
}
