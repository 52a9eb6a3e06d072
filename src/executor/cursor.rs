//! Маскирование результатов на уровне курсора
//!
//! Используется, когда шлюз сессии не может передать реляционное дерево
//! (например, для заранее подготовленного запроса). Маскирование выполняется
//! целиком для каждого выбранного фрейма.

use crate::common::{
    Error, LineagePolicy, Result, Row, SqlType, StrategySettings, Value, PARALLEL_FRAME_THRESHOLD,
};
use crate::masking::{mask_full, mask_value, VisibleSpan};
use crate::rules::{MaskingRule, MaskingRuleStore, RuleSnapshot, RuleType};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Источник строк результата
pub trait RowCursor: Send {
    /// Получить следующую строку результата
    fn next(&mut self) -> Result<Option<Row>>;

    /// Освободить ресурсы курсора
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Курсор над строками в памяти
#[derive(Debug)]
pub struct VecCursor {
    rows: std::vec::IntoIter<Row>,
    closed: bool,
}

impl VecCursor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RowCursor for VecCursor {
    fn next(&mut self) -> Result<Option<Row>> {
        if self.closed {
            return Err(Error::validation("cursor is closed"));
        }
        Ok(self.rows.next())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Метаданные колонки результата; пустая строка означает отсутствие значения
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub schema_name: String,
    pub table_name: String,
    pub catalog_name: String,
    pub sql_type: SqlType,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            schema_name: String::new(),
            table_name: String::new(),
            catalog_name: String::new(),
            sql_type,
        }
    }

    /// Устанавливает схему и таблицу колонки
    pub fn with_table(mut self, schema: impl Into<String>, table: impl Into<String>) -> Self {
        self.schema_name = schema.into();
        self.table_name = table.into();
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog_name = catalog.into();
        self
    }

    /// Схема колонки; если драйвер ее не сообщил, используется имя каталога
    pub fn effective_schema(&self) -> &str {
        if self.schema_name.is_empty() {
            &self.catalog_name
        } else {
            &self.schema_name
        }
    }
}

/// Порция строк результата
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Позиция первой строки фрейма в результате
    pub offset: usize,
    /// Больше строк нет
    pub done: bool,
    pub rows: Vec<Row>,
}

impl Frame {
    pub fn new(offset: usize, done: bool, rows: Vec<Row>) -> Self {
        Self { offset, done, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Решение для одной колонки фрейма
#[derive(Debug, Clone)]
enum ColumnPlan {
    PassThrough,
    Rule(MaskingRule),
    /// Таблица колонки неизвестна, а политика требует маскирования
    MaskByDefault,
}

fn plan_columns(
    columns: &[ColumnMetadata],
    snapshot: &RuleSnapshot,
    policy: LineagePolicy,
) -> Vec<ColumnPlan> {
    columns
        .iter()
        .map(|column| {
            if column.table_name.is_empty() {
                return match policy {
                    LineagePolicy::FailOpen => ColumnPlan::PassThrough,
                    LineagePolicy::FailClosed => ColumnPlan::MaskByDefault,
                };
            }
            match snapshot.lookup(column.effective_schema(), &column.table_name, &column.name) {
                Some(rule) if rule.rule_type() != RuleType::Keep => ColumnPlan::Rule(rule.clone()),
                _ => ColumnPlan::PassThrough,
            }
        })
        .collect()
}

fn mask_cell(value: &Value, plan: &ColumnPlan, settings: &StrategySettings) -> Value {
    match plan {
        ColumnPlan::PassThrough => value.clone(),
        ColumnPlan::Rule(rule) => mask_value(value, rule, settings),
        ColumnPlan::MaskByDefault => match value.as_text() {
            Some(text) => {
                let span = VisibleSpan::new(settings.full_pre_length, settings.full_post_length);
                let masked = mask_full(&text, span, settings.mask_char);
                if masked == *text {
                    value.clone()
                } else {
                    Value::Text(masked)
                }
            }
            None => Value::Null,
        },
    }
}

fn mask_row(row: &[Value], plans: &[ColumnPlan], settings: &StrategySettings) -> Row {
    row.iter()
        .zip(plans)
        .map(|(value, plan)| mask_cell(value, plan, settings))
        .collect()
}

/// Маскирует все строки фрейма по одному снимку правил.
///
/// Ширина каждой строки должна совпадать с числом колонок.
pub fn mask_frame(
    frame: Frame,
    columns: &[ColumnMetadata],
    snapshot: &RuleSnapshot,
    settings: &StrategySettings,
    policy: LineagePolicy,
) -> Result<Frame> {
    if let Some((position, row)) = frame
        .rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != columns.len())
    {
        return Err(Error::validation(format!(
            "row {} has {} values but {} columns are described",
            frame.offset + position,
            row.len(),
            columns.len()
        )));
    }

    let plans = plan_columns(columns, snapshot, policy);
    if plans.iter().all(|plan| matches!(plan, ColumnPlan::PassThrough)) {
        return Ok(frame);
    }

    let rows: Vec<Row> = if frame.rows.len() >= PARALLEL_FRAME_THRESHOLD {
        frame
            .rows
            .par_iter()
            .map(|row| mask_row(row, &plans, settings))
            .collect()
    } else {
        frame
            .rows
            .iter()
            .map(|row| mask_row(row, &plans, settings))
            .collect()
    };

    Ok(Frame::new(frame.offset, frame.done, rows))
}

/// Статистика адаптера
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorStatistics {
    /// Количество выданных фреймов
    pub frames_fetched: usize,
    /// Количество выданных строк
    pub rows_fetched: usize,
}

/// Обертка курсора, маскирующая каждый выбранный фрейм
pub struct CursorMaskingAdapter<C: RowCursor> {
    inner: C,
    columns: Vec<ColumnMetadata>,
    store: Arc<MaskingRuleStore>,
    settings: StrategySettings,
    policy: LineagePolicy,
    offset: usize,
    done: bool,
    statistics: CursorStatistics,
}

impl<C: RowCursor> CursorMaskingAdapter<C> {
    pub fn new(
        inner: C,
        columns: Vec<ColumnMetadata>,
        store: Arc<MaskingRuleStore>,
        settings: StrategySettings,
        policy: LineagePolicy,
    ) -> Self {
        Self {
            inner,
            columns,
            store,
            settings,
            policy,
            offset: 0,
            done: false,
            statistics: CursorStatistics::default(),
        }
    }

    /// Выбирает до `max_rows` строк (0 - все оставшиеся) и возвращает их уже маскированными
    pub fn fetch(&mut self, max_rows: usize) -> Result<Frame> {
        let mut rows = Vec::new();
        while !self.done && (max_rows == 0 || rows.len() < max_rows) {
            match self.inner.next()? {
                Some(row) => rows.push(row),
                None => self.done = true,
            }
        }

        let frame = Frame::new(self.offset, self.done, rows);
        let masked = self.mask_frame(frame)?;

        self.offset += masked.len();
        self.statistics.frames_fetched += 1;
        self.statistics.rows_fetched += masked.len();
        Ok(masked)
    }

    /// Маскирует уже выбранный фрейм по текущему снимку правил
    pub fn mask_frame(&self, frame: Frame) -> Result<Frame> {
        let snapshot = self.store.current_snapshot();
        mask_frame(frame, &self.columns, &snapshot, &self.settings, self.policy)
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn statistics(&self) -> &CursorStatistics {
        &self.statistics
    }

    /// Закрывает внутренний курсор
    pub fn close(&mut self) -> Result<()> {
        self.done = true;
        self.inner.close()
    }

    /// Возвращает внутренний курсор
    pub fn into_inner(self) -> C {
        self.inner
    }
}
