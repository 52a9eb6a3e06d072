//! Перезапись проекций: маскирование прямых ссылок на защищенные колонки
//!
//! Для каждой ссылки на колонку в проекции определяется базовая таблица, по ней
//! ищется правило, и ссылка заменяется выражением, вычисляющим маскированное
//! значение с исходным объявленным типом. Исходное дерево не изменяется.

use crate::common::{Error, LineagePolicy, Result, SqlType, StrategySettings, Value};
use crate::relational::lineage::ColumnLineageResolver;
use crate::relational::tree::{Expr, Operator, ProjectNode, RelNode, RelRef};
use crate::rules::{MaskingRule, MaskingRuleStore, RuleSnapshot, RuleType};
use std::collections::HashSet;
use std::sync::Arc;

/// Перезапись проекций по одному снимку правил.
///
/// Снимок фиксируется при создании, поэтому все проекции запроса маскируются
/// по одному и тому же набору правил.
pub struct ExpressionRewriter<'a> {
    snapshot: Arc<RuleSnapshot>,
    settings: &'a StrategySettings,
    policy: LineagePolicy,
}

impl<'a> ExpressionRewriter<'a> {
    /// Создает перезапись по текущему снимку хранилища
    pub fn new(
        store: &MaskingRuleStore,
        settings: &'a StrategySettings,
        policy: LineagePolicy,
    ) -> Self {
        Self::with_snapshot(store.current_snapshot(), settings, policy)
    }

    pub fn with_snapshot(
        snapshot: Arc<RuleSnapshot>,
        settings: &'a StrategySettings,
        policy: LineagePolicy,
    ) -> Self {
        Self {
            snapshot,
            settings,
            policy,
        }
    }

    pub fn snapshot(&self) -> &RuleSnapshot {
        &self.snapshot
    }

    /// Перезаписывает одну проекцию.
    ///
    /// Если ни одно выражение не изменилось, возвращается тот же `Arc`, что и на входе.
    /// Узлы другого вида возвращаются без изменений.
    pub fn rewrite(&self, node: &RelRef) -> Result<RelRef> {
        self.rewrite_node(node, &HashSet::new())
            .map(|(rewritten, _)| rewritten)
    }

    /// Перезаписывает все проекции дерева снизу вверх.
    ///
    /// Неизмененные поддеревья переиспользуются; если ничего не изменилось,
    /// возвращается исходный корень. Колонки, уже маскированные внутренней
    /// проекцией, внешние проекции пропускают без повторного маскирования.
    pub fn rewrite_tree(&self, root: &RelRef) -> Result<RelRef> {
        self.rewrite_subtree(root).map(|(rewritten, _)| rewritten)
    }

    /// Возвращает перезаписанный узел и позиции его выхода, которые уже маскированы
    fn rewrite_subtree(&self, root: &RelRef) -> Result<(RelRef, HashSet<usize>)> {
        let inputs = root.inputs();
        let mut rewritten = Vec::with_capacity(inputs.len());
        let mut masked_inputs = Vec::with_capacity(inputs.len());
        let mut inputs_changed = false;

        for input in inputs {
            let (new_input, masked) = self.rewrite_subtree(input)?;
            inputs_changed |= !Arc::ptr_eq(&new_input, input);
            rewritten.push(new_input);
            masked_inputs.push(masked);
        }

        let node = if inputs_changed {
            let rebuilt = root
                .with_inputs(rewritten)
                .ok_or_else(|| Error::internal("input count changed during rewrite"))?;
            Arc::new(rebuilt)
        } else {
            Arc::clone(root)
        };

        match node.as_ref() {
            RelNode::Project(_) => {
                let masked_input = masked_inputs.pop().unwrap_or_default();
                self.rewrite_node(&node, &masked_input)
            }
            RelNode::Join(join) => {
                let mut masked_inputs = masked_inputs.into_iter();
                let mut masked = masked_inputs.next().unwrap_or_default();
                masked.extend(
                    masked_inputs
                        .next()
                        .unwrap_or_default()
                        .into_iter()
                        .map(|index| index + join.left_field_count),
                );
                Ok((node, masked))
            }
            RelNode::Filter(_) | RelNode::Other(_) if masked_inputs.len() == 1 => {
                let masked = masked_inputs.pop().unwrap_or_default();
                Ok((node, masked))
            }
            _ => Ok((node, HashSet::new())),
        }
    }

    /// Перезаписывает проекцию; `masked_input` - уже маскированные колонки входа
    fn rewrite_node(
        &self,
        node: &RelRef,
        masked_input: &HashSet<usize>,
    ) -> Result<(RelRef, HashSet<usize>)> {
        let RelNode::Project(project) = node.as_ref() else {
            return Ok((Arc::clone(node), HashSet::new()));
        };

        let mut changed = false;
        let mut masked = HashSet::new();
        let mut expressions = Vec::with_capacity(project.expressions.len());

        for (position, expr) in project.expressions.iter().enumerate() {
            if let Expr::ColumnRef { index } = expr {
                if masked_input.contains(index) {
                    masked.insert(position);
                    expressions.push(expr.clone());
                    continue;
                }
            }

            match self.rewrite_expression(project, position, expr)? {
                Some(rewritten) if rewritten != *expr => {
                    changed = true;
                    masked.insert(position);
                    expressions.push(rewritten);
                }
                _ => expressions.push(expr.clone()),
            }
        }

        if !changed {
            return Ok((Arc::clone(node), masked));
        }

        let rewritten = Arc::new(RelNode::Project(ProjectNode {
            input: Arc::clone(&project.input),
            expressions,
            row_type: project.row_type.clone(),
        }));
        Ok((rewritten, masked))
    }

    /// Маскированное выражение для позиции проекции или `None`, если маскировать нечего
    fn rewrite_expression(
        &self,
        project: &ProjectNode,
        position: usize,
        expr: &Expr,
    ) -> Result<Option<Expr>> {
        let Expr::ColumnRef { index } = expr else {
            return Ok(None);
        };

        let field = project.input.field(*index).ok_or_else(|| {
            Error::rewrite(format!(
                "column reference ${} at position {} exceeds input width {}",
                index,
                position,
                project.input.field_count()
            ))
        })?;

        let Some(origin) = ColumnLineageResolver::resolve(&project.input, *index) else {
            return Ok(match self.policy {
                LineagePolicy::FailOpen => {
                    log::debug!(
                        "Происхождение колонки {} не установлено, значение не маскируется",
                        field.name
                    );
                    None
                }
                LineagePolicy::FailClosed => {
                    log::debug!(
                        "Происхождение колонки {} не установлено, колонка маскируется полностью",
                        field.name
                    );
                    Some(coerce(
                        masked_constant(&field.sql_type, self.settings),
                        &field.sql_type,
                    ))
                }
            });
        };

        let Some(rule) = self.snapshot.lookup(&origin.schema, &origin.table, &field.name) else {
            return Ok(None);
        };
        if rule.rule_type() == RuleType::Keep {
            return Ok(None);
        }

        log::debug!(
            "Применяется правило {} к колонке {}.{}",
            rule.rule_type(),
            origin,
            field.name
        );
        Ok(Some(apply_rule(rule, expr, &field.sql_type, self.settings)))
    }
}

/// Перезаписывает проекцию по текущему снимку хранилища с настройками по умолчанию
pub fn rewrite(project: &RelRef, store: &MaskingRuleStore) -> Result<RelRef> {
    let settings = StrategySettings::default();
    ExpressionRewriter::new(store, &settings, LineagePolicy::default()).rewrite(project)
}

/// Строит маскированное выражение для правила.
///
/// Неподдерживаемые сочетания правила и типа возвращают исходное выражение.
/// Результат приводится к объявленному типу.
pub fn apply_rule(
    rule: &MaskingRule,
    original: &Expr,
    declared: &SqlType,
    settings: &StrategySettings,
) -> Expr {
    let rule_type = rule.rule_type();
    if rule_type == RuleType::Keep {
        return original.clone();
    }
    if rule_type.requires_string() && !declared.is_string() {
        log::debug!(
            "Правило {} не применимо к типу {} колонки {}",
            rule_type,
            declared,
            rule.qualified_name()
        );
        return original.clone();
    }

    let mask = mask_replacement(settings.mask_char);
    let masked = match rule_type {
        RuleType::Keep => return original.clone(),
        RuleType::Full => masked_constant(declared, settings),
        RuleType::Left => keep_edges(
            original,
            rule.pre_length(settings.left_pre_length),
            0,
            &mask,
        ),
        RuleType::Right => keep_edges(
            original,
            0,
            rule.post_length(settings.right_post_length),
            &mask,
        ),
        RuleType::Middle => middle_mask(original, rule, settings, &mask),
        RuleType::Regex => match rule.pattern() {
            Some(pattern) => regexp_replace(original.clone(), pattern.as_str(), &mask),
            None => return original.clone(),
        },
        RuleType::Hash => Expr::call(Operator::Hash, vec![original.clone()], SqlType::Varchar),
    };

    coerce(masked, declared)
}

/// Константа полного маскирования для объявленного типа
pub fn masked_constant(declared: &SqlType, settings: &StrategySettings) -> Expr {
    if declared.is_string() {
        Expr::literal(
            Value::Text(settings.full_mask_literal.clone()),
            SqlType::Varchar,
        )
    } else if declared.is_integer() {
        Expr::literal(Value::Integer(0), declared.clone())
    } else if declared.is_fractional() {
        Expr::literal(Value::Decimal(0.0), declared.clone())
    } else if *declared == SqlType::Boolean {
        Expr::literal(Value::Boolean(false), SqlType::Boolean)
    } else {
        Expr::literal(Value::Null, declared.clone())
    }
}

/// Оборачивает выражение в CAST, если его тип отличается от объявленного
fn coerce(expr: Expr, declared: &SqlType) -> Expr {
    match expr.result_type() {
        Some(actual) if actual != declared => {
            Expr::call(Operator::Cast, vec![expr], declared.clone())
        }
        _ => expr,
    }
}

/// Символ маски в виде строки замены REGEXP_REPLACE
fn mask_replacement(mask_char: char) -> String {
    if mask_char == '$' {
        "$$".to_string()
    } else {
        mask_char.to_string()
    }
}

fn length(expr: &Expr) -> Expr {
    Expr::call(Operator::CharLength, vec![expr.clone()], SqlType::Integer)
}

fn minus(left: Expr, right: Expr) -> Expr {
    Expr::call(Operator::Minus, vec![left, right], SqlType::Integer)
}

fn plus(left: Expr, right: Expr) -> Expr {
    Expr::call(Operator::Plus, vec![left, right], SqlType::Integer)
}

fn substring(expr: &Expr, start: Expr, count: Expr) -> Expr {
    Expr::call(
        Operator::Substring,
        vec![expr.clone(), start, count],
        SqlType::Varchar,
    )
}

fn repeat(mask: &str, count: Expr) -> Expr {
    // Маска в REPEAT буквальная, экранирование для замены регулярки не нужно
    let literal = if mask == "$$" { "$" } else { mask };
    Expr::call(
        Operator::Repeat,
        vec![Expr::string(literal), count],
        SqlType::Varchar,
    )
}

fn concat(parts: Vec<Expr>) -> Expr {
    Expr::call(Operator::Concat, parts, SqlType::Varchar)
}

fn case_when(condition: Expr, then: Expr, otherwise: Expr) -> Expr {
    Expr::call(
        Operator::Case,
        vec![condition, then, otherwise],
        SqlType::Varchar,
    )
}

fn regexp_replace(expr: Expr, pattern: &str, replacement: &str) -> Expr {
    Expr::call(
        Operator::RegexpReplace,
        vec![expr, Expr::string(pattern), Expr::string(replacement)],
        SqlType::Varchar,
    )
}

/// `pre` первых и `post` последних символов видимы, остальное маскируется.
///
/// CASE WHEN CHAR_LENGTH(x) <= pre + post THEN x
///      ELSE CONCAT(SUBSTRING(x, 1, pre), REPEAT(m, CHAR_LENGTH(x) - pre - post),
///                  SUBSTRING(x, CHAR_LENGTH(x) - post + 1, post)) END
fn keep_edges(original: &Expr, pre: usize, post: usize, mask: &str) -> Expr {
    let visible = (pre + post) as i64;
    let mut parts = Vec::with_capacity(3);
    if pre > 0 {
        parts.push(substring(original, Expr::integer(1), Expr::integer(pre as i64)));
    }
    parts.push(repeat(
        mask,
        minus(length(original), Expr::integer(visible)),
    ));
    if post > 0 {
        parts.push(tail(original, post));
    }

    case_when(
        le(length(original), Expr::integer(visible)),
        original.clone(),
        concat(parts),
    )
}

/// Последние `post` символов
fn tail(original: &Expr, post: usize) -> Expr {
    substring(
        original,
        plus(
            minus(length(original), Expr::integer(post as i64)),
            Expr::integer(1),
        ),
        Expr::integer(post as i64),
    )
}

fn le(left: Expr, right: Expr) -> Expr {
    Expr::call(Operator::LessOrEqual, vec![left, right], SqlType::Boolean)
}

/// Маскирование середины; слишком короткие значения маскируются как `Full` по значению
fn middle_mask(
    original: &Expr,
    rule: &MaskingRule,
    settings: &StrategySettings,
    mask: &str,
) -> Expr {
    let pre = rule.pre_length(settings.middle_pre_length);
    let post = rule.post_length(settings.middle_post_length);
    let visible = (pre + post) as i64;

    let middle = substring(
        original,
        Expr::integer(pre as i64 + 1),
        minus(length(original), Expr::integer(visible)),
    );

    let mut parts = Vec::with_capacity(3);
    if pre > 0 {
        parts.push(substring(original, Expr::integer(1), Expr::integer(pre as i64)));
    }
    parts.push(interleave(middle, settings.middle_visible_stride, mask));
    if post > 0 {
        parts.push(tail(original, post));
    }

    case_when(
        le(length(original), Expr::integer(visible)),
        keep_edges(
            original,
            settings.full_pre_length,
            settings.full_post_length,
            mask,
        ),
        concat(parts),
    )
}

/// Оставляет видимым каждый `stride`-й символ сегмента, начиная с первого.
///
/// Проход `k` (1..stride) заменяет `k`-й символ каждой группы из `stride` символов;
/// совпадения не пересекаются, поэтому группы остаются выровненными.
fn interleave(segment: Expr, stride: usize, mask: &str) -> Expr {
    let stride = stride.max(1);
    let mut expr = segment;
    for k in 1..stride {
        let rest = stride - 1 - k;
        let (pattern, replacement) = if rest == 0 {
            (format!("(?s)(.{{{}}}).", k), format!("${{1}}{}", mask))
        } else {
            (
                format!("(?s)(.{{{}}}).(.{{0,{}}})", k, rest),
                format!("${{1}}{}${{2}}", mask),
            )
        };
        expr = regexp_replace(expr, &pattern, &replacement);
    }
    expr
}
