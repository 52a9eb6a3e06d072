//! Стратегии маскирования скалярных значений
//!
//! Чистые функции над строковой формой значения. NULL никогда не маскируется.
//! Длины считаются в символах Unicode, а не в байтах.

use crate::common::{StrategySettings, Value};
use crate::rules::{MaskingRule, RuleType};
use regex::{NoExpand, Regex};
use sha2::{Digest, Sha256};

/// Видимые фрагменты в начале и в конце значения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleSpan {
    pub pre: usize,
    pub post: usize,
}

impl VisibleSpan {
    pub fn new(pre: usize, post: usize) -> Self {
        Self { pre, post }
    }
}

/// Оставляет `pre` первых и `post` последних символов, остальное заменяет маской.
///
/// Строка не длиннее `pre + post` возвращается без изменений.
pub fn mask_full(value: &str, span: VisibleSpan, mask_char: char) -> String {
    let chars: Vec<char> = value.chars().collect();
    let total = chars.len();
    if total <= span.pre + span.post {
        return value.to_string();
    }

    let mut masked = String::with_capacity(value.len());
    masked.extend(&chars[..span.pre]);
    masked.extend(std::iter::repeat(mask_char).take(total - span.pre - span.post));
    masked.extend(&chars[total - span.post..]);
    masked
}

/// Оставляет края и в середине показывает каждый `stride`-й символ, начиная с первого.
///
/// Слишком короткая строка маскируется через [`mask_full`] с фрагментом `fallback`.
pub fn mask_middle(
    value: &str,
    span: VisibleSpan,
    stride: usize,
    fallback: VisibleSpan,
    mask_char: char,
) -> String {
    let chars: Vec<char> = value.chars().collect();
    let total = chars.len();
    if total <= span.pre + span.post {
        return mask_full(value, fallback, mask_char);
    }

    let stride = stride.max(1);
    let mut masked = String::with_capacity(value.len());
    masked.extend(&chars[..span.pre]);
    for (offset, ch) in chars[span.pre..total - span.post].iter().enumerate() {
        masked.push(if offset % stride == 0 { *ch } else { mask_char });
    }
    masked.extend(&chars[total - span.post..]);
    masked
}

/// Оставляет `pre` первых символов, остаток маскирует целиком
pub fn mask_left(value: &str, pre: usize, mask_char: char) -> String {
    mask_full(value, VisibleSpan::new(pre, 0), mask_char)
}

/// Маскирует все, кроме `post` последних символов.
///
/// Композиция с [`mask_left`] зависит от порядка, если символы маски различаются.
pub fn mask_right(value: &str, post: usize, mask_char: char) -> String {
    mask_full(value, VisibleSpan::new(0, post), mask_char)
}

/// Заменяет каждое совпадение шаблона символом маски
pub fn regex_mask(value: &str, pattern: &Regex, mask_char: char) -> String {
    let replacement = mask_char.to_string();
    pattern
        .replace_all(value, NoExpand(replacement.as_str()))
        .into_owned()
}

/// Детерминированный односторонний дайджест (SHA-256, hex в нижнем регистре)
pub fn hash_value(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Функция стратегии: `None`, если значение остается как есть
type StrategyFn = fn(&str, &MaskingRule, &StrategySettings) -> Option<String>;

/// Таблица диспетчеризации, индексируется [`RuleType::index`]
static STRATEGIES: [StrategyFn; RuleType::ALL.len()] = [
    keep_strategy,
    full_strategy,
    middle_strategy,
    left_strategy,
    right_strategy,
    regex_strategy,
    hash_strategy,
];

fn keep_strategy(_: &str, _: &MaskingRule, _: &StrategySettings) -> Option<String> {
    None
}

fn full_strategy(value: &str, rule: &MaskingRule, settings: &StrategySettings) -> Option<String> {
    let span = VisibleSpan::new(
        rule.pre_length(settings.full_pre_length),
        rule.post_length(settings.full_post_length),
    );
    Some(mask_full(value, span, settings.mask_char))
}

fn middle_strategy(value: &str, rule: &MaskingRule, settings: &StrategySettings) -> Option<String> {
    let span = VisibleSpan::new(
        rule.pre_length(settings.middle_pre_length),
        rule.post_length(settings.middle_post_length),
    );
    let fallback = VisibleSpan::new(settings.full_pre_length, settings.full_post_length);
    Some(mask_middle(
        value,
        span,
        settings.middle_visible_stride,
        fallback,
        settings.mask_char,
    ))
}

fn left_strategy(value: &str, rule: &MaskingRule, settings: &StrategySettings) -> Option<String> {
    Some(mask_left(
        value,
        rule.pre_length(settings.left_pre_length),
        settings.mask_char,
    ))
}

fn right_strategy(value: &str, rule: &MaskingRule, settings: &StrategySettings) -> Option<String> {
    Some(mask_right(
        value,
        rule.post_length(settings.right_post_length),
        settings.mask_char,
    ))
}

fn regex_strategy(value: &str, rule: &MaskingRule, settings: &StrategySettings) -> Option<String> {
    match rule.pattern() {
        Some(pattern) => Some(regex_mask(value, pattern, settings.mask_char)),
        None => {
            log::debug!("Правило {} без шаблона, значение не изменено", rule.qualified_name());
            None
        }
    }
}

fn hash_strategy(value: &str, _: &MaskingRule, _: &StrategySettings) -> Option<String> {
    Some(hash_value(value))
}

/// Маскирует строковую форму значения по правилу
pub fn mask_text(value: &str, rule: &MaskingRule, settings: &StrategySettings) -> String {
    STRATEGIES[rule.rule_type().index()](value, rule, settings)
        .unwrap_or_else(|| value.to_string())
}

/// Маскирует значение ячейки по правилу.
///
/// NULL и значения, которые стратегия оставляет без изменений, возвращаются
/// в исходном виде и с исходным типом; маскированное значение становится текстом.
pub fn mask_value(value: &Value, rule: &MaskingRule, settings: &StrategySettings) -> Value {
    let Some(text) = value.as_text() else {
        return Value::Null;
    };

    match STRATEGIES[rule.rule_type().index()](&text, rule, settings) {
        Some(masked) if masked != *text => Value::Text(masked),
        _ => value.clone(),
    }
}
