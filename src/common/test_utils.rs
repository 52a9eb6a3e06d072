//! Общие утилиты для тестирования

use crate::common::{Result, SqlType};
use crate::relational::{RelNode, RelRef, RowType};
use crate::rules::{MaskingRule, RuleSnapshot, RuleType};
use std::io::Write;
use tempfile::NamedTempFile;

/// Файл правил из примеров документации
pub const SAMPLE_RULES: &str = "\
schema,table,column,rule_type,enabled
# демонстрационная схема
demo,users,phone,left,true
demo,users,ssn,full,true
demo,users,email,middle,true
demo,users,name,keep,true
demo,orders,card,right,true
demo,orders,note,hash,false
";

/// Записывает правила во временный файл
pub fn write_rules(content: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Перезаписывает содержимое существующего файла правил
pub fn rewrite_rules(file: &NamedTempFile, content: &str) -> Result<()> {
    std::fs::write(file.path(), content)?;
    Ok(())
}

/// Правило без параметров
pub fn rule(schema: &str, table: &str, column: &str, rule_type: RuleType) -> MaskingRule {
    rule_with_params(schema, table, column, rule_type, &[])
}

/// Правило с параметрами
pub fn rule_with_params(
    schema: &str,
    table: &str,
    column: &str,
    rule_type: RuleType,
    params: &[&str],
) -> MaskingRule {
    MaskingRule::new(
        schema,
        table,
        column,
        rule_type,
        params.iter().map(|p| p.to_string()).collect(),
        true,
    )
    .expect("valid test rule")
}

/// Снимок из [`SAMPLE_RULES`]
pub fn sample_snapshot() -> RuleSnapshot {
    RuleSnapshot::parse(SAMPLE_RULES)
}

/// demo.users(id INTEGER, name VARCHAR, phone VARCHAR, ssn INTEGER, email VARCHAR)
pub fn users_scan() -> RelRef {
    RelNode::scan(
        "demo.users",
        RowType::of(&[
            ("id", SqlType::Integer),
            ("name", SqlType::Varchar),
            ("phone", SqlType::Varchar),
            ("ssn", SqlType::Integer),
            ("email", SqlType::Varchar),
        ]),
    )
}

/// demo.orders(order_id BIGINT, user_id INTEGER, card VARCHAR, note TEXT)
pub fn orders_scan() -> RelRef {
    RelNode::scan(
        "demo.orders",
        RowType::of(&[
            ("order_id", SqlType::BigInt),
            ("user_id", SqlType::Integer),
            ("card", SqlType::Varchar),
            ("note", SqlType::Text),
        ]),
    )
}
