//! Общие утилиты для интеграционных тестов

use rustdb_masking::{
    common::{MaskingConfig, Result, SqlType},
    relational::{RelNode, RelRef, RowType},
    MaskingEngine,
};
use std::path::PathBuf;
use tempfile::TempDir;

/// Правила демонстрационной схемы
pub const DEMO_RULES: &str = "\
schema,table,column,rule_type,enabled
demo,users,phone,left,true
demo,users,ssn,full,true
demo,users,email,middle,true
demo,orders,card,right,true
";

/// Временный каталог с файлом правил
#[allow(dead_code)]
pub struct RulesFixture {
    pub temp_dir: TempDir,
    pub rules_path: PathBuf,
}

impl RulesFixture {
    /// Создает каталог и записывает правила
    pub fn new(rules: &str) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let rules_path = temp_dir.path().join("masking.csv");
        std::fs::write(&rules_path, rules)?;
        Ok(Self {
            temp_dir,
            rules_path,
        })
    }

    /// Перезаписывает файл правил
    pub fn write(&self, rules: &str) -> Result<()> {
        std::fs::write(&self.rules_path, rules)?;
        Ok(())
    }

    /// Конфигурация, указывающая на файл правил
    pub fn config(&self) -> MaskingConfig {
        MaskingConfig {
            rules_path: self.rules_path.clone(),
            auto_reload: false,
            ..MaskingConfig::default()
        }
    }

    /// Движок маскирования поверх файла правил
    pub fn engine(&self) -> Result<MaskingEngine> {
        MaskingEngine::open(self.config())
    }
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

/// demo.orders(order_id BIGINT, user_id INTEGER, card VARCHAR)
pub fn orders_scan() -> RelRef {
    RelNode::scan(
        "demo.orders",
        RowType::of(&[
            ("order_id", SqlType::BigInt),
            ("user_id", SqlType::Integer),
            ("card", SqlType::Varchar),
        ]),
    )
}
