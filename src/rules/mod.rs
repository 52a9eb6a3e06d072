//! Правила маскирования: модель, снимок и хранилище с перезагрузкой

pub mod rule;
pub mod snapshot;
pub mod store;

#[cfg(test)]
mod tests;

pub use rule::{LengthOverrides, MaskingRule, RuleType};
pub use snapshot::{LoadReport, MalformedRecord, RuleSnapshot};
pub use store::{MaskingRuleStore, ReloadStatistics};
