//! Конфигурация для слоя маскирования
//!
//! Предоставляет структуры конфигурации для хранилища правил, стратегий маскирования и логирования

use crate::common::constants::*;
use crate::common::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Поведение при невозможности установить происхождение колонки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineagePolicy {
    /// Пропускать значение без маскирования
    #[default]
    FailOpen,
    /// Маскировать значение полностью
    FailClosed,
}

impl std::fmt::Display for LineagePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineagePolicy::FailOpen => write!(f, "fail_open"),
            LineagePolicy::FailClosed => write!(f, "fail_closed"),
        }
    }
}

impl std::str::FromStr for LineagePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fail_open" | "open" => Ok(LineagePolicy::FailOpen),
            "fail_closed" | "closed" => Ok(LineagePolicy::FailClosed),
            _ => Err(format!("Unsupported lineage policy: {}", s)),
        }
    }
}

/// Параметры стратегий маскирования значений
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    /// Сколько символов оставить в начале при полном маскировании
    pub full_pre_length: usize,
    /// Сколько символов оставить в конце при полном маскировании
    pub full_post_length: usize,
    /// Сколько символов оставить в начале при маскировании середины
    pub middle_pre_length: usize,
    /// Сколько символов оставить в конце при маскировании середины
    pub middle_post_length: usize,
    /// В середине остается видимым каждый N-й символ
    pub middle_visible_stride: usize,
    /// Сколько символов оставить слева
    pub left_pre_length: usize,
    /// Сколько символов оставить справа
    pub right_post_length: usize,
    /// Символ маскирования
    pub mask_char: char,
    /// Строковая константа для полного маскирования в плане запроса
    pub full_mask_literal: String,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            full_pre_length: 1,
            full_post_length: 1,
            middle_pre_length: 3,
            middle_post_length: 2,
            middle_visible_stride: 4,
            left_pre_length: 4,
            right_post_length: 4,
            mask_char: DEFAULT_MASK_CHAR,
            full_mask_literal: DEFAULT_FULL_MASK_LITERAL.to_string(),
        }
    }
}

/// Конфигурация логирования
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень логирования
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Основная конфигурация слоя маскирования
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Путь к файлу правил
    pub rules_path: PathBuf,
    /// Интервал перезагрузки правил (в секундах)
    pub reload_interval_secs: u64,
    /// Запускать ли фоновую перезагрузку
    pub auto_reload: bool,
    /// Политика для колонок с неустановленным происхождением
    pub lineage_policy: LineagePolicy,
    /// Параметры стратегий
    pub strategies: StrategySettings,
    /// Логирование
    pub logging: LoggingConfig,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from(DEFAULT_RULES_PATH),
            reload_interval_secs: DEFAULT_RELOAD_INTERVAL_SECS,
            auto_reload: true,
            lineage_policy: LineagePolicy::FailOpen,
            strategies: StrategySettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl MaskingConfig {
    /// Загружает конфигурацию из TOML файла
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            Error::configuration(format!("{}: {}", path.display(), e))
        })
    }

    /// Сохраняет конфигурацию в TOML файл
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::configuration(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Загружает конфигурацию из переменных окружения
    pub fn from_env() -> Result<Self> {
        let mut config = MaskingConfig::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Применяет переопределения из переменных окружения
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = env_var("RULES") {
            self.rules_path = PathBuf::from(path);
        }

        if let Some(secs) = env_var("RELOAD_SECS") {
            self.reload_interval_secs = secs.parse().map_err(|_| {
                Error::configuration(format!("Invalid reload interval: {}", secs))
            })?;
        }

        if let Some(flag) = env_var("AUTO_RELOAD") {
            self.auto_reload = flag.parse().map_err(|_| {
                Error::configuration(format!("Invalid auto reload flag: {}", flag))
            })?;
        }

        if let Some(policy) = env_var("LINEAGE_POLICY") {
            self.lineage_policy = policy.parse().map_err(Error::configuration)?;
        }

        if let Some(level) = env_var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Объединяет конфигурацию с другой: отличные от умолчаний значения `other` побеждают
    pub fn merge(mut self, other: Self) -> Self {
        let defaults = MaskingConfig::default();

        if other.rules_path != defaults.rules_path {
            self.rules_path = other.rules_path;
        }
        if other.reload_interval_secs != defaults.reload_interval_secs {
            self.reload_interval_secs = other.reload_interval_secs;
        }
        if other.auto_reload != defaults.auto_reload {
            self.auto_reload = other.auto_reload;
        }
        if other.lineage_policy != defaults.lineage_policy {
            self.lineage_policy = other.lineage_policy;
        }
        if other.strategies != defaults.strategies {
            self.strategies = other.strategies;
        }
        if other.logging != defaults.logging {
            self.logging = other.logging;
        }

        self
    }

    /// Валидирует конфигурацию
    pub fn validate(&self) -> Result<()> {
        if self.rules_path.as_os_str().is_empty() {
            return Err(Error::configuration("Rules path cannot be empty"));
        }

        if self.reload_interval_secs == 0 {
            return Err(Error::configuration(
                "Reload interval must be greater than 0",
            ));
        }

        if self.strategies.middle_visible_stride == 0 {
            return Err(Error::configuration(
                "Middle visible stride must be greater than 0",
            ));
        }

        if self.strategies.full_mask_literal.is_empty() {
            return Err(Error::configuration("Full mask literal cannot be empty"));
        }

        Ok(())
    }

    /// Интервал перезагрузки правил
    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs)
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, suffix)).ok()
}
