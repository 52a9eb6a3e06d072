//! Обработка ошибок для слоя маскирования

use thiserror::Error;

/// Основной тип ошибки слоя маскирования
#[derive(Error, Debug)]
pub enum Error {
    /// Ошибка I/O операций
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Источник правил недоступен или не читается
    #[error("Config load error ({source_name}): {message}")]
    ConfigLoad {
        source_name: String,
        message: String,
    },

    /// Ошибка конфигурации
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Некорректная запись правила
    #[error("Rule parse error at line {line}: {message}")]
    RuleParse { line: usize, message: String },

    /// Ошибка построения маскированного выражения
    #[error("Rewrite error: {message}")]
    Rewrite { message: String },

    /// Ошибка вычисления выражения
    #[error("Evaluation error: {message}")]
    Evaluation { message: String },

    /// Ошибка валидации
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Неподдерживаемая операция
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Внутренняя ошибка
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Тип результата для слоя маскирования
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Создает ошибку загрузки источника правил
    pub fn config_load(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigLoad {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Создает ошибку конфигурации
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Создает ошибку разбора правила
    pub fn rule_parse(line: usize, message: impl Into<String>) -> Self {
        Self::RuleParse {
            line,
            message: message.into(),
        }
    }

    /// Создает ошибку перезаписи выражения
    pub fn rewrite(message: impl Into<String>) -> Self {
        Self::Rewrite {
            message: message.into(),
        }
    }

    /// Создает ошибку вычисления
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }

    /// Создает ошибку валидации
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Создает ошибку неподдерживаемой операции
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Создает внутреннюю ошибку
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
