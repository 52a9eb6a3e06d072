//! Общие типы и утилиты слоя маскирования

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod tests;

pub use config::*;
pub use constants::*;
pub use error::{Error, Result};
pub use types::*;
