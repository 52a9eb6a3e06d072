//! Интеграционные тесты для rustdb-masking

pub mod common;
pub mod cursor_tests;
pub mod reload_tests;
pub mod rewrite_tests;
