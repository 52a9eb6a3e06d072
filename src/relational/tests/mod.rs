//! Тесты для модуля relational

pub mod eval_tests;
