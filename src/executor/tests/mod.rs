//! Тесты для модуля executor
