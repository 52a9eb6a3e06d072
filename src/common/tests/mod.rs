//! Тесты для модуля common
