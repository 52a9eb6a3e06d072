//! Тесты для модуля rules
