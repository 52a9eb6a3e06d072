//! Тесты для модуля masking
