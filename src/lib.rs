//! rustdb-masking - Слой маскирования колонок для rustdb
//!
//! Переписывает проекции реляционного дерева запроса так, чтобы чувствительные
//! колонки возвращались уже маскированными, и маскирует выбранные фреймы, когда
//! дерево недоступно. Правила читаются из файла и перезагружаются атомарно.

pub mod cli;
pub mod common;
pub mod executor;
pub mod masking;
pub mod relational;
pub mod rules;

pub use common::error::{Error, Result};
pub use common::types::*;

use common::MaskingConfig;
use executor::{ColumnMetadata, CursorMaskingAdapter, Frame, RowCursor};
use relational::{ExpressionRewriter, RelRef};
use rules::MaskingRuleStore;
use std::sync::Arc;

/// Версия библиотеки
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Точка входа для шлюза сессии: хранилище правил и настройки стратегий
pub struct MaskingEngine {
    config: MaskingConfig,
    store: Arc<MaskingRuleStore>,
}

impl MaskingEngine {
    /// Проверяет конфигурацию и загружает правила
    pub fn open(config: MaskingConfig) -> Result<Self> {
        config.validate()?;
        let store = MaskingRuleStore::open(&config.rules_path)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    pub fn with_store(config: MaskingConfig, store: Arc<MaskingRuleStore>) -> Self {
        Self { config, store }
    }

    /// Запускает фоновую перезагрузку, если она включена.
    ///
    /// Должен вызываться внутри среды выполнения tokio.
    pub fn start(&self) -> Result<()> {
        if self.config.auto_reload {
            self.store
                .start_auto_reload(self.config.reload_interval())?;
        }
        Ok(())
    }

    pub fn store(&self) -> &Arc<MaskingRuleStore> {
        &self.store
    }

    pub fn config(&self) -> &MaskingConfig {
        &self.config
    }

    /// Маскирует все проекции дерева по одному снимку правил
    pub fn rewrite(&self, root: &RelRef) -> Result<RelRef> {
        self.rewriter().rewrite_tree(root)
    }

    /// Маскирует одну проекцию; узлы другого вида возвращаются как есть
    pub fn rewrite_project(&self, project: &RelRef) -> Result<RelRef> {
        self.rewriter().rewrite(project)
    }

    fn rewriter(&self) -> ExpressionRewriter<'_> {
        ExpressionRewriter::new(
            &self.store,
            &self.config.strategies,
            self.config.lineage_policy,
        )
    }

    /// Маскирует уже выбранный фрейм по текущему снимку
    pub fn mask_frame(&self, frame: Frame, columns: &[ColumnMetadata]) -> Result<Frame> {
        let snapshot = self.store.current_snapshot();
        executor::mask_frame(
            frame,
            columns,
            &snapshot,
            &self.config.strategies,
            self.config.lineage_policy,
        )
    }

    /// Оборачивает курсор результата маскирующим адаптером
    pub fn wrap_cursor<C: RowCursor>(
        &self,
        cursor: C,
        columns: Vec<ColumnMetadata>,
    ) -> CursorMaskingAdapter<C> {
        CursorMaskingAdapter::new(
            cursor,
            columns,
            Arc::clone(&self.store),
            self.config.strategies.clone(),
            self.config.lineage_policy,
        )
    }

    /// Останавливает фоновую перезагрузку
    pub fn shutdown(&self) {
        self.store.shutdown();
    }
}
