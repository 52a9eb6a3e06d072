//! Хранилище правил маскирования с атомарной перезагрузкой
//!
//! Текущий снимок публикуется одной атомарной заменой указателя: читатели
//! никогда не блокируются и всегда видят целый снимок. Фоновая перезагрузка
//! строит новый снимок с нуля; при ошибке остается предыдущий.

use crate::common::{Error, Result};
use crate::rules::rule::MaskingRule;
use crate::rules::snapshot::RuleSnapshot;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Статистика перезагрузок
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReloadStatistics {
    /// Успешные публикации снимка (включая начальную загрузку)
    pub succeeded: u64,
    /// Неудачные перезагрузки
    pub failed: u64,
    /// Последняя ошибка перезагрузки
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct ReloadCounters {
    succeeded: AtomicU64,
    failed: AtomicU64,
    last_error: Mutex<Option<String>>,
}

/// Хранилище правил маскирования
pub struct MaskingRuleStore {
    source: Option<PathBuf>,
    current: Arc<ArcSwap<RuleSnapshot>>,
    counters: Arc<ReloadCounters>,
    reload_handle: Mutex<Option<JoinHandle<()>>>,
}

impl MaskingRuleStore {
    /// Открывает хранилище и выполняет начальную загрузку.
    ///
    /// Ошибка начальной загрузки фатальна: правил без источника нет.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = RuleSnapshot::load(&path)?;
        log::info!(
            "Загружены правила маскирования из {}: {} правил, {} пропущено",
            path.display(),
            snapshot.len(),
            snapshot.report().malformed.len()
        );

        let store = Self::build(Some(path), snapshot);
        store.counters.succeeded.fetch_add(1, Ordering::Relaxed);
        Ok(store)
    }

    /// Создает хранилище без источника из готового снимка
    pub fn with_snapshot(snapshot: RuleSnapshot) -> Self {
        Self::build(None, snapshot)
    }

    /// Создает хранилище из списка правил
    pub fn from_rules(rules: impl IntoIterator<Item = MaskingRule>) -> Self {
        Self::with_snapshot(RuleSnapshot::from_rules(rules))
    }

    fn build(source: Option<PathBuf>, snapshot: RuleSnapshot) -> Self {
        Self {
            source,
            current: Arc::new(ArcSwap::from_pointee(snapshot)),
            counters: Arc::new(ReloadCounters::default()),
            reload_handle: Mutex::new(None),
        }
    }

    /// Путь к источнику правил
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Текущий снимок; чтение без блокировок
    pub fn current_snapshot(&self) -> Arc<RuleSnapshot> {
        self.current.load_full()
    }

    /// Ищет правило для колонки в текущем снимке
    pub fn lookup(&self, schema: &str, table: &str, column: &str) -> Option<MaskingRule> {
        self.current.load().lookup(schema, table, column).cloned()
    }

    /// Публикует новый снимок вместо текущего
    pub fn publish(&self, snapshot: RuleSnapshot) {
        publish(&self.current, &self.counters, Ok(snapshot));
    }

    /// Синхронно перечитывает источник.
    ///
    /// При ошибке предыдущий снимок сохраняется, а ошибка возвращается вызывающему.
    pub fn reload(&self) -> Result<()> {
        let path = self
            .source
            .as_ref()
            .ok_or_else(|| Error::unsupported("reload of a store without a rule source"))?;
        match RuleSnapshot::load(path) {
            Ok(snapshot) => {
                publish(&self.current, &self.counters, Ok(snapshot));
                Ok(())
            }
            Err(e) => {
                record_failure(&self.counters, &e);
                Err(e)
            }
        }
    }

    /// Запускает периодическую перезагрузку в текущем runtime tokio.
    ///
    /// Повторный вызов заменяет расписание.
    pub fn start_auto_reload(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::validation("reload interval must be greater than 0"));
        }
        let path = self
            .source
            .clone()
            .ok_or_else(|| Error::unsupported("auto reload of a store without a rule source"))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::unsupported("auto reload requires a tokio runtime"))?;

        let current = self.current.clone();
        let counters = self.counters.clone();

        let handle = runtime.spawn(async move {
            let name = path.display().to_string();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Первый тик срабатывает сразу, снимок уже загружен
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let result = match tokio::fs::read_to_string(&path).await {
                    Ok(text) => RuleSnapshot::parse_strict(&text, Some(&name)),
                    Err(e) => Err(Error::config_load(name.clone(), e.to_string())),
                };
                publish(&current, &counters, result);
            }
        });

        if let Some(previous) = self.reload_handle.lock().replace(handle) {
            previous.abort();
        }
        log::debug!("Запущена перезагрузка правил с интервалом {:?}", interval);
        Ok(())
    }

    /// Запущена ли фоновая перезагрузка
    pub fn is_auto_reloading(&self) -> bool {
        self.reload_handle
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Останавливает фоновую перезагрузку; повторный вызов ничего не делает
    pub fn shutdown(&self) {
        if let Some(handle) = self.reload_handle.lock().take() {
            handle.abort();
            log::debug!("Перезагрузка правил остановлена");
        }
    }

    /// Статистика перезагрузок
    pub fn statistics(&self) -> ReloadStatistics {
        ReloadStatistics {
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            last_error: self.counters.last_error.lock().clone(),
        }
    }
}

impl Drop for MaskingRuleStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for MaskingRuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskingRuleStore")
            .field("source", &self.source)
            .field("rules", &self.current.load().len())
            .field("auto_reload", &self.is_auto_reloading())
            .finish()
    }
}

fn publish(
    current: &ArcSwap<RuleSnapshot>,
    counters: &ReloadCounters,
    result: Result<RuleSnapshot>,
) {
    match result {
        Ok(snapshot) => {
            log::info!(
                "Опубликован снимок правил маскирования: {} правил, {} пропущено",
                snapshot.len(),
                snapshot.report().malformed.len()
            );
            current.store(Arc::new(snapshot));
            counters.succeeded.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => record_failure(counters, &e),
    }
}

fn record_failure(counters: &ReloadCounters, error: &Error) {
    log::warn!("Перезагрузка правил не удалась, сохранен предыдущий снимок: {}", error);
    counters.failed.fetch_add(1, Ordering::Relaxed);
    *counters.last_error.lock() = Some(error.to_string());
}
