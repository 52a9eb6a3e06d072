//! CLI интерфейс для rustdb-masking
//!
//! Административные команды: проверка файла правил, поиск правила,
//! маскирование значения и наблюдение за перезагрузкой.

use crate::common::{MaskingConfig, StrategySettings};
use crate::masking::mask_text;
use crate::rules::{MaskingRule, MaskingRuleStore, RuleSnapshot, RuleType};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// RustDB Masking - слой маскирования колонок
#[derive(Parser)]
#[command(name = "rustdb-masking")]
#[command(about = "RustDB Masking - column masking rules and query rewrite")]
#[command(version)]
pub struct Cli {
    /// Конфигурационный файл
    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Уровень детализации логирования
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Проверить файл правил и вывести отчет о загрузке
    Check {
        /// Файл правил (по умолчанию из конфигурации)
        rules: Option<PathBuf>,

        /// Вывести снимок правил в JSON
        #[arg(long)]
        json: bool,
    },

    /// Найти правило для колонки
    Lookup {
        /// Файл правил
        #[arg(short, long)]
        rules: Option<PathBuf>,

        schema: String,
        table: String,
        column: String,
    },

    /// Маскировать значение указанной стратегией
    Mask {
        /// Тип правила (keep, full, middle, left, right, regex, hash)
        #[arg(short, long)]
        rule: String,

        /// Параметры правила
        #[arg(short, long = "param")]
        params: Vec<String>,

        value: String,
    },

    /// Загрузить правила и перезагружать их до Ctrl-C
    Watch {
        /// Файл правил
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Интервал перезагрузки в секундах
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Показать информацию о конфигурации
    Info,
}

impl Cli {
    /// Разбирает аргументы командной строки
    pub fn init() -> Self {
        Self::parse()
    }

    /// Загружает конфигурацию: файл, затем переменные окружения
    pub fn load_config(&self) -> anyhow::Result<MaskingConfig> {
        let mut config = read_config_file(self.config.as_deref(), Path::new(DEFAULT_CONFIG_FILE))?;
        config.apply_env()?;

        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Выполняет команду
    pub async fn execute(&self, config: &MaskingConfig) -> anyhow::Result<()> {
        match &self.command {
            Some(Commands::Check { rules, json }) => {
                self.check_rules(rules_path(rules, config), *json)
            }
            Some(Commands::Lookup {
                rules,
                schema,
                table,
                column,
            }) => self.lookup_rule(rules_path(rules, config), schema, table, column),
            Some(Commands::Mask {
                rule,
                params,
                value,
            }) => self.mask_value(rule, params, value, &config.strategies),
            Some(Commands::Watch { rules, interval }) => {
                let interval = interval.unwrap_or(config.reload_interval_secs);
                self.watch_rules(rules_path(rules, config), interval).await
            }
            Some(Commands::Info) | None => self.show_info(config),
        }
    }

    fn check_rules(&self, path: &Path, json: bool) -> anyhow::Result<()> {
        let snapshot = RuleSnapshot::load(path)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            return Ok(());
        }

        let report = snapshot.report();
        println!("Rules file: {}", path.display());
        println!("  accepted:  {}", report.accepted);
        println!("  disabled:  {}", report.disabled);
        println!("  malformed: {}", report.malformed.len());
        for record in &report.malformed {
            println!("    line {}: {}", record.line, record.reason);
        }
        for table in snapshot.tables() {
            println!("  {}", table);
        }

        if report.is_unparseable() {
            anyhow::bail!("no rule in {} could be parsed", path.display());
        }
        Ok(())
    }

    fn lookup_rule(&self, path: &Path, schema: &str, table: &str, column: &str) -> anyhow::Result<()> {
        let snapshot = RuleSnapshot::load(path)?;
        match snapshot.lookup(schema, table, column) {
            Some(rule) => println!("{}", rule),
            None => println!("no rule for {}.{}.{}", schema, table, column),
        }
        Ok(())
    }

    fn mask_value(
        &self,
        rule: &str,
        params: &[String],
        value: &str,
        settings: &StrategySettings,
    ) -> anyhow::Result<()> {
        let rule_type: RuleType = rule.parse().map_err(anyhow::Error::msg)?;
        let rule = MaskingRule::new("cli", "cli", "value", rule_type, params.to_vec(), true)?;
        println!("{}", mask_text(value, &rule, settings));
        Ok(())
    }

    async fn watch_rules(&self, path: &Path, interval_secs: u64) -> anyhow::Result<()> {
        let store = MaskingRuleStore::open(path)?;
        store.start_auto_reload(Duration::from_secs(interval_secs))?;
        println!(
            "Watching {} every {}s, press Ctrl-C to stop",
            path.display(),
            interval_secs
        );

        tokio::signal::ctrl_c().await?;
        store.shutdown();

        let stats = store.statistics();
        println!(
            "Reloads: {} succeeded, {} failed",
            stats.succeeded, stats.failed
        );
        if let Some(error) = stats.last_error {
            println!("Last error: {}", error);
        }
        Ok(())
    }

    fn show_info(&self, config: &MaskingConfig) -> anyhow::Result<()> {
        println!("RustDB Masking {}", crate::VERSION);
        println!("Rules:          {}", config.rules_path.display());
        println!(
            "Auto reload:    {} (every {}s)",
            config.auto_reload, config.reload_interval_secs
        );
        println!("Lineage policy: {}", config.lineage_policy);
        println!("Log level:      {}", config.logging.level);
        Ok(())
    }
}

/// Файл конфигурации, который читается, если путь не указан явно
const DEFAULT_CONFIG_FILE: &str = "masking.toml";

/// Читает явный файл конфигурации или файл по умолчанию, если он существует.
///
/// Отсутствие файла по умолчанию дает конфигурацию по умолчанию, ошибки разбора не скрываются.
fn read_config_file(explicit: Option<&Path>, fallback: &Path) -> anyhow::Result<MaskingConfig> {
    let path = match explicit {
        Some(path) => path,
        None if fallback.exists() => fallback,
        None => return Ok(MaskingConfig::default()),
    };
    MaskingConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))
}

fn rules_path<'a>(explicit: &'a Option<PathBuf>, config: &'a MaskingConfig) -> &'a Path {
    explicit.as_deref().unwrap_or(config.rules_path.as_path())
}
