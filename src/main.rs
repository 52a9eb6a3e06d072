//! Главный исполняемый файл rustdb-masking

use rustdb_masking::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::init();
    let config = cli.load_config()?;

    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    );
    if let Some(level) = &cli.log_level {
        logger.parse_filters(level);
    }
    logger.init();

    cli.execute(&config).await
}
