//! `db` subcommand handlers.

use cinegoods_core::AppConfig;

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = cinegoods_db::PoolConfig::from_app_config(config);
    Ok(cinegoods_db::connect_pool(&config.database_url, pool_config).await?)
}

pub(crate) async fn run_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let applied = cinegoods_db::run_migrations(&pool).await?;
    println!("migrations applied: {applied}");
    Ok(())
}

pub(crate) async fn run_ping(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    cinegoods_db::ping(&pool).await?;
    println!("database reachable");
    Ok(())
}
