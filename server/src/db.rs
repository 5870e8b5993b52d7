use anyhow::Context;
use bb8_postgres::PostgresConnectionManager;
use tokio_postgres::NoTls;

pub type Pool = bb8::Pool<PostgresConnectionManager<NoTls>>;
pub type Client<'a> = bb8::PooledConnection<'a, PostgresConnectionManager<NoTls>>;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

pub async fn pool(database_url: &str) -> anyhow::Result<Pool> {
    let mgr = PostgresConnectionManager::new_from_stringlike(database_url, NoTls)
        .context("Invalid database URL")?;
    let pool = bb8::Pool::builder().build(mgr).await?;
    Ok(pool)
}

pub async fn migrate(database_url: &str) -> anyhow::Result<()> {
    let pool = pool(database_url).await?;
    let mut client = pool.get().await?;

    log::info!("Running migrations");
    let report = embedded::migrations::runner()
        .run_async(&mut *client)
        .await?;
    for migration in report.applied_migrations() {
        log::info!("Applied migration {}", migration);
    }
    Ok(())
}

pub async fn reset(database_url: &str) -> anyhow::Result<()> {
    {
        let pool = pool(database_url).await?;
        let client = pool.get().await?;
        log::warn!("Dropping all tables");
        client
            .batch_execute("DROP SCHEMA public CASCADE; CREATE SCHEMA public;")
            .await?;
    }
    migrate(database_url).await
}

