use anyhow::Context;
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ConnectOptions, Database, DatabaseConnection,
    sqlx::sqlite::{SqliteJournalMode, SqliteSynchronous},
};

pub async fn connect_and_migrate(
    database_url: &str,
    max_connections: u32,
) -> anyhow::Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(database_url);
    opts.max_connections(max_connections).sqlx_logging(false);
    // Applied by sqlx on every pooled SQLite connection; ignored for other backends.
    opts.map_sqlx_sqlite_opts(|sqlite| {
        sqlite.journal_mode(SqliteJournalMode::Wal).synchronous(SqliteSynchronous::Normal)
    });

    let db = Database::connect(opts).await.context("connecting to database")?;

    Migrator::up(&db, None).await.context("running migrations")?;
    Ok(db)
}
