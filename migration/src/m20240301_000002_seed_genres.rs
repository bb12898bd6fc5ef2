use std::time::{SystemTime, UNIX_EPOCH};

use sea_orm_migration::prelude::*;

use crate::m20240301_000001_create_catalog::Genres;

const DEFAULT_GENRES: [&str; 8] =
    ["Drama", "Action", "Comedy", "Crime", "Sci-Fi", "Fantasy", "Thriller", "Mystery"];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| DbErr::Custom(e.to_string()))?
            .as_secs() as i64;

        let mut insert = Query::insert();
        insert.into_table(Genres::Table).columns([
            Genres::GenreName,
            Genres::CreatedAt,
            Genres::UpdatedAt,
        ]);
        for name in DEFAULT_GENRES {
            insert.values_panic([name.into(), now.into(), now.into()]);
        }

        manager.exec_stmt(insert).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Genres::Table)
            .and_where(Expr::col(Genres::GenreName).is_in(DEFAULT_GENRES))
            .to_owned();

        manager.exec_stmt(delete).await?;
        Ok(())
    }
}
