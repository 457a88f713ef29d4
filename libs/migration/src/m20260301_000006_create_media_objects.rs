use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create media_objects table
        manager
            .create_table(
                Table::create()
                    .table(MediaObjects::Table)
                    .if_not_exists()
                    .col(pk_uuid(MediaObjects::Id))
                    .col(uuid(MediaObjects::OwnerId))
                    .col(
                        ColumnDef::new(MediaObjects::ObjectKey)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(string(MediaObjects::ContentType))
                    .col(big_integer(MediaObjects::ByteSize))
                    .col(
                        timestamp_with_time_zone(MediaObjects::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_media_objects_owner")
                            .from(MediaObjects::Table, MediaObjects::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index for owner-scoped listing
        manager
            .create_index(
                Index::create()
                    .name("idx_media_objects_owner_id")
                    .table(MediaObjects::Table)
                    .col(MediaObjects::OwnerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MediaObjects::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum MediaObjects {
    Table,
    Id,
    OwnerId,
    ObjectKey,
    ContentType,
    ByteSize,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
