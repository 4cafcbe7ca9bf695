use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Botanist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Botanist::BotanistId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Botanist::FirstName).string().not_null())
                    .col(ColumnDef::new(Botanist::LastName).string().not_null())
                    .col(ColumnDef::new(Botanist::Email).string().not_null())
                    .col(ColumnDef::new(Botanist::Phone).string().not_null())
                    .to_owned(),
            )
            .await?;

        // A botanist is identified by all four contact fields together
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("botanist_natural_key_unique")
                    .table(Botanist::Table)
                    .col(Botanist::FirstName)
                    .col(Botanist::LastName)
                    .col(Botanist::Email)
                    .col(Botanist::Phone)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // plant_id is assigned by the sensor API, never generated here
        manager
            .create_table(
                Table::create()
                    .table(Plant::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Plant::PlantId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Plant::BotanistId).integer().not_null())
                    .col(ColumnDef::new(Plant::PlantName).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_plant_botanist_id")
                            .from(Plant::Table, Plant::BotanistId)
                            .to(Botanist::Table, Botanist::BotanistId)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Recording::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Recording::RecordingId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Recording::PlantId).integer().not_null())
                    .col(ColumnDef::new(Recording::SoilMoisture).double().not_null())
                    .col(ColumnDef::new(Recording::Temperature).double().not_null())
                    .col(ColumnDef::new(Recording::LastWatered).timestamp().not_null())
                    .col(ColumnDef::new(Recording::RecordingAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recording_plant_id")
                            .from(Recording::Table, Recording::PlantId)
                            .to(Plant::Table, Plant::PlantId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        // Dashboard reads the latest window per plant
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_recording_plant_id_recording_at")
                    .table(Recording::Table)
                    .col(Recording::PlantId)
                    .col(Recording::RecordingAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Recording::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Plant::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Botanist::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Botanist {
    Table,
    BotanistId,
    FirstName,
    LastName,
    Email,
    Phone,
}

#[derive(DeriveIden)]
enum Plant {
    Table,
    PlantId,
    BotanistId,
    PlantName,
}

#[derive(DeriveIden)]
enum Recording {
    Table,
    RecordingId,
    PlantId,
    SoilMoisture,
    Temperature,
    LastWatered,
    RecordingAt,
}
