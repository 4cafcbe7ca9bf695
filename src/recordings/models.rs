use sea_orm::entity::prelude::*;

/// One sensor observation. Append-only; the archive job deletes every row
/// once it has been copied to cold storage.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recording")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub recording_id: i32,
    pub plant_id: i32,
    #[sea_orm(column_type = "Double")]
    pub soil_moisture: f64,
    #[sea_orm(column_type = "Double")]
    pub temperature: f64,
    pub last_watered: DateTime,
    pub recording_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::plants::models::Entity",
        from = "Column::PlantId",
        to = "crate::plants::models::Column::PlantId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Plants,
}

impl Related<crate::plants::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
