use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "plant")]
pub struct Model {
    /// Assigned by the sensor API and stable across runs
    #[sea_orm(primary_key, auto_increment = false)]
    pub plant_id: i32,
    pub botanist_id: i32,
    pub plant_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::botanists::models::Entity",
        from = "Column::BotanistId",
        to = "crate::botanists::models::Column::BotanistId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Botanists,
    #[sea_orm(has_many = "crate::recordings::models::Entity")]
    Recordings,
}

impl Related<crate::botanists::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Botanists.def()
    }
}

impl Related<crate::recordings::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recordings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
