use sea_orm::entity::prelude::*;

/// A botanist responsible for one or more plants. Rows are never updated:
/// identity is the (first_name, last_name, email, phone) tuple, and
/// `botanist_id` is only a surrogate for the plant foreign key.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "botanist")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub botanist_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::plants::models::Entity")]
    Plants,
}

impl Related<crate::plants::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Natural key of a botanist, compared exactly (case-sensitive)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BotanistKey {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl From<&Model> for BotanistKey {
    fn from(model: &Model) -> Self {
        Self {
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
            email: model.email.clone(),
            phone: model.phone.clone(),
        }
    }
}
