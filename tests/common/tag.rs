use generic_repository::EntityBase;
use sea_orm::entity::prelude::*;

/// Entity with a caller-supplied key.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl EntityBase for Entity {
    type Key = Uuid;

    fn key_column() -> Column {
        Column::Id
    }
}

pub fn new(name: &str) -> Model {
    Model {
        id: Uuid::new_v4(),
        name: name.to_string(),
    }
}
