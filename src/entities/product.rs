use generic_repository::{EntityBase, SoftDeletable, SoftDeleteColumns};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub category_id: i32,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl SoftDeletable for Model {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn set_deleted(&mut self, deleted: bool) {
        self.is_deleted = deleted;
    }

    fn deleted_at(&self) -> Option<DateTimeUtc> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, deleted_at: Option<DateTimeUtc>) {
        self.deleted_at = deleted_at;
    }
}

impl EntityBase for Entity {
    type Key = i32;

    fn key_column() -> Column {
        Column::Id
    }

    fn soft_delete(model: &mut Model) -> Option<&mut dyn SoftDeletable> {
        Some(model)
    }

    fn soft_delete_columns() -> Option<SoftDeleteColumns<Column>> {
        Some(SoftDeleteColumns::new(Column::IsDeleted, Column::DeletedAt))
    }
}
