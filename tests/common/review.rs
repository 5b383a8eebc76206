use generic_repository::{EntityBase, SoftDeletable, SoftDeleteColumns};
use sea_orm::entity::prelude::*;

/// Soft-deletable child of a soft-deletable product.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    pub body: String,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
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

pub fn new(id: i32, product_id: i32, body: &str) -> Model {
    Model {
        id,
        product_id,
        body: body.to_string(),
        is_deleted: false,
        deleted_at: None,
    }
}
