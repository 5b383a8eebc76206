//! Entity identity model.
//!
//! Every entity handled by a [`Repository`](crate::Repository) is a SeaORM entity that
//! also implements [`EntityBase`]: it names its primary key type and column, and may opt
//! into the soft-delete capability.
//!
//! Soft delete is a capability, not a base type. The repository asks the entity at
//! runtime whether a given model instance can be soft deleted, and the model
//! configuration asks the entity type which column carries the deleted flag so it can
//! install the standing "not deleted" filter.
//!
//! ```rust,ignore
//! impl EntityBase for product::Entity {
//!     type Key = i32;
//!
//!     fn key_column() -> Self::Column {
//!         product::Column::Id
//!     }
//!
//!     fn soft_delete(model: &mut Self::Model) -> Option<&mut dyn SoftDeletable> {
//!         Some(model)
//!     }
//!
//!     fn soft_delete_columns() -> Option<SoftDeleteColumns<Self::Column>> {
//!         Some(SoftDeleteColumns::new(product::Column::IsDeleted, product::Column::DeletedAt))
//!     }
//! }
//! ```

use std::fmt::Debug;

use sea_orm::prelude::DateTimeUtc;
use sea_orm::{ActiveModelBehavior, EntityTrait, Value};

/// Contract every persisted entity satisfies: a typed primary key.
///
/// Keys are always compared by value, either in SQL against [`EntityBase::key_column`]
/// or through [`sea_orm::Value`] equality in the change tracker.
pub trait EntityBase:
    EntityTrait<
    Model: Sync,
    ActiveModel: ActiveModelBehavior + Send + Sync,
    Column: Send + Sync,
    Relation: Send + Sync,
>
    + 'static
{
    /// Primary key type.
    type Key: Into<Value> + Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Column holding the primary key.
    fn key_column() -> Self::Column;

    /// Soft-delete view of a model instance, `None` when the entity does not have the
    /// capability.
    fn soft_delete(_model: &mut Self::Model) -> Option<&mut dyn SoftDeletable> {
        None
    }

    /// Columns backing the soft-delete capability, used when installing the standing
    /// filter. Entities returning `Some` from [`EntityBase::soft_delete`] return `Some`
    /// here too.
    fn soft_delete_columns() -> Option<SoftDeleteColumns<Self::Column>> {
        None
    }

    /// Table name, used to label tracker entries and errors.
    fn entity_name() -> String {
        Self::default().table_name().to_string()
    }
}

/// Capability of models that are flagged rather than physically removed on delete.
pub trait SoftDeletable {
    fn is_deleted(&self) -> bool;

    fn set_deleted(&mut self, deleted: bool);

    /// When the model was soft deleted.
    fn deleted_at(&self) -> Option<DateTimeUtc>;

    fn set_deleted_at(&mut self, deleted_at: Option<DateTimeUtc>);
}

/// Column pair backing [`SoftDeletable`].
#[derive(Clone, Copy, Debug)]
pub struct SoftDeleteColumns<C> {
    pub is_deleted: C,
    pub deleted_at: C,
}

impl<C> SoftDeleteColumns<C> {
    pub fn new(is_deleted: C, deleted_at: C) -> Self {
        Self { is_deleted, deleted_at }
    }
}
