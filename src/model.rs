//! Entity model configuration.
//!
//! The [`ModelBuilder`] is the one-time, startup-time step that declares which entity
//! types a [`DataContext`](crate::DataContext) knows about and which standing filters
//! apply to them. Once built, the [`EntityModel`] is immutable and shared by every
//! context created from it.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use log::debug;
use sea_orm::sea_query::{Condition, IntoCondition, TableCreateStatement, TableRef};
use sea_orm::{ColumnTrait, EntityName, Schema};

use crate::entity::EntityBase;
use crate::error::{Error, Result};

type CreateTableFn = fn(&Schema) -> TableCreateStatement;

/// Description of one registered entity type.
#[derive(Clone)]
pub struct EntityType {
    type_id: TypeId,
    name: String,
    table: TableRef,
    soft_delete_filter: Option<Condition>,
    query_filter: Option<Condition>,
    create_table: CreateTableFn,
}

impl EntityType {
    fn of<E: EntityBase>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            name: E::entity_name(),
            table: E::default().table_ref(),
            soft_delete_filter: E::soft_delete_columns()
                .map(|columns| Condition::all().add(columns.is_deleted.eq(false))),
            query_filter: None,
            create_table: |schema| schema.create_table_from_entity(E::default()),
        }
    }

    /// Table name of the entity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the entity type exposes the soft-delete capability.
    pub fn is_soft_deletable(&self) -> bool {
        self.soft_delete_filter.is_some()
    }

    /// Standing filter applied to every read of this entity, if any.
    pub fn query_filter(&self) -> Option<&Condition> {
        self.query_filter.as_ref()
    }

    pub(crate) fn create_table_statement(&self, schema: &Schema) -> TableCreateStatement {
        (self.create_table)(schema)
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("soft_deletable", &self.is_soft_deletable())
            .field("query_filter", &self.query_filter)
            .finish()
    }
}

/// Builder for an [`EntityModel`].
///
/// ```rust,ignore
/// let model = ModelBuilder::new()
///     .entity::<category::Entity>()
///     .entity::<product::Entity>()
///     .configure_soft_delete()
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ModelBuilder {
    entities: Vec<EntityType>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type. Registering the same type twice keeps the first
    /// registration.
    pub fn entity<E: EntityBase>(mut self) -> Self {
        if self.position::<E>().is_none() {
            debug!("Registering entity type '{}'", E::entity_name());
            self.entities.push(EntityType::of::<E>());
        }
        self
    }

    /// Enumerate the registered entity types in registration order.
    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.entities.iter()
    }

    /// Install a standing predicate on a registered entity type. The predicate is
    /// combined (AND) with any filter already installed on that type.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the entity type was not registered.
    pub fn has_query_filter<E, F>(mut self, filter: F) -> Result<Self>
    where
        E: EntityBase,
        F: IntoCondition,
    {
        let index = self.position::<E>().ok_or_else(|| {
            Error::invalid_argument(format!(
                "entity type '{}' must be registered before installing a query filter",
                E::entity_name()
            ))
        })?;
        let entity = &mut self.entities[index];
        entity.query_filter = Some(combine(entity.query_filter.take(), filter.into_condition()));
        Ok(self)
    }

    /// Install the standing "not deleted" filter on every registered entity type that
    /// exposes the soft-delete capability. Types without it are left untouched.
    pub fn configure_soft_delete(mut self) -> Self {
        for entity in &mut self.entities {
            if let Some(filter) = entity.soft_delete_filter.clone() {
                debug!("Installing soft delete filter on '{}'", entity.name);
                entity.query_filter = Some(combine(entity.query_filter.take(), filter));
            }
        }
        self
    }

    /// Freeze the configuration.
    pub fn build(self) -> EntityModel {
        let index = self
            .entities
            .iter()
            .enumerate()
            .map(|(i, entity)| (entity.type_id, i))
            .collect();
        EntityModel {
            entities: self.entities,
            index,
        }
    }

    fn position<E: EntityBase>(&self) -> Option<usize> {
        let type_id = TypeId::of::<E>();
        self.entities.iter().position(|entity| entity.type_id == type_id)
    }
}

fn combine(existing: Option<Condition>, filter: Condition) -> Condition {
    match existing {
        Some(existing) => Condition::all().add(existing).add(filter),
        None => filter,
    }
}

/// Immutable entity model produced by [`ModelBuilder::build`].
#[derive(Debug, Default)]
pub struct EntityModel {
    entities: Vec<EntityType>,
    index: HashMap<TypeId, usize>,
}

impl EntityModel {
    /// Registered entity types in registration order.
    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.entities.iter()
    }

    /// Lookup of a registered entity type.
    pub fn find<E: EntityBase>(&self) -> Option<&EntityType> {
        self.index.get(&TypeId::of::<E>()).map(|&i| &self.entities[i])
    }

    /// Standing filter installed for `E`, if any. Unregistered types have none.
    pub fn query_filter<E: EntityBase>(&self) -> Option<&Condition> {
        self.find::<E>().and_then(EntityType::query_filter)
    }

    /// Standing filter of the registered entity stored in `table`. Used for the
    /// target side of joins, where only the table is known.
    pub fn query_filter_for_table(&self, table: &TableRef) -> Option<&Condition> {
        self.entities
            .iter()
            .find(|entity| &entity.table == table)
            .and_then(EntityType::query_filter)
    }
}
