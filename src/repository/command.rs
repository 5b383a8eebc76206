//! Staged mutations. Nothing here touches the database until the unit of work saves.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue, IntoActiveModel, Iterable};

use super::Repository;
use crate::entity::EntityBase;
use crate::error::Result;

impl<E: EntityBase> Repository<E> {
    /// Stage an insert and return the active model that will be written.
    ///
    /// Pass an active model with the key `NotSet` to let the database assign it.
    ///
    /// # Errors
    /// [`Error::Disposed`](crate::Error::Disposed) once the unit of work was disposed,
    /// like every other staging operation.
    pub fn add<A>(&self, entity: A) -> Result<E::ActiveModel>
    where
        A: IntoActiveModel<E::ActiveModel>,
    {
        let mut active = entity.into_active_model();
        // Values of a loaded model arrive as `Unchanged`; an insert has to write them.
        for column in E::Column::iter() {
            if let ActiveValue::Unchanged(value) = active.get(column) {
                active.set(column, value);
            }
        }
        self.context.stage_insert::<E>(active.clone())?;
        Ok(active)
    }

    pub fn add_range<A, I>(&self, entities: I) -> Result<Vec<E::ActiveModel>>
    where
        A: IntoActiveModel<E::ActiveModel>,
        I: IntoIterator<Item = A>,
    {
        entities.into_iter().map(|entity| self.add(entity)).collect()
    }

    /// Stage a full-row update.
    pub fn update(&self, entity: E::Model) -> Result<E::Model> {
        self.context.stage_update::<E>(entity.clone())?;
        Ok(entity)
    }

    pub fn update_range<I>(&self, entities: I) -> Result<Vec<E::Model>>
    where
        I: IntoIterator<Item = E::Model>,
    {
        entities.into_iter().map(|entity| self.update(entity)).collect()
    }

    /// Delete `entity`.
    ///
    /// Soft-deletable entities are flagged as deleted with the current UTC time and an
    /// update is staged; the caller's model reflects the change. Any other entity is
    /// staged for physical removal.
    pub fn delete(&self, entity: &mut E::Model) -> Result<()> {
        let soft_deleted = match E::soft_delete(entity) {
            Some(soft) => {
                soft.set_deleted(true);
                soft.set_deleted_at(Some(Utc::now()));
                true
            }
            None => false,
        };

        if soft_deleted {
            self.context.stage_update::<E>(entity.clone())
        } else {
            self.context.stage_delete::<E>(entity.clone())
        }
    }

    /// Delete the entity with the given key. Missing or filtered-out keys are ignored.
    pub async fn delete_by_id(&self, id: E::Key) -> Result<()> {
        if let Some(mut entity) = self.get_by_id(id).await? {
            self.delete(&mut entity)?;
        }
        Ok(())
    }

    pub fn delete_range<'a, I>(&self, entities: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a mut E::Model>,
    {
        for entity in entities {
            self.delete(entity)?;
        }
        Ok(())
    }

    /// Delete every entity whose key is listed. Deletions staged before a failing
    /// lookup stay staged.
    pub async fn delete_range_by_id<I>(&self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = E::Key>,
        I::IntoIter: Send,
    {
        for id in ids {
            self.delete_by_id(id).await?;
        }
        Ok(())
    }

    /// Stage a physical removal regardless of the soft-delete capability.
    pub fn hard_delete(&self, entity: &E::Model) -> Result<()> {
        self.context.stage_delete::<E>(entity.clone())
    }

    pub fn hard_delete_range<'a, I>(&self, entities: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a E::Model>,
    {
        for entity in entities {
            self.hard_delete(entity)?;
        }
        Ok(())
    }

    /// Undo a soft delete. Entities without the capability are left untouched.
    pub fn restore(&self, entity: &mut E::Model) -> Result<()> {
        let restored = match E::soft_delete(entity) {
            Some(soft) => {
                soft.set_deleted(false);
                soft.set_deleted_at(None);
                true
            }
            None => false,
        };

        if restored {
            self.context.stage_update::<E>(entity.clone())?;
        }
        Ok(())
    }

    /// Restore the entity with the given key, looked up with the standing filters
    /// bypassed. Missing keys are ignored.
    pub async fn restore_by_id(&self, id: E::Key) -> Result<()> {
        if let Some(mut entity) = self.get_by_id_ignoring_filters(id).await? {
            self.restore(&mut entity)?;
        }
        Ok(())
    }
}
