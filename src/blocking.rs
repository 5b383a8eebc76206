//! Blocking entry points.
//!
//! Same operations as [`crate::UnitOfWork`] and [`crate::Repository`], driven on a
//! private current-thread runtime. Do not call these from inside an async runtime.
//!
//! Wrappers declare the runtime last: database handles must drop while it is alive.

use std::sync::Arc;

use sea_orm::sea_query::{Condition, IntoCondition};
use sea_orm::{ColumnTrait, EntityTrait, IntoActiveModel, Related};
use tokio::runtime::Runtime;

use crate::config::DatabaseConfig;
use crate::context::TransactionHandle;
use crate::entity::EntityBase;
use crate::error::Result;
use crate::model::EntityModel;
use crate::paged::PagedResult;

fn new_runtime() -> Result<Arc<Runtime>> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    Ok(Arc::new(runtime))
}

/// Blocking counterpart of [`crate::UnitOfWorkFactory`].
#[derive(Clone)]
pub struct UnitOfWorkFactory {
    inner: crate::UnitOfWorkFactory,
    runtime: Arc<Runtime>,
}

impl UnitOfWorkFactory {
    pub fn connect(config: &DatabaseConfig, model: EntityModel) -> Result<Self> {
        let runtime = new_runtime()?;
        let inner = runtime.block_on(crate::UnitOfWorkFactory::connect(config, model))?;
        Ok(Self { runtime, inner })
    }

    pub fn ensure_created(&self) -> Result<()> {
        self.runtime.block_on(self.inner.ensure_created())
    }

    pub fn create(&self) -> UnitOfWork {
        UnitOfWork {
            runtime: Arc::clone(&self.runtime),
            inner: self.inner.create(),
        }
    }
}

/// Blocking counterpart of [`crate::UnitOfWork`].
pub struct UnitOfWork {
    inner: crate::UnitOfWork,
    runtime: Arc<Runtime>,
}

impl UnitOfWork {
    pub fn repository<E: EntityBase>(&self) -> Result<Repository<E>> {
        Ok(Repository {
            runtime: Arc::clone(&self.runtime),
            inner: self.inner.repository::<E>()?,
        })
    }

    pub fn save_changes(&self) -> Result<u64> {
        self.runtime.block_on(self.inner.save_changes())
    }

    pub fn has_changes(&self) -> Result<bool> {
        self.inner.has_changes()
    }

    pub fn begin_transaction(&self) -> Result<TransactionHandle> {
        self.runtime.block_on(self.inner.begin_transaction())
    }

    pub fn commit(&self) -> Result<()> {
        self.runtime.block_on(self.inner.commit())
    }

    pub fn rollback(&self) -> Result<()> {
        self.runtime.block_on(self.inner.rollback())
    }

    pub fn dispose(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.dispose())
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if let Err(e) = self.runtime.block_on(self.inner.dispose()) {
            log::warn!("Failed to dispose unit of work: {}", e);
        }
    }
}

/// Blocking counterpart of [`crate::Repository`]. Directives mutate the shared
/// repository instance, exactly as on the async side.
pub struct Repository<E: EntityBase> {
    inner: Arc<crate::Repository<E>>,
    runtime: Arc<Runtime>,
}

impl<E: EntityBase> Repository<E> {
    pub fn include(&self, relation: E::Relation) -> &Self {
        self.inner.include(relation);
        self
    }

    pub fn as_no_tracking(&self) -> &Self {
        self.inner.as_no_tracking();
        self
    }

    pub fn order_by<C: ColumnTrait>(&self, column: C) -> &Self {
        self.inner.order_by(column);
        self
    }

    pub fn order_by_descending<C: ColumnTrait>(&self, column: C) -> &Self {
        self.inner.order_by_descending(column);
        self
    }

    pub fn then_by<C: ColumnTrait>(&self, column: C) -> Result<&Self> {
        self.inner.then_by(column)?;
        Ok(self)
    }

    pub fn then_by_descending<C: ColumnTrait>(&self, column: C) -> Result<&Self> {
        self.inner.then_by_descending(column)?;
        Ok(self)
    }

    pub fn reset(&self) -> &Self {
        self.inner.reset();
        self
    }

    pub fn get_by_id(&self, id: E::Key) -> Result<Option<E::Model>> {
        self.runtime.block_on(self.inner.get_by_id(id))
    }

    pub fn get_by_id_ignoring_filters(&self, id: E::Key) -> Result<Option<E::Model>> {
        self.runtime.block_on(self.inner.get_by_id_ignoring_filters(id))
    }

    pub fn get_all(&self) -> Result<Vec<E::Model>> {
        self.runtime.block_on(self.inner.get_all())
    }

    pub fn get_all_with_related<R>(&self) -> Result<Vec<(E::Model, Option<R::Model>)>>
    where
        R: EntityTrait<Model: Sync>,
        E: Related<R>,
    {
        self.runtime.block_on(self.inner.get_all_with_related::<R>())
    }

    pub fn find<F: IntoCondition>(&self, predicate: F) -> Result<Vec<E::Model>> {
        self.runtime.block_on(self.inner.find(predicate))
    }

    pub fn find_with_deleted<F: IntoCondition>(&self, predicate: F) -> Result<Vec<E::Model>> {
        self.runtime.block_on(self.inner.find_with_deleted(predicate))
    }

    pub fn find_single<F: IntoCondition>(&self, predicate: F) -> Result<Option<E::Model>> {
        self.runtime.block_on(self.inner.find_single(predicate))
    }

    pub fn any<F: IntoCondition>(&self, predicate: F) -> Result<bool> {
        self.runtime.block_on(self.inner.any(predicate))
    }

    pub fn count(&self, predicate: Option<Condition>) -> Result<u64> {
        self.runtime.block_on(self.inner.count(predicate))
    }

    pub fn get_paged(&self, page_number: u64, page_size: u64) -> Result<PagedResult<E::Model>> {
        self.runtime.block_on(self.inner.get_paged(page_number, page_size))
    }

    pub fn add<A>(&self, entity: A) -> Result<E::ActiveModel>
    where
        A: IntoActiveModel<E::ActiveModel>,
    {
        self.inner.add(entity)
    }

    pub fn add_range<A, I>(&self, entities: I) -> Result<Vec<E::ActiveModel>>
    where
        A: IntoActiveModel<E::ActiveModel>,
        I: IntoIterator<Item = A>,
    {
        self.inner.add_range(entities)
    }

    pub fn update(&self, entity: E::Model) -> Result<E::Model> {
        self.inner.update(entity)
    }

    pub fn update_range<I>(&self, entities: I) -> Result<Vec<E::Model>>
    where
        I: IntoIterator<Item = E::Model>,
    {
        self.inner.update_range(entities)
    }

    pub fn delete(&self, entity: &mut E::Model) -> Result<()> {
        self.inner.delete(entity)
    }

    pub fn delete_by_id(&self, id: E::Key) -> Result<()> {
        self.runtime.block_on(self.inner.delete_by_id(id))
    }

    pub fn delete_range<'a, I>(&self, entities: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a mut E::Model>,
    {
        self.inner.delete_range(entities)
    }

    pub fn delete_range_by_id<I>(&self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = E::Key>,
        I::IntoIter: Send,
    {
        self.runtime.block_on(self.inner.delete_range_by_id(ids))
    }

    pub fn hard_delete(&self, entity: &E::Model) -> Result<()> {
        self.inner.hard_delete(entity)
    }

    pub fn hard_delete_range<'a, I>(&self, entities: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a E::Model>,
    {
        self.inner.hard_delete_range(entities)
    }

    pub fn restore(&self, entity: &mut E::Model) -> Result<()> {
        self.inner.restore(entity)
    }

    pub fn restore_by_id(&self, id: E::Key) -> Result<()> {
        self.runtime.block_on(self.inner.restore_by_id(id))
    }
}
