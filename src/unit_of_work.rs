//! Unit of work: one repository per entity type over a shared [`DataContext`], plus
//! the explicit transaction boundary.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, warn};
use sea_orm::{Database, DatabaseConnection};

use crate::config::DatabaseConfig;
use crate::context::{DataContext, TransactionHandle};
use crate::entity::EntityBase;
use crate::error::{Error, Result};
use crate::model::EntityModel;
use crate::repository::Repository;

type RepositoryCache = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Coordinates the repositories of one logical flow so their staged changes are
/// saved together, optionally inside one explicit transaction.
///
/// ```rust,ignore
/// let mut uow = factory.create();
/// let products = uow.repository::<product::Entity>()?;
/// products.add(product::ActiveModel { name: Set("Laptop".into()), ..Default::default() })?;
/// uow.save_changes().await?;
/// uow.dispose().await?;
/// ```
pub struct UnitOfWork {
    context: Option<Arc<DataContext>>,
    repositories: Mutex<RepositoryCache>,
}

impl UnitOfWork {
    pub fn new(context: Arc<DataContext>) -> Self {
        Self {
            context: Some(context),
            repositories: Mutex::new(HashMap::new()),
        }
    }

    /// Shared context of this unit of work.
    pub fn context(&self) -> Result<&Arc<DataContext>> {
        self.context.as_ref().ok_or(Error::Disposed)
    }

    /// Repository for `E`. Repeated calls return the same instance.
    pub fn repository<E: EntityBase>(&self) -> Result<Arc<Repository<E>>> {
        let context = self.context()?;
        let cached = Arc::clone(self.repositories().entry(TypeId::of::<E>()).or_insert_with(|| {
            let repository: Arc<dyn Any + Send + Sync> = Arc::new(Repository::<E>::new(Arc::clone(context)));
            repository
        }));

        cached.downcast::<Repository<E>>().map_err(|_| {
            Error::invalid_state(format!(
                "repository cache entry for '{}' has an unexpected type",
                E::entity_name()
            ))
        })
    }

    /// Persist every staged change; see [`DataContext::save_changes`].
    pub async fn save_changes(&self) -> Result<u64> {
        self.context()?.save_changes().await
    }

    pub fn has_changes(&self) -> Result<bool> {
        Ok(self.context()?.has_changes())
    }

    /// Open an explicit transaction. Reads and saves run inside it until
    /// [`commit`](Self::commit) or [`rollback`](Self::rollback).
    ///
    /// # Errors
    /// [`Error::InvalidState`] if a transaction is already open.
    pub async fn begin_transaction(&self) -> Result<TransactionHandle> {
        self.context()?.begin_transaction().await
    }

    /// # Errors
    /// [`Error::InvalidState`] if no transaction is open.
    pub async fn commit(&self) -> Result<()> {
        self.context()?.commit().await
    }

    /// # Errors
    /// [`Error::InvalidState`] if no transaction is open.
    pub async fn rollback(&self) -> Result<()> {
        self.context()?.rollback().await
    }

    pub async fn current_transaction(&self) -> Result<Option<TransactionHandle>> {
        Ok(self.context()?.current_transaction().await)
    }

    pub fn is_disposed(&self) -> bool {
        self.context.is_none()
    }

    /// Roll back an open transaction, discard staged changes, drop the cached
    /// repositories and release the context. Repositories obtained earlier fail with
    /// [`Error::Disposed`] from then on. Calling it again does nothing.
    pub async fn dispose(&mut self) -> Result<()> {
        let Some(context) = self.context.take() else {
            return Ok(());
        };
        self.repositories().clear();

        if context.close().await? {
            warn!("Unit of work disposed with an open transaction, rolled back");
        }
        info!("Unit of work disposed");
        Ok(())
    }

    fn repositories(&self) -> MutexGuard<'_, RepositoryCache> {
        self.repositories.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            if context.close_now() {
                warn!("Unit of work dropped with an open transaction, rolled back");
            }
        }
    }
}

/// Creates units of work sharing one connection pool and one entity model.
#[derive(Clone)]
pub struct UnitOfWorkFactory {
    conn: DatabaseConnection,
    model: Arc<EntityModel>,
}

impl UnitOfWorkFactory {
    pub fn new(conn: DatabaseConnection, model: EntityModel) -> Self {
        Self {
            conn,
            model: Arc::new(model),
        }
    }

    /// Connect with `config` and, if configured, create the missing tables.
    pub async fn connect(config: &DatabaseConfig, model: EntityModel) -> Result<Self> {
        let conn = Database::connect(config.connect_options()?).await?;
        info!("Connected to {}", config.url);

        let factory = Self::new(conn, model);
        if config.ensure_created {
            factory.ensure_created().await?;
        }
        Ok(factory)
    }

    /// Create the tables of the registered entity types that do not exist yet.
    pub async fn ensure_created(&self) -> Result<()> {
        self.new_context().ensure_created().await
    }

    pub fn create(&self) -> UnitOfWork {
        UnitOfWork::new(Arc::new(self.new_context()))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn model(&self) -> &EntityModel {
        &self.model
    }

    fn new_context(&self) -> DataContext {
        DataContext::new(self.conn.clone(), Arc::clone(&self.model))
    }
}
