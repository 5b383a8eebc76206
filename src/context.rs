//! Persistence context.
//!
//! SeaORM executes every statement immediately and keeps no change tracker, so the
//! [`DataContext`] supplies the pieces the repositories and the unit of work need on
//! top of it:
//! - entity views with the standing filters of the [`EntityModel`] applied,
//! - a change tracker that stages inserts, updates and removals until
//!   [`DataContext::save_changes`],
//! - a single explicit transaction slot. While a transaction is open, every read and
//!   every save runs on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use sea_orm::prelude::DateTimeUtc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, Iterable, ModelTrait, PaginatorTrait, QueryFilter, Schema, Select, SelectTwo, TransactionTrait, Value,
};
use uuid::Uuid;

use crate::entity::EntityBase;
use crate::error::{Error, Result};
use crate::model::EntityModel;

/// Run `$body` with `$db` bound to the open transaction if there is one, otherwise to
/// the connection.
macro_rules! with_executor {
    ($ctx:expr, |$db:ident| $body:expr) => {{
        let slot = $ctx.transaction.lock().await;
        match slot.as_ref() {
            Some(active) => {
                let $db = &active.txn;
                $body
            }
            None => {
                let $db = &$ctx.conn;
                $body
            }
        }
    }};
}

/// State of an entity known to the change tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Loaded by a tracking read and not staged for any change
    Unchanged,
    /// Staged for insertion
    Added,
    /// Staged for update
    Modified,
    /// Staged for physical removal
    Deleted,
}

/// One entity known to the change tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntry {
    /// Table name of the entity
    pub entity: String,
    /// Primary key, `None` for added entities whose key the database assigns
    pub key: Option<Value>,
    pub state: EntityState,
}

/// Identifies the explicit transaction opened by
/// [`UnitOfWork::begin_transaction`](crate::UnitOfWork::begin_transaction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHandle {
    pub id: Uuid,
    pub started_at: DateTimeUtc,
}

struct ActiveTransaction {
    txn: DatabaseTransaction,
    handle: TransactionHandle,
}

#[async_trait]
trait PendingChange: Send + Sync {
    async fn apply(&self, txn: &DatabaseTransaction) -> std::result::Result<u64, DbErr>;
}

enum Change<E: EntityBase> {
    Insert(E::ActiveModel),
    Update(E::Model),
    Delete(E::Model),
}

#[async_trait]
impl<E: EntityBase> PendingChange for Change<E> {
    async fn apply(&self, txn: &DatabaseTransaction) -> std::result::Result<u64, DbErr> {
        match self {
            Change::Insert(active) => {
                E::insert(active.clone()).exec(txn).await?;
                Ok(1)
            }
            Change::Update(model) => {
                let result = E::update_many()
                    .set(full_active_model::<E>(model))
                    .filter(E::key_column().eq(model.get(E::key_column())))
                    .exec(txn)
                    .await?;
                Ok(result.rows_affected)
            }
            Change::Delete(model) => {
                let result = E::delete_many()
                    .filter(E::key_column().eq(model.get(E::key_column())))
                    .exec(txn)
                    .await?;
                Ok(result.rows_affected)
            }
        }
    }
}

/// Active model with every column of `model` set, so an update writes the full row.
fn full_active_model<E: EntityBase>(model: &E::Model) -> E::ActiveModel {
    let mut active = <E::ActiveModel as ActiveModelTrait>::default();
    for column in E::Column::iter() {
        active.set(column, model.get(column));
    }
    active
}

#[derive(Default)]
struct ChangeTracker {
    entries: Vec<TrackedEntry>,
    pending: Vec<Arc<dyn PendingChange>>,
}

impl ChangeTracker {
    fn position(&self, entity: &str, key: &Value) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.entity == entity && entry.key.as_ref() == Some(key))
    }

    fn attach(&mut self, entity: &str, key: Value) {
        if self.position(entity, &key).is_none() {
            self.entries.push(TrackedEntry {
                entity: entity.to_string(),
                key: Some(key),
                state: EntityState::Unchanged,
            });
        }
    }

    fn stage(&mut self, entity: &str, key: Option<Value>, state: EntityState, change: Arc<dyn PendingChange>) {
        self.pending.push(change);

        let existing = key.as_ref().and_then(|key| self.position(entity, key));
        match existing {
            Some(index) => {
                let entry = &mut self.entries[index];
                // An entity added in this context stays an insert when modified again.
                if !(entry.state == EntityState::Added && state == EntityState::Modified) {
                    entry.state = state;
                }
            }
            None => self.entries.push(TrackedEntry {
                entity: entity.to_string(),
                key,
                state,
            }),
        }
    }

    /// Mark the first `applied` staged changes as persisted. Entries without a key
    /// cannot be matched by later reads and are forgotten.
    fn accept(&mut self, applied: usize) {
        self.pending.drain(..applied.min(self.pending.len()));
        self.entries
            .retain(|entry| entry.state != EntityState::Deleted && entry.key.is_some());
        for entry in &mut self.entries {
            entry.state = EntityState::Unchanged;
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }
}

/// One session against the database: connection, entity model, change tracker and
/// transaction slot.
///
/// A context is meant to serve one logical flow at a time. It is `Send + Sync` so it
/// can cross await points, not so that several flows can share it.
pub struct DataContext {
    conn: DatabaseConnection,
    model: Arc<EntityModel>,
    tracker: Mutex<ChangeTracker>,
    transaction: tokio::sync::Mutex<Option<ActiveTransaction>>,
    disposed: AtomicBool,
}

impl DataContext {
    pub fn new(conn: DatabaseConnection, model: Arc<EntityModel>) -> Self {
        Self {
            conn,
            model,
            tracker: Mutex::new(ChangeTracker::default()),
            transaction: tokio::sync::Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn model(&self) -> &EntityModel {
        &self.model
    }

    /// Whether the owning unit of work released this context.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    /// Create the tables of every registered entity type that do not exist yet.
    pub async fn ensure_created(&self) -> Result<()> {
        self.ensure_open()?;
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);
        for entity in self.model.entity_types() {
            let mut statement = entity.create_table_statement(&schema);
            statement.if_not_exists();
            debug!("Ensuring table '{}' exists", entity.name());
            with_executor!(self, |db| db.execute(backend.build(&statement)).await)?;
        }
        Ok(())
    }

    /// Entity view with the standing filters of the model applied.
    pub fn set<E: EntityBase>(&self) -> Select<E> {
        match self.model.query_filter::<E>() {
            Some(filter) => E::find().filter(filter.clone()),
            None => E::find(),
        }
    }

    /// Entity view without the standing filters, soft-deleted rows included.
    pub fn set_ignoring_filters<E: EntityBase>(&self) -> Select<E> {
        E::find()
    }

    pub(crate) async fn fetch_all<E: EntityBase>(&self, select: Select<E>) -> Result<Vec<E::Model>> {
        self.ensure_open()?;
        Ok(with_executor!(self, |db| select.all(db).await)?)
    }

    pub(crate) async fn fetch_all_with_related<E, R>(
        &self,
        select: SelectTwo<E, R>,
    ) -> Result<Vec<(E::Model, Option<R::Model>)>>
    where
        E: EntityBase,
        R: EntityTrait<Model: Sync>,
    {
        self.ensure_open()?;
        Ok(with_executor!(self, |db| select.all(db).await)?)
    }

    pub(crate) async fn fetch_count<E: EntityBase>(&self, select: Select<E>) -> Result<u64> {
        self.ensure_open()?;
        Ok(with_executor!(self, |db| select.count(db).await)?)
    }

    /// Attach models returned by a tracking read.
    pub(crate) fn attach<E: EntityBase>(&self, models: &[E::Model]) {
        let entity = E::entity_name();
        let mut tracker = self.tracker();
        for model in models {
            tracker.attach(&entity, model.get(E::key_column()));
        }
    }

    pub(crate) fn stage_insert<E: EntityBase>(&self, active: E::ActiveModel) -> Result<()> {
        let key = match active.get(E::key_column()) {
            ActiveValue::Set(value) | ActiveValue::Unchanged(value) => Some(value),
            ActiveValue::NotSet => None,
        };
        self.stage::<E>(key, EntityState::Added, Change::<E>::Insert(active))
    }

    pub(crate) fn stage_update<E: EntityBase>(&self, model: E::Model) -> Result<()> {
        let key = model.get(E::key_column());
        self.stage::<E>(Some(key), EntityState::Modified, Change::<E>::Update(model))
    }

    pub(crate) fn stage_delete<E: EntityBase>(&self, model: E::Model) -> Result<()> {
        let key = model.get(E::key_column());
        self.stage::<E>(Some(key), EntityState::Deleted, Change::<E>::Delete(model))
    }

    fn stage<E: EntityBase>(&self, key: Option<Value>, state: EntityState, change: Change<E>) -> Result<()> {
        self.ensure_open()?;
        let entity = E::entity_name();
        debug!("Staging {:?} of '{}' (key {:?})", state, entity, key);
        self.tracker().stage(&entity, key, state, Arc::new(change));
        Ok(())
    }

    /// Snapshot of the entities known to the change tracker.
    pub fn entries(&self) -> Vec<TrackedEntry> {
        self.tracker().entries.clone()
    }

    /// Whether any change is staged and not yet saved.
    pub fn has_changes(&self) -> bool {
        !self.tracker().pending.is_empty()
    }

    /// Number of staged changes not yet saved.
    pub fn pending_changes(&self) -> usize {
        self.tracker().pending.len()
    }

    /// Drop every staged change and forget every tracked entity.
    pub fn clear_changes(&self) {
        self.tracker().clear();
    }

    /// Flush every staged change in staging order and return the number of affected
    /// rows.
    ///
    /// Either all staged changes are applied or none are, and on failure they stay
    /// staged. Without an explicit transaction the flush runs in an implicit one;
    /// inside an explicit transaction it runs in a savepoint.
    pub async fn save_changes(&self) -> Result<u64> {
        self.ensure_open()?;
        let pending = self.tracker().pending.clone();
        if pending.is_empty() {
            return Ok(0);
        }

        let slot = self.transaction.lock().await;
        let affected = match slot.as_ref() {
            Some(active) => apply_atomically(&pending, &active.txn).await?,
            None => apply_atomically(&pending, &self.conn).await?,
        };
        drop(slot);

        self.tracker().accept(pending.len());
        info!("Saved {} change(s), {} row(s) affected", pending.len(), affected);
        Ok(affected)
    }

    /// Open the explicit transaction.
    ///
    /// # Errors
    /// [`Error::InvalidState`] if a transaction is already open.
    pub async fn begin_transaction(&self) -> Result<TransactionHandle> {
        self.ensure_open()?;
        let mut slot = self.transaction.lock().await;
        if slot.is_some() {
            return Err(Error::invalid_state(
                "A transaction is already in progress. Commit or roll back the current transaction before starting a new one.",
            ));
        }

        let txn = self.conn.begin().await?;
        let handle = TransactionHandle {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        info!("Transaction {} started", handle.id);
        *slot = Some(ActiveTransaction {
            txn,
            handle: handle.clone(),
        });
        Ok(handle)
    }

    /// Commit the explicit transaction. The slot is cleared whether or not the commit
    /// succeeds.
    ///
    /// # Errors
    /// [`Error::InvalidState`] if no transaction is open.
    pub async fn commit(&self) -> Result<()> {
        let active = self.take_transaction("committing").await?;
        let id = active.handle.id;
        active.txn.commit().await?;
        info!("Transaction {} committed", id);
        Ok(())
    }

    /// Roll back the explicit transaction. The slot is cleared whether or not the
    /// rollback succeeds.
    ///
    /// # Errors
    /// [`Error::InvalidState`] if no transaction is open.
    pub async fn rollback(&self) -> Result<()> {
        let active = self.take_transaction("rolling back").await?;
        let id = active.handle.id;
        active.txn.rollback().await?;
        info!("Transaction {} rolled back", id);
        Ok(())
    }

    async fn take_transaction(&self, action: &str) -> Result<ActiveTransaction> {
        self.ensure_open()?;
        self.transaction.lock().await.take().ok_or_else(|| {
            Error::invalid_state(format!(
                "No transaction is in progress. Call begin_transaction before {}.",
                action
            ))
        })
    }

    /// Handle of the open transaction, if any.
    pub async fn current_transaction(&self) -> Option<TransactionHandle> {
        self.transaction
            .lock()
            .await
            .as_ref()
            .map(|active| active.handle.clone())
    }

    /// Release the context: forget every staged change, roll back the open
    /// transaction and refuse any further work. Returns whether a transaction was
    /// rolled back.
    pub(crate) async fn close(&self) -> Result<bool> {
        self.disposed.store(true, Ordering::Release);
        self.tracker().clear();
        let active = self.transaction.lock().await.take();
        match active {
            Some(active) => {
                active.txn.rollback().await?;
                info!("Transaction {} rolled back", active.handle.id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Like [`close`](Self::close) without waiting. SeaORM rolls back a transaction
    /// that is dropped before being committed.
    pub(crate) fn close_now(&self) -> bool {
        self.disposed.store(true, Ordering::Release);
        self.tracker().clear();
        match self.transaction.try_lock() {
            Ok(mut slot) => slot.take().is_some(),
            Err(_) => false,
        }
    }

    fn tracker(&self) -> MutexGuard<'_, ChangeTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Apply `pending` in a transaction nested in `db`: a new transaction on a
/// connection, a savepoint on an open transaction.
async fn apply_atomically<C>(pending: &[Arc<dyn PendingChange>], db: &C) -> Result<u64>
where
    C: TransactionTrait + Sync,
{
    let txn = db.begin().await?;
    match apply_all(pending, &txn).await {
        Ok(affected) => {
            txn.commit().await?;
            Ok(affected)
        }
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                warn!("Failed to roll back a failed save: {}", rollback);
            }
            Err(e)
        }
    }
}

async fn apply_all(pending: &[Arc<dyn PendingChange>], txn: &DatabaseTransaction) -> Result<u64> {
    let mut affected = 0;
    for change in pending {
        affected += change.apply(txn).await?;
    }
    Ok(affected)
}
