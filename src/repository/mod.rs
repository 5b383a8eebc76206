//! Generic repository.
//!
//! One [`Repository`] exists per entity type per unit of work. It combines the query
//! builder ([`query`]) with the staged mutations ([`command`]); both work against the
//! shared [`DataContext`].
//!
//! The query builder is a mutable builder: directives such as
//! [`Repository::include`] or [`Repository::order_by`] change the state of the
//! repository instance itself and return `&Self` so they chain. The state persists
//! across terminal reads until [`Repository::reset`].

mod command;
mod query;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sea_orm::sea_query::SimpleExpr;
use sea_orm::Order;

use crate::context::DataContext;
use crate::entity::EntityBase;

/// Directives accumulated by the query builder.
struct QueryState<E: EntityBase> {
    includes: Vec<E::Relation>,
    tracking: bool,
    ordering: Vec<(SimpleExpr, Order)>,
}

impl<E: EntityBase> Default for QueryState<E> {
    fn default() -> Self {
        Self {
            includes: Vec::new(),
            tracking: true,
            ordering: Vec::new(),
        }
    }
}

/// Repository for entity type `E`.
pub struct Repository<E: EntityBase> {
    context: Arc<DataContext>,
    state: Mutex<QueryState<E>>,
}

impl<E: EntityBase> Repository<E> {
    pub fn new(context: Arc<DataContext>) -> Self {
        Self {
            context,
            state: Mutex::new(QueryState::default()),
        }
    }

    /// Context this repository reads from and stages changes into.
    pub fn context(&self) -> &Arc<DataContext> {
        &self.context
    }

    fn state(&self) -> MutexGuard<'_, QueryState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: EntityBase> std::fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Repository")
            .field("entity", &E::entity_name())
            .field("includes", &state.includes.len())
            .field("tracking", &state.tracking)
            .field("sort_keys", &state.ordering.len())
            .finish()
    }
}
