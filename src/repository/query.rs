//! Query builder: eager-load, tracking and ordering directives plus the terminal reads.

use sea_orm::sea_query::{Condition, IntoCondition, SimpleExpr};
use sea_orm::{
    ColumnTrait, EntityTrait, IntoSimpleExpr, JoinType, Order, QueryFilter, QueryOrder, QuerySelect, Related,
    RelationDef, RelationTrait, Select,
};

use super::Repository;
use crate::entity::EntityBase;
use crate::error::{Error, Result};
use crate::paged::PagedResult;

impl<E: EntityBase> Repository<E> {
    /// Eager-load a navigation of `E`.
    ///
    /// The navigation is joined (LEFT JOIN) so predicates and sort keys may reference
    /// its columns. Rows stay unique per entity. Standing filters of the navigation's
    /// entity type apply to the joined rows.
    pub fn include(&self, relation: E::Relation) -> &Self {
        self.state().includes.push(relation);
        self
    }

    /// Subsequent reads do not attach their results to the change tracker.
    pub fn as_no_tracking(&self) -> &Self {
        self.state().tracking = false;
        self
    }

    /// Sort ascending by `column`, replacing any previous ordering.
    pub fn order_by<C: ColumnTrait>(&self, column: C) -> &Self {
        self.replace_ordering(column.into_simple_expr(), Order::Asc)
    }

    /// Sort descending by `column`, replacing any previous ordering.
    pub fn order_by_descending<C: ColumnTrait>(&self, column: C) -> &Self {
        self.replace_ordering(column.into_simple_expr(), Order::Desc)
    }

    /// Add an ascending secondary sort key.
    ///
    /// # Errors
    /// [`Error::InvalidState`] if no primary ordering was set with
    /// [`order_by`](Self::order_by) or [`order_by_descending`](Self::order_by_descending).
    pub fn then_by<C: ColumnTrait>(&self, column: C) -> Result<&Self> {
        self.append_ordering(column.into_simple_expr(), Order::Asc)
    }

    /// Add a descending secondary sort key.
    ///
    /// # Errors
    /// [`Error::InvalidState`] if no primary ordering was set.
    pub fn then_by_descending<C: ColumnTrait>(&self, column: C) -> Result<&Self> {
        self.append_ordering(column.into_simple_expr(), Order::Desc)
    }

    /// Clear every directive and turn tracking back on.
    pub fn reset(&self) -> &Self {
        let mut state = self.state();
        state.includes.clear();
        state.ordering.clear();
        state.tracking = true;
        self
    }

    fn replace_ordering(&self, expr: SimpleExpr, order: Order) -> &Self {
        let mut state = self.state();
        state.ordering.clear();
        state.ordering.push((expr, order));
        self
    }

    fn append_ordering(&self, expr: SimpleExpr, order: Order) -> Result<&Self> {
        let mut state = self.state();
        if state.ordering.is_empty() {
            return Err(Error::invalid_state(
                "then_by can only be applied to a sorted query. Use order_by first.",
            ));
        }
        state.ordering.push((expr, order));
        Ok(self)
    }

    /// Layer the accumulated directives on `base`. Returns the query and whether its
    /// results are tracked.
    fn prepare(&self, base: Select<E>) -> (Select<E>, bool) {
        self.prepare_with(base, true)
    }

    fn prepare_with(&self, base: Select<E>, joins: bool) -> (Select<E>, bool) {
        let state = self.state();
        let mut select = base;
        if joins && !state.includes.is_empty() {
            for relation in &state.includes {
                select = select.join(JoinType::LeftJoin, self.filtered(relation.def()));
            }
            select = select.distinct();
        }
        for (expr, order) in &state.ordering {
            select = select.order_by(expr.clone(), order.clone());
        }
        (select, state.tracking)
    }

    /// Add the standing filter of the relation's target type to the join condition, so
    /// filtered-out rows are never joined.
    fn filtered(&self, mut relation: RelationDef) -> RelationDef {
        let Some(filter) = self.context.model().query_filter_for_table(&relation.to_tbl).cloned() else {
            return relation;
        };
        let existing = relation.on_condition.take();
        relation.on_condition(move |from, to| match &existing {
            Some(existing) => Condition::all().add(existing(from, to)).add(filter.clone()),
            None => filter.clone(),
        })
    }

    async fn load(&self, select: Select<E>, tracking: bool) -> Result<Vec<E::Model>> {
        let models = self.context.fetch_all(select).await?;
        if tracking {
            self.context.attach::<E>(&models);
        }
        Ok(models)
    }

    async fn load_single(&self, select: Select<E>, tracking: bool) -> Result<Option<E::Model>> {
        let mut models = self.context.fetch_all(select.limit(2)).await?;
        if models.len() > 1 {
            return Err(Error::NotUnique {
                entity: E::entity_name(),
                matches: models.len(),
            });
        }
        let model = models.pop();
        if tracking {
            self.context.attach::<E>(model.as_slice());
        }
        Ok(model)
    }

    /// Entity with the given key, `None` if absent or filtered out.
    ///
    /// # Errors
    /// [`Error::NotUnique`] if more than one row matches.
    pub async fn get_by_id(&self, id: E::Key) -> Result<Option<E::Model>> {
        let (select, tracking) = self.prepare(self.context.set::<E>());
        self.load_single(select.filter(E::key_column().eq(id)), tracking)
            .await
    }

    /// Like [`get_by_id`](Self::get_by_id) but soft-deleted entities are visible.
    pub async fn get_by_id_ignoring_filters(&self, id: E::Key) -> Result<Option<E::Model>> {
        let (select, tracking) = self.prepare(self.context.set_ignoring_filters::<E>());
        self.load_single(select.filter(E::key_column().eq(id)), tracking)
            .await
    }

    pub async fn get_all(&self) -> Result<Vec<E::Model>> {
        let (select, tracking) = self.prepare(self.context.set::<E>());
        self.load(select, tracking).await
    }

    /// Entities paired with their related `R` row, loaded in the same query.
    ///
    /// Meant for many-to-one and one-to-one navigations. Ordering and tracking
    /// directives apply; the include joins are left out since the related join already
    /// covers them. A related row hidden by its own standing filter comes back as
    /// `None`.
    pub async fn get_all_with_related<R>(&self) -> Result<Vec<(E::Model, Option<R::Model>)>>
    where
        R: EntityTrait<Model: Sync>,
        E: Related<R>,
    {
        let (select, tracking) = self.prepare_with(self.context.set::<E>(), false);
        let relation = self.filtered(<E as Related<R>>::to());
        let rows = self
            .context
            .fetch_all_with_related(select.join(JoinType::LeftJoin, relation).select_also(R::default()))
            .await?;
        if tracking {
            for (model, _) in &rows {
                self.context.attach::<E>(std::slice::from_ref(model));
            }
        }
        Ok(rows)
    }

    /// Entities matching `predicate`.
    ///
    /// ```rust,ignore
    /// let admins = users.find(user::Column::RoleId.eq(admin.id)).await?;
    /// ```
    pub async fn find<F: IntoCondition>(&self, predicate: F) -> Result<Vec<E::Model>> {
        let (select, tracking) = self.prepare(self.context.set::<E>());
        self.load(select.filter(predicate), tracking).await
    }

    /// Like [`find`](Self::find) but soft-deleted entities are included.
    pub async fn find_with_deleted<F: IntoCondition>(&self, predicate: F) -> Result<Vec<E::Model>> {
        let (select, tracking) = self.prepare(self.context.set_ignoring_filters::<E>());
        self.load(select.filter(predicate), tracking).await
    }

    /// The single entity matching `predicate`, or `None`.
    ///
    /// # Errors
    /// [`Error::NotUnique`] if more than one entity matches.
    pub async fn find_single<F: IntoCondition>(&self, predicate: F) -> Result<Option<E::Model>> {
        let (select, tracking) = self.prepare(self.context.set::<E>());
        self.load_single(select.filter(predicate), tracking).await
    }

    /// Whether any entity matches `predicate`.
    pub async fn any<F: IntoCondition>(&self, predicate: F) -> Result<bool> {
        let (select, _) = self.prepare(self.context.set::<E>());
        let found = self.context.fetch_all(select.filter(predicate).limit(1)).await?;
        Ok(!found.is_empty())
    }

    /// Number of entities, optionally restricted by `predicate`.
    pub async fn count(&self, predicate: Option<Condition>) -> Result<u64> {
        let (mut select, _) = self.prepare(self.context.set::<E>());
        if let Some(predicate) = predicate {
            select = select.filter(predicate);
        }
        self.context.fetch_count(select).await
    }

    /// One page of the filtered, sorted view. Pages are 1-based; out-of-range pages are
    /// empty but still report the total count.
    pub async fn get_paged(&self, page_number: u64, page_size: u64) -> Result<PagedResult<E::Model>> {
        let (select, tracking) = self.prepare(self.context.set::<E>());
        let total_count = self.context.fetch_count(select.clone()).await?;
        let offset = page_number.saturating_sub(1).saturating_mul(page_size);
        let items = self
            .load(select.offset(offset).limit(page_size), tracking)
            .await?;
        Ok(PagedResult::new(items, total_count, page_number, page_size))
    }
}
