//! The in-memory query the user is assembling.
//!
//! Choices depend on each other: tables decide which columns can be picked, selected tables decide
//! what can be joined, and so on. The model keeps those choices consistent with each other and
//! with the [SchemaCatalog].
use crate::engine::catalog::{ColumnName, SchemaCatalog, TableName};
use crate::engine::join_inference;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

pub use clauses::{
    AggregateFunction, AggregateSpec, CombinedColumnSpec, Connector, FilterOperator,
    FilterPredicate, GroupBySpec, OrderBySpec, OrderDirection,
};
pub use join_chain::{JoinChain, JoinChainError, JoinSlot, JoinSpec, JoinType};

mod clauses;
mod join_chain;

/// A column, usually qualified by its table: `orders.total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ColumnRef {
    pub table: Option<TableName>,
    pub column: ColumnName,
}

/// Which columns of each selected table end up in the SELECT list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSelection(HashMap<TableName, HashMap<ColumnName, bool>>);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryModel {
    #[serde(default)]
    tables: Vec<TableName>,
    #[serde(default)]
    columns: ColumnSelection,
    #[serde(default)]
    joins: JoinChain,
    #[serde(default)]
    pub filters: Vec<FilterPredicate>,
    #[serde(default)]
    pub group_by: Vec<GroupBySpec>,
    #[serde(default)]
    pub order_by: Vec<OrderBySpec>,
    #[serde(default)]
    pub aggregates: Vec<AggregateSpec>,
    #[serde(default)]
    pub combined_columns: Vec<CombinedColumnSpec>,
}

/// The model references something the current schema doesn't have, usually because the user
/// reconnected to a different database.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaInconsistencyError {
    #[error("Table '{0}' does not exist")]
    UnknownTable(TableName),
    #[error("Column '{0}' does not exist")]
    UnknownColumn(ColumnRef),
    #[error("Table '{0}' is not one of the selected tables")]
    TableNotSelected(TableName),
}

type Consistency = Result<(), SchemaInconsistencyError>;

impl QueryModel {
    pub fn new() -> Self {
        QueryModel::default()
    }

    pub fn tables(&self) -> &[TableName] {
        self.tables.as_slice()
    }

    pub fn column_selection(&self) -> &ColumnSelection {
        &self.columns
    }

    pub fn joins(&self) -> &JoinChain {
        &self.joins
    }

    /// Replaces the table selection.
    ///
    /// Newly selected tables start with all of their columns selected, tables that stay selected
    /// keep their column choices. The join chain is always cleared, and every clause that points
    /// to a table that is no longer selected is dropped.
    pub fn select_tables<I, T>(&mut self, tables: I, catalog: &SchemaCatalog) -> Consistency
    where
        I: IntoIterator<Item = T>,
        T: Into<TableName>,
    {
        let mut selected: Vec<TableName> = Vec::new();
        for table in tables.into_iter().map(Into::into) {
            if !catalog.contains_table(&table) {
                return Err(SchemaInconsistencyError::UnknownTable(table));
            }
            if !selected.contains(&table) {
                selected.push(table);
            }
        }

        let mut columns = ColumnSelection::default();
        for table in &selected {
            let choices = self
                .columns
                .0
                .remove(table)
                .unwrap_or_else(|| ColumnSelection::everything_in(table, catalog));
            columns.0.insert(table.clone(), choices);
        }

        log::debug!("selected tables {selected:?}, join chain cleared");

        self.tables = selected;
        self.columns = columns;
        self.joins.clear();
        self.reconcile(catalog);

        Ok(())
    }

    pub fn set_column_selected(
        &mut self,
        table: &TableName,
        column: &ColumnName,
        selected: bool,
        catalog: &SchemaCatalog,
    ) -> Consistency {
        self.require_selected(table)?;
        if !catalog.contains_column(table, column) {
            return Err(SchemaInconsistencyError::UnknownColumn(ColumnRef::new(
                table.clone(),
                column.clone(),
            )));
        }

        self.columns.set(table, column, selected);

        Ok(())
    }

    pub fn set_all_columns_selected(
        &mut self,
        table: &TableName,
        selected: bool,
        catalog: &SchemaCatalog,
    ) -> Consistency {
        self.set_matching_columns_selected(table, "", selected, catalog)
            .map(|_| ())
    }

    /// Selects or deselects the columns whose name contains `search`, ignoring case. Returns how
    /// many columns matched.
    pub fn set_matching_columns_selected(
        &mut self,
        table: &TableName,
        search: &str,
        selected: bool,
        catalog: &SchemaCatalog,
    ) -> Result<usize, SchemaInconsistencyError> {
        self.require_selected(table)?;
        let columns = catalog
            .columns(table)
            .ok_or_else(|| SchemaInconsistencyError::UnknownTable(table.clone()))?;

        let search = search.trim().to_lowercase();
        let mut matched = 0;
        for column in columns {
            if column.as_str().to_lowercase().contains(&search) {
                self.columns.set(table, column, selected);
                matched += 1;
            }
        }

        Ok(matched)
    }

    pub fn is_selected(&self, column: &ColumnRef) -> bool {
        match &column.table {
            Some(table) => self.columns.is_selected(table, &column.column),
            None => self
                .tables
                .iter()
                .any(|table| self.columns.is_selected(table, &column.column)),
        }
    }

    /// Every column of every selected table, the list clause pickers offer.
    pub fn available_columns(&self, catalog: &SchemaCatalog) -> Vec<ColumnRef> {
        self.tables
            .iter()
            .flat_map(|table| {
                catalog
                    .columns(table)
                    .unwrap_or_default()
                    .iter()
                    .map(move |column| ColumnRef::new(table.clone(), column.clone()))
            })
            .collect()
    }

    /// Adds an aggregate with a suggested alias. Check [QueryModel::is_selected] afterwards to see
    /// if the aggregated column is also still selected on its own.
    pub fn add_aggregate(
        &mut self,
        function: AggregateFunction,
        column: ColumnRef,
    ) -> &mut AggregateSpec {
        self.aggregates.push(AggregateSpec::new(function, column));

        let last = self.aggregates.len() - 1;
        &mut self.aggregates[last]
    }

    /// Appends a join and proposes its ON columns.
    ///
    /// Without `left_table`, the join starts where the chain ends, or at the first selected table
    /// for the first join.
    pub fn add_join(
        &mut self,
        left_table: Option<TableName>,
        right_table: TableName,
        join_type: JoinType,
        catalog: &SchemaCatalog,
    ) -> Result<usize, JoinChainError> {
        let left_table = left_table
            .or_else(|| self.joins.tail().cloned())
            .or_else(|| self.tables.first().cloned())
            .ok_or_else(|| JoinChainError::TableNotSelected(right_table.clone()))?;
        self.require_joinable(&left_table)?;
        self.require_joinable(&right_table)?;

        let mut join = JoinSpec::new(left_table, right_table, join_type);
        let (left, right) = join_inference::columns_for(&join.left_table, &join.right_table, catalog);
        join.left_column = left;
        join.right_column = right;

        self.joins.push(join)
    }

    pub fn set_join_root(
        &mut self,
        table: TableName,
        catalog: &SchemaCatalog,
    ) -> Result<(), JoinChainError> {
        self.require_joinable(&table)?;
        self.joins.set_root(table)?;
        self.infer_join_columns(0, catalog);

        Ok(())
    }

    /// Changing a right table changes the next join's left table too, so both get new columns.
    pub fn set_join_right_table(
        &mut self,
        index: usize,
        table: TableName,
        catalog: &SchemaCatalog,
    ) -> Result<(), JoinChainError> {
        self.require_joinable(&table)?;
        self.joins.set_right_table(index, table)?;
        self.infer_join_columns(index, catalog);
        self.infer_join_columns(index + 1, catalog);

        Ok(())
    }

    pub fn join_mut(&mut self, index: usize) -> Result<JoinSlot<'_>, JoinChainError> {
        self.joins.get_mut(index)
    }

    /// Removes the join and the ones depending on it.
    pub fn remove_join(&mut self, index: usize) -> Result<(), JoinChainError> {
        self.joins.truncate_from(index)
    }

    /// Returns the first reference to something the catalog or table selection doesn't have.
    pub fn check(&self, catalog: &SchemaCatalog) -> Consistency {
        for table in &self.tables {
            if !catalog.contains_table(table) {
                return Err(SchemaInconsistencyError::UnknownTable(table.clone()));
            }
        }

        for join in &self.joins {
            self.check_join(join, catalog)?;
        }

        self.clause_columns()
            .try_for_each(|column| self.check_column(column, catalog))
    }

    /// Drops everything that no longer matches the catalog and reports what was dropped.
    ///
    /// Broken joins take the rest of the chain with them. Joins whose tables survived but whose
    /// columns didn't get new columns proposed instead.
    pub fn reconcile(&mut self, catalog: &SchemaCatalog) -> Vec<SchemaInconsistencyError> {
        let mut dropped = Vec::new();

        self.tables.retain(|table| {
            let known = catalog.contains_table(table);
            if !known {
                dropped.push(SchemaInconsistencyError::UnknownTable(table.clone()));
            }
            known
        });

        let tables = &self.tables;
        self.columns.0.retain(|table, _| tables.contains(table));
        // tables without any recorded choices start out fully selected
        for table in tables {
            if !self.columns.0.contains_key(table) {
                let choices = ColumnSelection::everything_in(table, catalog);
                self.columns.0.insert(table.clone(), choices);
            }
        }
        for (table, choices) in self.columns.0.iter_mut() {
            choices.retain(|column, _| {
                let known = catalog.contains_column(table, column);
                if !known {
                    dropped.push(SchemaInconsistencyError::UnknownColumn(ColumnRef::new(
                        table.clone(),
                        column.clone(),
                    )));
                }
                known
            });
        }

        self.reconcile_joins(catalog, &mut dropped);

        let mut keep = |column: &ColumnRef, model: &QueryModel| {
            match model.check_column(column, catalog) {
                Ok(()) => true,
                Err(error) => {
                    dropped.push(error);
                    false
                }
            }
        };

        let snapshot = self.clone();
        self.filters.retain(|filter| keep(&filter.column, &snapshot));
        self.group_by.retain(|group| keep(&group.column, &snapshot));
        self.order_by.retain(|order| keep(&order.column, &snapshot));
        self.aggregates
            .retain(|aggregate| keep(&aggregate.column, &snapshot));
        for combined in self.combined_columns.iter_mut() {
            combined.retain_sources(|source| keep(source, &snapshot));
        }

        if !dropped.is_empty() {
            log::debug!("reconciled query model, dropped: {dropped:?}");
        }

        dropped
    }

    fn reconcile_joins(
        &mut self,
        catalog: &SchemaCatalog,
        dropped: &mut Vec<SchemaInconsistencyError>,
    ) {
        let broken_table = self.joins.iter().position(|join| {
            [&join.left_table, &join.right_table]
                .into_iter()
                .any(|table| self.check_table(table, catalog).is_err())
        });

        if let Some(index) = broken_table {
            if let Some(join) = self.joins.get(index) {
                for table in [&join.left_table, &join.right_table] {
                    if let Err(error) = self.check_table(table, catalog) {
                        dropped.push(error);
                    }
                }
            }
            self.joins.truncate(index);
        }

        for index in 0..self.joins.len() {
            let stale_columns = self
                .joins
                .get(index)
                .map(|join| self.check_join(join, catalog))
                .unwrap_or(Ok(()));

            if let Err(error) = stale_columns {
                dropped.push(error);
                self.infer_join_columns(index, catalog);
            }
        }
    }

    fn infer_join_columns(&mut self, index: usize, catalog: &SchemaCatalog) {
        let Some(join) = self.joins.get(index) else {
            return;
        };

        let (left, right) = join_inference::columns_for(&join.left_table, &join.right_table, catalog);
        if let Ok(mut slot) = self.joins.get_mut(index) {
            slot.set_columns(left, right);
        }
    }

    fn clause_columns(&self) -> impl Iterator<Item = &ColumnRef> {
        self.filters
            .iter()
            .map(|filter| &filter.column)
            .chain(self.group_by.iter().map(|group| &group.column))
            .chain(self.order_by.iter().map(|order| &order.column))
            .chain(self.aggregates.iter().map(|aggregate| &aggregate.column))
            .chain(self.combined_columns.iter().flat_map(|c| c.sources()))
    }

    fn check_join(&self, join: &JoinSpec, catalog: &SchemaCatalog) -> Consistency {
        self.check_table(&join.left_table, catalog)?;
        self.check_table(&join.right_table, catalog)?;

        if !join.needs_condition() {
            return Ok(());
        }

        for column in [&join.left_column, &join.right_column].into_iter().flatten() {
            self.check_column(column, catalog)?;
        }

        Ok(())
    }

    fn check_table(&self, table: &TableName, catalog: &SchemaCatalog) -> Consistency {
        if !catalog.contains_table(table) {
            return Err(SchemaInconsistencyError::UnknownTable(table.clone()));
        }

        self.require_selected(table)
    }

    /// Blank columns are incomplete clauses, not inconsistent ones.
    fn check_column(&self, column: &ColumnRef, catalog: &SchemaCatalog) -> Consistency {
        if column.is_blank() {
            return Ok(());
        }

        let known = match &column.table {
            Some(table) => {
                self.check_table(table, catalog)?;
                catalog.contains_column(table, &column.column)
            }
            None => self
                .tables
                .iter()
                .any(|table| catalog.contains_column(table, &column.column)),
        };

        if known {
            Ok(())
        } else {
            Err(SchemaInconsistencyError::UnknownColumn(column.clone()))
        }
    }

    fn require_selected(&self, table: &TableName) -> Consistency {
        if self.tables.contains(table) {
            Ok(())
        } else {
            Err(SchemaInconsistencyError::TableNotSelected(table.clone()))
        }
    }

    fn require_joinable(&self, table: &TableName) -> Result<(), JoinChainError> {
        self.require_selected(table)
            .map_err(|_| JoinChainError::TableNotSelected(table.clone()))
    }
}

impl ColumnSelection {
    fn everything_in(table: &TableName, catalog: &SchemaCatalog) -> HashMap<ColumnName, bool> {
        catalog
            .columns(table)
            .unwrap_or_default()
            .iter()
            .map(|column| (column.clone(), true))
            .collect()
    }

    pub fn is_selected(&self, table: &TableName, column: &ColumnName) -> bool {
        self.0
            .get(table)
            .and_then(|columns| columns.get(column))
            .copied()
            .unwrap_or(false)
    }

    fn set(&mut self, table: &TableName, column: &ColumnName, selected: bool) {
        self.0
            .entry(table.clone())
            .or_default()
            .insert(column.clone(), selected);
    }
}

impl ColumnRef {
    pub fn new<T: Into<TableName>, C: Into<ColumnName>>(table: T, column: C) -> Self {
        ColumnRef {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    pub fn unqualified<C: Into<ColumnName>>(column: C) -> Self {
        ColumnRef {
            table: None,
            column: column.into(),
        }
    }

    /// A clause whose column hasn't been picked yet.
    pub fn is_blank(&self) -> bool {
        self.column.as_str().trim().is_empty()
    }
}

/// `orders.total` is qualified, `total` is not. Column names can contain dots, table names can't.
impl FromStr for ColumnRef {
    type Err = Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();

        Ok(match text.split_once('.') {
            Some((table, column)) => ColumnRef::new(table, column),
            None => ColumnRef::unqualified(text),
        })
    }
}

impl From<String> for ColumnRef {
    fn from(text: String) -> Self {
        match text.parse() {
            Ok(column) => column,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(text: &str) -> Self {
        text.to_string().into()
    }
}

impl From<ColumnRef> for String {
    fn from(column: ColumnRef) -> Self {
        column.to_string()
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{}.", table)?;
        }

        write!(f, "{}", self.column)
    }
}
