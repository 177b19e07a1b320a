//! The join chain is a linked list in disguise: every join starts from the table the previous
//! join ended on.
//!
//! ```text
//! orders ──INNER──▶ customers ──LEFT──▶ addresses ──CROSS──▶ regions
//! ^ root            ^ right of join 0   ^ right of join 1    ^ right of join 2
//!                     left of join 1      left of join 2
//! ```
//!
//! All mutations go through [JoinChain] so the chain can never reuse a table or lose a link.
use crate::engine::catalog::TableName;
use crate::engine::model::ColumnRef;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JoinType {
    #[default]
    #[serde(rename = "INNER")]
    Inner,
    #[serde(rename = "LEFT")]
    Left,
    #[serde(rename = "RIGHT")]
    Right,
    #[serde(rename = "FULL_OUTER")]
    FullOuter,
    #[serde(rename = "CROSS")]
    Cross,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub left_table: TableName,
    pub right_table: TableName,
    #[serde(default)]
    pub join_type: JoinType,
    /// Not used for CROSS joins.
    #[serde(default)]
    pub left_column: Option<ColumnRef>,
    #[serde(default)]
    pub right_column: Option<ColumnRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<JoinSpec>", into = "Vec<JoinSpec>")]
pub struct JoinChain {
    joins: Vec<JoinSpec>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JoinChainError {
    #[error("Table '{0}' is already part of the join chain")]
    TableReused(TableName),
    #[error("Join must start from '{expected}', the table the previous join ends on, not '{found}'")]
    BrokenChain {
        expected: TableName,
        found: TableName,
    },
    #[error("Table '{0}' is not one of the selected tables")]
    TableNotSelected(TableName),
    #[error("There is no join number {0}")]
    NoSuchJoin(usize),
}

impl JoinSpec {
    pub fn new(left_table: TableName, right_table: TableName, join_type: JoinType) -> Self {
        JoinSpec {
            left_table,
            right_table,
            join_type,
            left_column: None,
            right_column: None,
        }
    }

    pub fn needs_condition(&self) -> bool {
        self.join_type != JoinType::Cross
    }
}

impl JoinChain {
    pub fn new() -> Self {
        JoinChain::default()
    }

    /// The table the FROM clause starts with.
    pub fn root(&self) -> Option<&TableName> {
        self.joins.first().map(|join| &join.left_table)
    }

    /// The table the next join has to start from, if there already are joins.
    pub fn tail(&self) -> Option<&TableName> {
        self.joins.last().map(|join| &join.right_table)
    }

    /// Every table in the chain: the root followed by each right table.
    pub fn tables(&self) -> impl Iterator<Item = &TableName> {
        self.root()
            .into_iter()
            .chain(self.joins.iter().map(|join| &join.right_table))
    }

    pub fn contains(&self, table: &TableName) -> bool {
        self.tables().any(|known| known == table)
    }

    pub fn push(&mut self, join: JoinSpec) -> Result<usize, JoinChainError> {
        if let Some(tail) = self.tail() {
            if tail != &join.left_table {
                return Err(JoinChainError::BrokenChain {
                    expected: tail.clone(),
                    found: join.left_table,
                });
            }
        }

        if join.left_table == join.right_table || self.contains(&join.right_table) {
            return Err(JoinChainError::TableReused(join.right_table));
        }

        self.joins.push(join);

        Ok(self.joins.len() - 1)
    }

    /// Changes the root table. Only the first join has a free left table.
    pub fn set_root(&mut self, table: TableName) -> Result<(), JoinChainError> {
        if self.joins.iter().any(|join| join.right_table == table) {
            return Err(JoinChainError::TableReused(table));
        }

        let first = self.joins.first_mut().ok_or(JoinChainError::NoSuchJoin(0))?;
        first.left_table = table;

        Ok(())
    }

    /// Changes the right table of a join, which also moves the start of the join after it.
    pub fn set_right_table(&mut self, index: usize, table: TableName) -> Result<(), JoinChainError> {
        if index >= self.joins.len() {
            return Err(JoinChainError::NoSuchJoin(index));
        }

        let reused = self
            .tables()
            .enumerate()
            // position 0 is the root, position i + 1 is the right table of join i
            .any(|(position, known)| position != index + 1 && known == &table);
        if reused {
            return Err(JoinChainError::TableReused(table));
        }

        self.joins[index].right_table = table.clone();
        if let Some(next) = self.joins.get_mut(index + 1) {
            next.left_table = table;
        }

        Ok(())
    }

    /// Removes a join and every join after it, since those would have lost their starting table.
    pub fn truncate_from(&mut self, index: usize) -> Result<(), JoinChainError> {
        if index >= self.joins.len() {
            return Err(JoinChainError::NoSuchJoin(index));
        }

        self.truncate(index);

        Ok(())
    }

    /// Keeps the first `len` joins. The rest of the chain still starts where it did.
    pub fn truncate(&mut self, len: usize) {
        self.joins.truncate(len);
    }

    pub fn get(&self, index: usize) -> Option<&JoinSpec> {
        self.joins.get(index)
    }

    /// Gives access to the parts of a join that can't break the chain.
    pub fn get_mut(&mut self, index: usize) -> Result<JoinSlot<'_>, JoinChainError> {
        self.joins
            .get_mut(index)
            .map(|join| JoinSlot { join })
            .ok_or(JoinChainError::NoSuchJoin(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JoinSpec> {
        self.joins.iter()
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn clear(&mut self) {
        self.joins.clear();
    }
}

/// Mutable view of a single join. The tables are read-only here.
pub struct JoinSlot<'a> {
    join: &'a mut JoinSpec,
}

impl JoinSlot<'_> {
    pub fn spec(&self) -> &JoinSpec {
        &*self.join
    }

    pub fn set_join_type(&mut self, join_type: JoinType) {
        self.join.join_type = join_type;
    }

    pub fn set_columns(&mut self, left: Option<ColumnRef>, right: Option<ColumnRef>) {
        self.join.left_column = left;
        self.join.right_column = right;
    }
}

impl TryFrom<Vec<JoinSpec>> for JoinChain {
    type Error = JoinChainError;

    fn try_from(joins: Vec<JoinSpec>) -> Result<Self, Self::Error> {
        let mut chain = JoinChain::new();

        for join in joins {
            chain.push(join)?;
        }

        Ok(chain)
    }
}

impl From<JoinChain> for Vec<JoinSpec> {
    fn from(chain: JoinChain) -> Self {
        chain.joins
    }
}

impl<'a> IntoIterator for &'a JoinChain {
    type Item = &'a JoinSpec;
    type IntoIter = std::slice::Iter<'a, JoinSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for JoinType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let keyword = match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::FullOuter => "FULL OUTER JOIN",
            JoinType::Cross => "CROSS JOIN",
        };

        write!(f, "{keyword}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(left: &str, right: &str) -> JoinSpec {
        JoinSpec::new(left.into(), right.into(), JoinType::Inner)
    }

    fn chain(links: &[(&str, &str)]) -> JoinChain {
        let mut chain = JoinChain::new();
        for (left, right) in links {
            chain.push(join(left, right)).unwrap();
        }
        chain
    }

    #[test]
    fn pushes_linked_joins() {
        let chain = chain(&[("orders", "customers"), ("customers", "addresses")]);

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.root().unwrap(), &"orders");
        assert_eq!(chain.tail().unwrap(), &"addresses");
        let tables: Vec<_> = chain.tables().map(TableName::as_str).collect();
        assert_eq!(tables, vec!["orders", "customers", "addresses"]);
    }

    #[test]
    fn rejects_broken_links() {
        let mut chain = chain(&[("orders", "customers")]);

        let error = chain.push(join("orders", "addresses")).unwrap_err();

        assert_eq!(
            error,
            JoinChainError::BrokenChain {
                expected: "customers".into(),
                found: "orders".into(),
            }
        );
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn rejects_reused_tables() {
        let mut chain = chain(&[("orders", "customers")]);

        assert_eq!(
            chain.push(join("customers", "orders")),
            Err(JoinChainError::TableReused("orders".into()))
        );
        assert_eq!(
            chain.push(join("customers", "customers")),
            Err(JoinChainError::TableReused("customers".into()))
        );
        assert_eq!(
            JoinChain::new().push(join("a", "a")),
            Err(JoinChainError::TableReused("a".into()))
        );
    }

    #[test]
    fn changing_a_right_table_moves_the_next_left_table() {
        let mut chain = chain(&[("orders", "customers"), ("customers", "addresses")]);

        chain.set_right_table(0, "invoices".into()).unwrap();

        assert_eq!(chain.get(0).unwrap().right_table, "invoices");
        assert_eq!(chain.get(1).unwrap().left_table, "invoices");
    }

    #[test]
    fn changing_a_right_table_keeps_tables_unique() {
        let mut chain = chain(&[("orders", "customers"), ("customers", "addresses")]);

        assert_eq!(
            chain.set_right_table(0, "addresses".into()),
            Err(JoinChainError::TableReused("addresses".into()))
        );
        assert_eq!(
            chain.set_right_table(1, "orders".into()),
            Err(JoinChainError::TableReused("orders".into()))
        );
        // setting a join to the table it already has is fine
        assert_eq!(chain.set_right_table(1, "addresses".into()), Ok(()));
        assert_eq!(
            chain.set_right_table(2, "x".into()),
            Err(JoinChainError::NoSuchJoin(2))
        );
    }

    #[test]
    fn root_can_change_unless_it_is_joined_later() {
        let mut chain = chain(&[("orders", "customers")]);

        chain.set_root("invoices".into()).unwrap();
        assert_eq!(chain.root().unwrap(), &"invoices");

        assert_eq!(
            chain.set_root("customers".into()),
            Err(JoinChainError::TableReused("customers".into()))
        );
    }

    #[test]
    fn truncating_drops_dependent_joins() {
        let mut chain = chain(&[("a", "b"), ("b", "c"), ("c", "d")]);

        chain.truncate_from(1).unwrap();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.tail().unwrap(), &"b");
        assert!(chain.truncate_from(1).is_err());

        chain.truncate(5);
        assert_eq!(chain.len(), 1);
        chain.truncate(0);
        assert!(chain.is_empty());
    }

    #[test]
    fn deserialization_validates_the_chain() {
        let valid = r#"[
            {"left_table": "a", "right_table": "b", "join_type": "LEFT"},
            {"left_table": "b", "right_table": "c", "join_type": "CROSS"}
        ]"#;
        let chain: JoinChain = serde_json::from_str(valid).unwrap();
        assert_eq!(chain.get(1).unwrap().join_type, JoinType::Cross);

        let broken = r#"[
            {"left_table": "a", "right_table": "b"},
            {"left_table": "a", "right_table": "c"}
        ]"#;
        assert!(serde_json::from_str::<JoinChain>(broken).is_err());
    }
}
