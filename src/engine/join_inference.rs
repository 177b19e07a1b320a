//! Guesses how two tables join, using nothing but column naming conventions.
//!
//! There is no foreign key metadata to look at, so this is a heuristic and not a constraint
//! solver. Strategies are tried in order and the first one that finds something wins:
//! 1. a column name both tables share (ignoring case);
//! 2. a well known key name both tables have (`id`, `key`, `<table>_id`, ...);
//! 3. `left.id` with `right.<left>_id`;
//! 4. `left.<right>_id` with `right.id`.
use crate::engine::catalog::{ColumnName, SchemaCatalog, TableName};
use crate::engine::model::ColumnRef;

/// The proposed `ON left = right` pair, both sides qualified.
pub type JoinColumns = (ColumnRef, ColumnRef);

/// Everything a join editor needs: the options for each side, and what to pre-select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCandidates {
    pub left_options: Vec<ColumnRef>,
    pub right_options: Vec<ColumnRef>,
    pub left: Option<ColumnRef>,
    pub right: Option<ColumnRef>,
    /// False when the pre-selection is just the first column of each table.
    pub inferred: bool,
}

const COMMON_KEYS: [&str; 5] = ["id", "ID", "Id", "_id", "key"];
const KEY_SUFFIXES: [&str; 3] = ["_id", "Id", "ID"];

pub fn suggest(left: &TableName, right: &TableName, catalog: &SchemaCatalog) -> Option<JoinColumns> {
    let left_columns = catalog.columns(left)?;
    let right_columns = catalog.columns(right)?;

    let found = shared_name(left_columns, right_columns)
        .or_else(|| common_key(left, right, left_columns, right_columns))
        .or_else(|| foreign_key(left, left_columns, right_columns))
        .or_else(|| {
            foreign_key(right, right_columns, left_columns)
                .map(|(right_id, left_fk)| (left_fk, right_id))
        });

    let (left_column, right_column) = found?;
    log::trace!("inferred join {left}.{left_column} = {right}.{right_column}");

    Some((
        ColumnRef::new(left.clone(), left_column.clone()),
        ColumnRef::new(right.clone(), right_column.clone()),
    ))
}

/// The inferred pair, or else the first column of each table.
pub fn columns_for(
    left: &TableName,
    right: &TableName,
    catalog: &SchemaCatalog,
) -> (Option<ColumnRef>, Option<ColumnRef>) {
    match suggest(left, right, catalog) {
        Some((left, right)) => (Some(left), Some(right)),
        None => (first_column(left, catalog), first_column(right, catalog)),
    }
}

pub fn candidates(left: &TableName, right: &TableName, catalog: &SchemaCatalog) -> JoinCandidates {
    let options = |table: &TableName| -> Vec<ColumnRef> {
        catalog
            .columns(table)
            .unwrap_or_default()
            .iter()
            .map(|column| ColumnRef::new(table.clone(), column.clone()))
            .collect()
    };

    let inferred = suggest(left, right, catalog);
    let (left_pick, right_pick) = match &inferred {
        Some((left, right)) => (Some(left.clone()), Some(right.clone())),
        None => (first_column(left, catalog), first_column(right, catalog)),
    };

    JoinCandidates {
        left_options: options(left),
        right_options: options(right),
        left: left_pick,
        right: right_pick,
        inferred: inferred.is_some(),
    }
}

fn shared_name<'a>(
    left_columns: &'a [ColumnName],
    right_columns: &'a [ColumnName],
) -> Option<(&'a ColumnName, &'a ColumnName)> {
    // O(n^2), but tables don't have that many columns.
    left_columns.iter().find_map(|left_column| {
        right_columns
            .iter()
            .find(|right_column| same_name(left_column, right_column.as_str()))
            .map(|right_column| (left_column, right_column))
    })
}

fn common_key<'a>(
    left: &TableName,
    right: &TableName,
    left_columns: &'a [ColumnName],
    right_columns: &'a [ColumnName],
) -> Option<(&'a ColumnName, &'a ColumnName)> {
    let table_keys = [right, left]
        .into_iter()
        .flat_map(|table| KEY_SUFFIXES.iter().map(move |suffix| format!("{table}{suffix}")));
    let mut keys = COMMON_KEYS.iter().map(|key| key.to_string()).chain(table_keys);

    keys.find_map(|key| {
        let left_column = find_column(left_columns, &key)?;
        let right_column = find_column(right_columns, &key)?;

        Some((left_column, right_column))
    })
}

/// Finds `table.id` on one side and `<table>_id` (or `<table>Id`, ...) on the other.
///
/// Returns the id column of `table`, then the referencing column of the other table.
fn foreign_key<'a>(
    table: &TableName,
    table_columns: &'a [ColumnName],
    referencing_columns: &'a [ColumnName],
) -> Option<(&'a ColumnName, &'a ColumnName)> {
    let id = find_column(table_columns, "id")?;
    let reference = KEY_SUFFIXES
        .iter()
        .find_map(|suffix| find_column(referencing_columns, &format!("{table}{suffix}")))?;

    Some((id, reference))
}

fn find_column<'a>(columns: &'a [ColumnName], name: &str) -> Option<&'a ColumnName> {
    columns.iter().find(|column| same_name(column, name))
}

fn same_name(column: &ColumnName, name: &str) -> bool {
    column.as_str().eq_ignore_ascii_case(name)
}

fn first_column(table: &TableName, catalog: &SchemaCatalog) -> Option<ColumnRef> {
    catalog
        .columns(table)
        .and_then(|columns| columns.first())
        .map(|column| ColumnRef::new(table.clone(), column.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(catalog: &SchemaCatalog, left: &str, right: &str) -> Option<(String, String)> {
        suggest(&left.into(), &right.into(), catalog)
            .map(|(left, right)| (left.to_string(), right.to_string()))
    }

    fn pair(left: &str, right: &str) -> Option<(String, String)> {
        Some((left.to_string(), right.to_string()))
    }

    #[test]
    fn shared_names_win_over_foreign_keys() {
        let catalog = SchemaCatalog::from_iter([
            ("orders", vec!["id", "customer_id"]),
            ("customers", vec!["id", "name"]),
        ]);

        assert_eq!(
            suggestion(&catalog, "orders", "customers"),
            pair("orders.id", "customers.id")
        );
    }

    #[test]
    fn shared_names_ignore_case_and_keep_the_original_spelling() {
        let catalog = SchemaCatalog::from_iter([
            ("people", vec!["name", "Email"]),
            ("contacts", vec!["EMAIL", "phone"]),
        ]);

        assert_eq!(
            suggestion(&catalog, "people", "contacts"),
            pair("people.Email", "contacts.EMAIL")
        );
    }

    #[test]
    fn foreign_key_from_left_to_right() {
        let catalog = SchemaCatalog::from_iter([
            ("customer", vec!["id", "name"]),
            ("orders", vec!["number", "customer_id"]),
        ]);

        assert_eq!(
            suggestion(&catalog, "customer", "orders"),
            pair("customer.id", "orders.customer_id")
        );
    }

    #[test]
    fn foreign_key_from_right_to_left() {
        let catalog = SchemaCatalog::from_iter([
            ("orders", vec!["number", "customerId"]),
            ("customer", vec!["ID", "name"]),
        ]);

        assert_eq!(
            suggestion(&catalog, "orders", "customer"),
            pair("orders.customerId", "customer.ID")
        );
    }

    #[test]
    fn nothing_in_common() {
        let catalog = SchemaCatalog::from_iter([
            ("orders", vec!["number", "total"]),
            ("regions", vec!["code", "label"]),
        ]);

        assert_eq!(suggestion(&catalog, "orders", "regions"), None);

        let (left, right) = columns_for(&"orders".into(), &"regions".into(), &catalog);
        assert_eq!(left, Some("orders.number".into()));
        assert_eq!(right, Some("regions.code".into()));
    }

    #[test]
    fn unknown_or_empty_tables() {
        let catalog = SchemaCatalog::from_iter([("orders", vec!["id"]), ("empty", vec![])]);

        assert_eq!(suggestion(&catalog, "orders", "ghosts"), None);
        assert_eq!(suggestion(&catalog, "orders", "empty"), None);
        assert_eq!(
            columns_for(&"orders".into(), &"empty".into(), &catalog),
            (Some("orders.id".into()), None)
        );
    }

    #[test]
    fn candidates_list_both_sides() {
        let catalog = SchemaCatalog::from_iter([
            ("orders", vec!["id", "customer_id"]),
            ("customers", vec!["id", "name"]),
        ]);

        let candidates = candidates(&"orders".into(), &"customers".into(), &catalog);

        assert_eq!(candidates.left_options.len(), 2);
        assert_eq!(candidates.right_options[1], ColumnRef::new("customers", "name"));
        assert_eq!(candidates.left, Some("orders.id".into()));
        assert!(candidates.inferred);
    }
}
