//! Structures used to represent the structure of the database: which tables exist and which
//! columns they have, in the order the database reports them.
//!
//! The catalog is read-only for the rest of the engine. It gets built by whatever knows how to
//! talk to the database (a [CatalogProvider]) and is then only ever looked at.
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The external source of table/column metadata, usually the database introspection layer.
pub trait CatalogProvider {
    fn list_tables(&self) -> Result<Vec<TableName>, crate::Error>;

    /// Columns must be returned in introspection order, it's the order we render them in.
    fn list_columns(&self, table: &TableName) -> Result<Vec<ColumnName>, crate::Error>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: TableName,
    pub columns: Vec<ColumnName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default, Ord, PartialOrd, Hash)]
pub struct ColumnName(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Ord, PartialOrd, Hash)]
pub struct TableName(pub String);

impl SchemaCatalog {
    pub fn new(tables: Vec<Table>) -> Self {
        SchemaCatalog { tables }
    }

    /// Asks the provider for every table, then for the columns of each of them.
    pub fn load(provider: &dyn CatalogProvider) -> Result<Self, crate::Error> {
        let tables = provider
            .list_tables()?
            .into_iter()
            .map(|name| {
                let columns = provider.list_columns(&name)?;

                Ok(Table { name, columns })
            })
            .collect::<Result<Vec<_>, crate::Error>>()?;

        log::debug!("loaded catalog with {} tables", tables.len());

        Ok(SchemaCatalog { tables })
    }

    pub fn tables(&self) -> &[Table] {
        self.tables.as_slice()
    }

    pub fn table(&self, name: &TableName) -> Option<&Table> {
        // Tables are few enough for a linear scan, and it keeps the introspection order.
        self.tables.iter().find(|table| &table.name == name)
    }

    pub fn columns(&self, table: &TableName) -> Option<&[ColumnName]> {
        self.table(table).map(|table| table.columns.as_slice())
    }

    pub fn contains_table(&self, table: &TableName) -> bool {
        self.table(table).is_some()
    }

    pub fn contains_column(&self, table: &TableName, column: &ColumnName) -> bool {
        self.table(table)
            .map(|table| table.columns.contains(column))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// A snapshot is also a provider, which makes "reconnecting" to cached data trivial.
impl CatalogProvider for SchemaCatalog {
    fn list_tables(&self) -> Result<Vec<TableName>, crate::Error> {
        Ok(self.tables.iter().map(|table| table.name.clone()).collect())
    }

    fn list_columns(&self, table: &TableName) -> Result<Vec<ColumnName>, crate::Error> {
        Ok(self.columns(table).map(<[_]>::to_vec).unwrap_or_default())
    }
}

impl<T, C, I> FromIterator<(T, I)> for SchemaCatalog
where
    T: Into<TableName>,
    C: Into<ColumnName>,
    I: IntoIterator<Item = C>,
{
    fn from_iter<It: IntoIterator<Item = (T, I)>>(iter: It) -> Self {
        let tables = iter
            .into_iter()
            .map(|(name, columns)| Table {
                name: name.into(),
                columns: columns.into_iter().map(Into::into).collect(),
            })
            .collect();

        SchemaCatalog { tables }
    }
}

impl TableName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ColumnName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for ColumnName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<&str> for TableName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ColumnName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<String>> From<T> for ColumnName {
    fn from(name: T) -> ColumnName {
        ColumnName(name.into())
    }
}

impl<T: Into<String>> From<T> for TableName {
    fn from(name: T) -> TableName {
        TableName(name.into())
    }
}

impl AsRef<str> for ColumnName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
