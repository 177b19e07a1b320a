use colored::Colorize;
use sql_fetcher::cache;
use sql_fetcher::context::{CatalogSnapshot, Context};
use sql_fetcher::engine::assistant::describe_schema;
use sql_fetcher::engine::{CatalogProvider, ColumnName, SchemaCatalog, Table, TableName};
use std::fs;
use std::path::PathBuf;

/// A schema dump, standing in for asking the database itself.
struct SchemaFile {
    tables: Vec<Table>,
}

impl CatalogProvider for SchemaFile {
    fn list_tables(&self) -> Result<Vec<TableName>, sql_fetcher::Error> {
        Ok(self
            .tables
            .iter()
            .map(|table| table.name.clone())
            .filter(|name| !name.as_str().trim().is_empty())
            .collect())
    }

    fn list_columns(&self, table: &TableName) -> Result<Vec<ColumnName>, sql_fetcher::Error> {
        Ok(self
            .tables
            .iter()
            .filter(|known| &known.name == table)
            .flat_map(|known| known.columns.iter().cloned())
            .filter(|column| !column.as_str().trim().is_empty())
            .collect())
    }
}

pub fn import(file: PathBuf) -> Result<(), sql_fetcher::Error> {
    let context = Context::current()?;
    let tables: Vec<Table> = serde_json::from_reader(fs::File::open(file)?)?;

    let catalog = SchemaCatalog::load(&SchemaFile { tables })?;
    let table_count = catalog.tables().len();

    cache::write(&CatalogSnapshot {
        connection: context.connection,
        catalog,
    })?;

    println!(
        "Imported {} tables for context {}.",
        table_count,
        context.name.to_string().bold()
    );

    Ok(())
}

pub fn describe() -> Result<(), sql_fetcher::Error> {
    print!("{}", describe_schema(&super::current_catalog()?));

    Ok(())
}
