use colored::Colorize;
use sql_fetcher::cache;
use sql_fetcher::context::{CatalogSnapshot, Context};
use sql_fetcher::engine::{join_inference, safety, QueryModel, SchemaCatalog, Session};
use sql_fetcher::{ErrorKind, InternalError};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

pub mod ask;
pub mod schema;

pub fn generate(model_file: PathBuf) -> Result<(), sql_fetcher::Error> {
    let catalog = current_catalog()?;
    let model: QueryModel = serde_json::from_reader(fs::File::open(model_file)?)?;

    let (session, dropped) = Session::resume(catalog, model);
    for inconsistency in dropped {
        eprintln!("{intro}: left out, {inconsistency}", intro = "warning".bold().yellow());
    }

    println!("{}", session.generate()?);

    Ok(())
}

pub fn suggest_join(left: String, right: String) -> Result<(), sql_fetcher::Error> {
    let catalog = current_catalog()?;
    for table in [&left, &right] {
        if !catalog.contains_table(&table.as_str().into()) {
            Err(InternalError(format!("Unknown table '{table}'")))?;
        }
    }

    let candidates = join_inference::candidates(&left.into(), &right.into(), &catalog);

    match (&candidates.left, &candidates.right) {
        (Some(left), Some(right)) => println!("ON {left} = {right}"),
        _ => Err(InternalError(
            "Both tables need at least one column to join them".to_string(),
        ))?,
    }

    if !candidates.inferred {
        eprintln!(
            "{intro}: no matching columns found, these are just the first column of each table",
            intro = "note".bold()
        );
    }

    Ok(())
}

/// Exits with an error when the query is rejected.
pub fn validate(sql: String) -> Result<(), sql_fetcher::Error> {
    let sql = if sql == "-" {
        let mut stdin = String::new();
        io::stdin().read_to_string(&mut stdin)?;
        stdin
    } else {
        sql
    };

    safety::ensure_safe(&sql)?;

    println!("{}", "accepted".green());

    Ok(())
}

fn current_catalog() -> Result<SchemaCatalog, sql_fetcher::Error> {
    let context = Context::current()?;

    match cache::read::<CatalogSnapshot, _>(&context.connection) {
        Ok(snapshot) => Ok(snapshot.catalog),
        Err(error) if matches!(error.kind(), ErrorKind::IoError(_)) => Err(InternalError(format!(
            "No schema known for context {}, run {} first",
            context.name,
            "fetch import-schema".bold()
        ))
        .into()),
        Err(error) => Err(error),
    }
}
