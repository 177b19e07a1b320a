//! Turns a [QueryModel] into SQL text.
//!
//! This happens in two steps, like everywhere else in the engine: [build_query] resolves the
//! model against the catalog into a [SqlQuery], which holds only what will actually be written,
//! and the `Display` impls in [query_rendering] write it out.
use crate::engine::catalog::SchemaCatalog;
use crate::engine::model::QueryModel;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub use sql_query::{build_query, Condition, Join, Literal, Operand, Ordering, SelectItem, SqlQuery};

mod query_rendering;
mod sql_query;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Cannot generate a query without any selected table")]
pub struct EmptyQueryError;

/// Pure function of its inputs: the same model and catalog always produce the same text.
pub fn generate(model: &QueryModel, catalog: &SchemaCatalog) -> Result<String, EmptyQueryError> {
    let query = build_query(model, catalog)?;

    Ok(query.to_string())
}

struct OptionalClause<'a, T> {
    intro: &'a str,
    ligature: &'a str,
    items: &'a [T],
}

impl<'a, T> OptionalClause<'a, T> {
    fn group_by(items: &'a [T]) -> Self {
        OptionalClause {
            intro: "GROUP BY",
            ligature: ",",
            items,
        }
    }

    fn order_by(items: &'a [T]) -> Self {
        OptionalClause {
            intro: "ORDER BY",
            ligature: ",",
            items,
        }
    }
}

/// Displays things like "GROUP BY 1, 2, 3" on a line of their own, or nothing at all if
/// there are no items.
impl<'a, T> Display for OptionalClause<'a, T>
where
    T: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Self {
            intro,
            ligature,
            items,
        } = self;

        if let Some((first, rest)) = items.split_first() {
            write!(f, "\n{intro} {first}")?;

            for item in rest {
                write!(f, "{ligature} {item}")?;
            }
        }

        Ok(())
    }
}
