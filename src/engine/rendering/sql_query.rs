use crate::engine::catalog::{SchemaCatalog, TableName};
use crate::engine::model::{
    AggregateFunction, ColumnRef, Connector, FilterOperator, FilterPredicate, JoinSpec, JoinType,
    OrderDirection, QueryModel,
};
use crate::engine::rendering::EmptyQueryError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Everything that ends up in the SQL text, and nothing else. Entries the user hasn't finished
/// filling in are already gone at this point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    pub select: Vec<SelectItem>,
    pub from: TableName,
    pub joins: Vec<Join>,
    pub filters: Vec<Condition>,
    pub group_by: Vec<ColumnRef>,
    pub order_by: Vec<Ordering>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    Column(ColumnRef),
    Aggregate {
        function: AggregateFunction,
        column: ColumnRef,
        alias: Option<String>,
    },
    Combined {
        sources: Vec<ColumnRef>,
        alias: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: TableName,
    /// Always set, unless this is a CROSS join.
    pub on: Option<(ColumnRef, ColumnRef)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// How this condition attaches to the previous one. The first condition has none.
    pub connector: Option<Connector>,
    pub column: ColumnRef,
    pub operator: FilterOperator,
    pub operand: Operand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    None,
    Verbatim(String),
    Value(Literal),
    List(Vec<Literal>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Number(String),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub column: ColumnRef,
    pub direction: OrderDirection,
}

pub fn build_query(model: &QueryModel, catalog: &SchemaCatalog) -> Result<SqlQuery, EmptyQueryError> {
    let first_table = model.tables().first().ok_or(EmptyQueryError)?;

    let from = model.joins().root().unwrap_or(first_table).clone();

    let query = SqlQuery {
        select: build_select(model, catalog),
        from,
        joins: model.joins().iter().map(build_join).collect(),
        filters: build_filters(&model.filters),
        group_by: model
            .group_by
            .iter()
            .filter(|group| !group.column.is_blank())
            .map(|group| group.column.clone())
            .collect(),
        order_by: model
            .order_by
            .iter()
            .filter(|order| !order.column.is_blank())
            .map(|order| Ordering {
                column: order.column.clone(),
                direction: order.direction,
            })
            .collect(),
    };

    log::debug!(
        "built query: {} select items, {} joins, {} conditions",
        query.select.len(),
        query.joins.len(),
        query.filters.len()
    );

    Ok(query)
}

fn build_select(model: &QueryModel, catalog: &SchemaCatalog) -> Vec<SelectItem> {
    let selection = model.column_selection();

    let columns = model.tables().iter().flat_map(|table| {
        catalog
            .columns(table)
            .unwrap_or_default()
            .iter()
            .filter(move |column| selection.is_selected(table, column))
            .map(move |column| SelectItem::Column(ColumnRef::new(table.clone(), column.clone())))
    });

    let aggregates = model
        .aggregates
        .iter()
        .filter(|aggregate| !aggregate.column.is_blank())
        .map(|aggregate| SelectItem::Aggregate {
            function: aggregate.function,
            column: aggregate.column.clone(),
            alias: aggregate
                .alias
                .as_ref()
                .map(|alias| alias.trim())
                .filter(|alias| !alias.is_empty())
                .map(str::to_string),
        });

    let combined = model.combined_columns.iter().filter_map(|combined| {
        let alias = combined.alias.trim();
        let sources: Vec<ColumnRef> = combined
            .sources()
            .iter()
            .filter(|source| !source.is_blank())
            .cloned()
            .collect();

        if alias.is_empty() || sources.is_empty() {
            return None;
        }

        Some(SelectItem::Combined {
            sources,
            alias: alias.to_string(),
        })
    });

    columns.chain(aggregates).chain(combined).collect()
}

fn build_join(join: &JoinSpec) -> Join {
    let on = join.needs_condition().then(|| {
        match (&join.left_column, &join.right_column) {
            (Some(left), Some(right)) if !left.is_blank() && !right.is_blank() => {
                (left.clone(), right.clone())
            }
            // best effort, so we never end up with an ON-less INNER JOIN
            _ => (
                ColumnRef::new(join.left_table.clone(), "id"),
                ColumnRef::new(join.right_table.clone(), "id"),
            ),
        }
    });

    Join {
        join_type: join.join_type,
        table: join.right_table.clone(),
        on,
    }
}

fn build_filters(filters: &[FilterPredicate]) -> Vec<Condition> {
    let mut conditions = Vec::new();
    let mut pending_connector = None;

    for filter in filters.iter().filter(|filter| !filter.column.is_blank()) {
        conditions.push(Condition {
            connector: pending_connector,
            column: filter.column.clone(),
            operator: filter.operator,
            operand: build_operand(filter.operator, &filter.value),
        });

        pending_connector = Some(filter.connector);
    }

    conditions
}

fn build_operand(operator: FilterOperator, value: &str) -> Operand {
    match operator {
        _ if !operator.takes_value() => Operand::None,
        FilterOperator::Between => Operand::Verbatim(value.to_string()),
        FilterOperator::In => {
            Operand::List(value.split(',').map(|part| Literal::classify(part.trim())).collect())
        }
        _ => Operand::Value(Literal::classify(value)),
    }
}

impl Literal {
    /// Numbers go out as they are, everything else gets quoted. Surrounding whitespace is only
    /// insignificant for numbers.
    pub fn classify(value: &str) -> Literal {
        static NUMBER_REGEX: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$").unwrap());

        let trimmed = value.trim();
        if NUMBER_REGEX.is_match(trimmed) {
            Literal::Number(trimmed.to_string())
        } else {
            Literal::String(value.to_string())
        }
    }
}
