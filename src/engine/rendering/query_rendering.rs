use crate::engine::rendering::sql_query::{
    Condition, Join, Literal, Operand, Ordering, SelectItem, SqlQuery,
};
use crate::engine::rendering::OptionalClause;
use std::fmt::{Display, Formatter};

/// ```text
/// SELECT
///   orders.id,
///   SUM(orders.total) AS SUM_total
/// FROM orders
/// LEFT JOIN customers ON orders.customer_id = customers.id
/// WHERE orders.total > 100
/// GROUP BY orders.id
/// ORDER BY orders.id DESC
/// ```
///
/// No trailing semicolon and no trailing newline.
impl Display for SqlQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SELECT\n  {}", RenderableSelect(self.select.as_slice()))?;
        write!(f, "\nFROM {}", self.from)?;

        for join in &self.joins {
            write!(f, "\n{join}")?;
        }

        write!(f, "{}", RenderableWhere(self.filters.as_slice()))?;
        write!(f, "{}", OptionalClause::group_by(self.group_by.as_slice()))?;
        write!(f, "{}", OptionalClause::order_by(self.order_by.as_slice()))?;

        Ok(())
    }
}

struct RenderableSelect<'a>(&'a [SelectItem]);

impl Display for RenderableSelect<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some((first, rest)) = self.0.split_first() {
            write!(f, "{first}")?;

            for select in rest {
                write!(f, ",\n  {select}")?;
            }
        } else {
            write!(f, "*")?;
        }

        Ok(())
    }
}

/// Unlike GROUP BY and ORDER BY, every WHERE item picks its own ligature.
struct RenderableWhere<'a>(&'a [Condition]);

impl Display for RenderableWhere<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }

        write!(f, "\nWHERE")?;
        for condition in self.0 {
            if let Some(connector) = condition.connector {
                write!(f, " {connector}")?;
            }

            write!(f, " {condition}")?;
        }

        Ok(())
    }
}

impl Display for SelectItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectItem::Column(column) => write!(f, "{column}"),
            SelectItem::Aggregate {
                function,
                column,
                alias,
            } => {
                write!(f, "{function}({column})")?;

                match alias {
                    Some(alias) => write!(f, " AS {alias}"),
                    None => Ok(()),
                }
            }
            SelectItem::Combined { sources, alias } => {
                let sources: Vec<_> = sources.iter().map(ToString::to_string).collect();

                write!(f, "COALESCE({}) AS {alias}", sources.join(", "))
            }
        }
    }
}

impl Display for Join {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.join_type, self.table)?;

        if let Some((left, right)) = &self.on {
            write!(f, " ON {left} = {right}")?;
        }

        Ok(())
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.column, self.operator)?;

        match &self.operand {
            Operand::None => Ok(()),
            Operand::Verbatim(text) => write!(f, " {text}"),
            Operand::Value(literal) => write!(f, " {literal}"),
            Operand::List(literals) => {
                let literals: Vec<_> = literals.iter().map(ToString::to_string).collect();

                write!(f, " ({})", literals.join(", "))
            }
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(number) => write!(f, "{number}"),
            // O'Brien -> 'O''Brien'
            Literal::String(text) => write!(f, "'{}'", text.replace('\'', "''")),
        }
    }
}

impl Display for Ordering {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.column, self.direction)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::catalog::SchemaCatalog;
    use crate::engine::model::*;
    use crate::engine::rendering::{generate, EmptyQueryError};

    fn shop() -> SchemaCatalog {
        SchemaCatalog::from_iter([
            ("orders", vec!["id", "customer_id", "total"]),
            ("customers", vec!["id", "name"]),
            ("addresses", vec!["id", "customer_id", "city"]),
            ("regions", vec!["code"]),
        ])
    }

    fn model_for(tables: &[&str], catalog: &SchemaCatalog) -> QueryModel {
        let mut model = QueryModel::new();
        model.select_tables(tables.iter().copied(), catalog).unwrap();
        model
    }

    fn column(text: &str) -> ColumnRef {
        text.parse().unwrap()
    }

    #[test]
    fn no_tables_no_query() {
        assert_eq!(generate(&QueryModel::new(), &shop()), Err(EmptyQueryError));
        assert_eq!(
            EmptyQueryError.to_string(),
            "Cannot generate a query without any selected table"
        );
    }

    #[test]
    fn selects_columns_in_table_then_column_order() {
        let catalog = shop();
        let mut model = model_for(&["customers", "orders"], &catalog);
        model
            .set_column_selected(&"orders".into(), &"customer_id".into(), false, &catalog)
            .unwrap();

        let sql = generate(&model, &catalog).unwrap();

        assert_eq!(
            sql,
            "SELECT\n  customers.id,\n  customers.name,\n  orders.id,\n  orders.total\nFROM customers"
        );
    }

    #[test]
    fn nothing_selected_means_star() {
        let catalog = shop();
        let mut model = model_for(&["orders"], &catalog);
        model
            .set_all_columns_selected(&"orders".into(), false, &catalog)
            .unwrap();

        assert_eq!(
            generate(&model, &catalog).unwrap(),
            "SELECT\n  *\nFROM orders"
        );
    }

    #[test]
    fn aggregates_and_combined_columns_follow_plain_columns() {
        let catalog = shop();
        let mut model = model_for(&["orders"], &catalog);
        model
            .set_all_columns_selected(&"orders".into(), false, &catalog)
            .unwrap();
        model.add_aggregate(AggregateFunction::Sum, column("orders.total"));
        model.add_aggregate(AggregateFunction::Count, column("orders.id")).alias = Some("".into());
        model.combined_columns.push(
            CombinedColumnSpec::new("buyer")
                .with_sources([column("orders.customer_id"), column("orders.id")]),
        );
        // no alias, not rendered
        model
            .combined_columns
            .push(CombinedColumnSpec::new("").with_sources([column("orders.id")]));
        // no sources, not rendered
        model.combined_columns.push(CombinedColumnSpec::new("empty"));

        assert_eq!(
            generate(&model, &catalog).unwrap(),
            "SELECT\n  SUM(orders.total) AS SUM_total,\n  COUNT(orders.id),\n  \
             COALESCE(orders.customer_id, orders.id) AS buyer\nFROM orders"
        );
    }

    #[test]
    fn joins_render_in_chain_order() {
        let catalog = shop();
        let mut model = model_for(&["orders", "customers", "addresses", "regions"], &catalog);
        for table in ["orders", "customers", "addresses", "regions"] {
            model
                .set_all_columns_selected(&table.into(), false, &catalog)
                .unwrap();
        }
        model
            .add_join(None, "customers".into(), JoinType::Left, &catalog)
            .unwrap();
        model
            .add_join(None, "addresses".into(), JoinType::Inner, &catalog)
            .unwrap();
        model
            .add_join(None, "regions".into(), JoinType::Cross, &catalog)
            .unwrap();

        let sql = generate(&model, &catalog).unwrap();

        assert_eq!(
            sql,
            "SELECT\n  *\nFROM orders\n\
             LEFT JOIN customers ON orders.id = customers.id\n\
             INNER JOIN addresses ON customers.id = addresses.id\n\
             CROSS JOIN regions"
        );
        assert_eq!(sql.matches(" JOIN ").count(), model.joins().len());
    }

    #[test]
    fn missing_join_columns_fall_back_to_ids() {
        let catalog = shop();
        let mut model = model_for(&["orders", "customers"], &catalog);
        model
            .set_all_columns_selected(&"orders".into(), false, &catalog)
            .unwrap();
        model
            .set_all_columns_selected(&"customers".into(), false, &catalog)
            .unwrap();
        model
            .add_join(None, "customers".into(), JoinType::FullOuter, &catalog)
            .unwrap();
        model
            .join_mut(0)
            .unwrap()
            .set_columns(Some(column("orders.customer_id")), None);

        assert_eq!(
            generate(&model, &catalog).unwrap(),
            "SELECT\n  *\nFROM orders\nFULL OUTER JOIN customers ON orders.id = customers.id"
        );
    }

    #[test]
    fn where_clause_formats_values() {
        let catalog = shop();
        let mut model = model_for(&["orders"], &catalog);
        model
            .set_all_columns_selected(&"orders".into(), false, &catalog)
            .unwrap();
        model.filters = vec![
            FilterPredicate::new(column("orders.id"), FilterOperator::In, "1, 2 ,abc"),
            FilterPredicate::new(column("orders.total"), FilterOperator::GreaterThan, " 10.5 ")
                .followed_by(Connector::Or),
            FilterPredicate::new(column("orders.customer_id"), FilterOperator::Equals, "O'Brien"),
            FilterPredicate::new(column("orders.total"), FilterOperator::Between, "1 AND 5"),
            FilterPredicate::new(column("orders.id"), FilterOperator::IsNull, "ignored"),
        ];

        assert_eq!(
            generate(&model, &catalog).unwrap(),
            "SELECT\n  *\nFROM orders\n\
             WHERE orders.id IN (1, 2, 'abc') AND orders.total > 10.5 \
             OR orders.customer_id = 'O''Brien' AND orders.total BETWEEN 1 AND 5 \
             AND orders.id IS NULL"
        );
    }

    #[test]
    fn the_last_connector_is_unused() {
        let catalog = shop();
        let mut model = model_for(&["orders"], &catalog);
        model.filters = vec![
            FilterPredicate::new(column("orders.id"), FilterOperator::Equals, "1"),
            FilterPredicate::new(column("orders.total"), FilterOperator::LesserThan, "3"),
        ];
        let before = generate(&model, &catalog).unwrap();

        model.filters[1].connector = Connector::Or;

        assert_eq!(generate(&model, &catalog).unwrap(), before);
    }

    #[test]
    fn unfinished_entries_are_skipped() {
        let catalog = shop();
        let mut model = model_for(&["orders"], &catalog);
        model
            .set_all_columns_selected(&"orders".into(), false, &catalog)
            .unwrap();
        model.filters = vec![
            FilterPredicate::new(column("orders.id"), FilterOperator::Equals, "1")
                .followed_by(Connector::Or),
            FilterPredicate::new(ColumnRef::default(), FilterOperator::Equals, "2"),
            FilterPredicate::new(column("orders.total"), FilterOperator::Like, "%5"),
        ];
        model.group_by = vec![GroupBySpec::new(ColumnRef::default())];
        model.order_by = vec![
            OrderBySpec::new(ColumnRef::default(), OrderDirection::Asc),
            OrderBySpec::new(column("orders.total"), OrderDirection::Desc),
            OrderBySpec::new(column("orders.id"), OrderDirection::Asc),
        ];

        assert_eq!(
            generate(&model, &catalog).unwrap(),
            "SELECT\n  *\nFROM orders\n\
             WHERE orders.id = 1 OR orders.total LIKE '%5'\n\
             ORDER BY orders.total DESC, orders.id ASC"
        );
    }

    #[test]
    fn group_by() {
        let catalog = shop();
        let mut model = model_for(&["orders"], &catalog);
        model
            .set_matching_columns_selected(&"orders".into(), "total", false, &catalog)
            .unwrap();
        model.add_aggregate(AggregateFunction::Avg, column("orders.total"));
        model.group_by = vec![
            GroupBySpec::new(column("orders.id")),
            GroupBySpec::new(column("orders.customer_id")),
        ];

        assert_eq!(
            generate(&model, &catalog).unwrap(),
            "SELECT\n  orders.id,\n  orders.customer_id,\n  AVG(orders.total) AS AVG_total\n\
             FROM orders\nGROUP BY orders.id, orders.customer_id"
        );
    }

    #[test]
    fn generating_twice_gives_the_same_text() {
        let catalog = shop();
        let mut model = model_for(&["orders", "customers"], &catalog);
        model
            .add_join(None, "customers".into(), JoinType::Inner, &catalog)
            .unwrap();
        model.order_by = vec![OrderBySpec::new(column("customers.name"), OrderDirection::Asc)];

        assert_eq!(
            generate(&model, &catalog).unwrap(),
            generate(&model, &catalog).unwrap()
        );
    }
}
