//! Plain data for every clause the user can add to a query.
//!
//! Nothing in here knows about widgets: a view layer observes these values and draws them.
use crate::engine::model::ColumnRef;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};

/// A WHERE entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub column: ColumnRef,
    pub operator: FilterOperator,
    /// Ignored by IS NULL and IS NOT NULL. BETWEEN expects "lower AND upper" in here.
    #[serde(default)]
    pub value: String,
    /// Glues this predicate to the *next* one, so it's unused on the last predicate.
    #[serde(default)]
    pub connector: Connector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "<>")]
    NotEquals,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LesserThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LesserOrEqual,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
    #[serde(rename = "BETWEEN")]
    Between,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub function: AggregateFunction,
    pub column: ColumnRef,
    #[serde(default)]
    pub alias: Option<String>,
}

/// A derived output column: `COALESCE(source, ...) AS alias`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedColumnSpec {
    pub alias: String,
    /// Behaves like a set, but keeps the order columns were picked in.
    #[serde(default, deserialize_with = "distinct_sources")]
    source_columns: Vec<ColumnRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBySpec {
    pub column: ColumnRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBySpec {
    pub column: ColumnRef,
    #[serde(default)]
    pub direction: OrderDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl FilterPredicate {
    pub fn new<V: Into<String>>(column: ColumnRef, operator: FilterOperator, value: V) -> Self {
        FilterPredicate {
            column,
            operator,
            value: value.into(),
            connector: Connector::And,
        }
    }

    pub fn followed_by(mut self, connector: Connector) -> Self {
        self.connector = connector;
        self
    }
}

impl FilterOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "=",
            FilterOperator::NotEquals => "<>",
            FilterOperator::GreaterThan => ">",
            FilterOperator::LesserThan => "<",
            FilterOperator::GreaterOrEqual => ">=",
            FilterOperator::LesserOrEqual => "<=",
            FilterOperator::Like => "LIKE",
            FilterOperator::In => "IN",
            FilterOperator::IsNull => "IS NULL",
            FilterOperator::IsNotNull => "IS NOT NULL",
            FilterOperator::Between => "BETWEEN",
        }
    }

    /// The UI disables the value input for operators that don't take one.
    pub fn takes_value(&self) -> bool {
        !matches!(self, FilterOperator::IsNull | FilterOperator::IsNotNull)
    }
}

impl AggregateSpec {
    /// New aggregates start out with a suggested alias.
    pub fn new(function: AggregateFunction, column: ColumnRef) -> Self {
        let mut aggregate = AggregateSpec {
            function,
            column,
            alias: None,
        };
        aggregate.alias = aggregate.suggested_alias();

        aggregate
    }

    pub fn with_alias<A: Into<String>>(mut self, alias: A) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// `SUM` over `orders.total` suggests `SUM_total`.
    pub fn suggested_alias(&self) -> Option<String> {
        if self.column.is_blank() {
            return None;
        }

        Some(format!("{}_{}", self.function, self.column.column))
    }

    /// True if the alias is empty or still the one we would have suggested.
    pub fn has_generated_alias(&self) -> bool {
        match self.alias.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(alias) => self.suggested_alias().as_deref() == Some(alias),
        }
    }

    pub fn set_function(&mut self, function: AggregateFunction) {
        self.update(|aggregate| aggregate.function = function);
    }

    pub fn set_column(&mut self, column: ColumnRef) {
        self.update(|aggregate| aggregate.column = column);
    }

    /// Applies a change and refreshes the alias, unless the user wrote their own.
    fn update<F: FnOnce(&mut Self)>(&mut self, change: F) {
        let refresh_alias = self.has_generated_alias();

        change(self);

        if refresh_alias {
            if let Some(alias) = self.suggested_alias() {
                self.alias = Some(alias);
            }
        }
    }
}

impl CombinedColumnSpec {
    pub fn new<A: Into<String>>(alias: A) -> Self {
        CombinedColumnSpec {
            alias: alias.into(),
            source_columns: Vec::new(),
        }
    }

    pub fn with_sources<I: IntoIterator<Item = ColumnRef>>(mut self, sources: I) -> Self {
        for source in sources {
            self.add_source(source);
        }
        self
    }

    /// Returns false if the column was already a source.
    pub fn add_source(&mut self, column: ColumnRef) -> bool {
        if self.source_columns.contains(&column) {
            return false;
        }

        self.source_columns.push(column);

        true
    }

    pub fn remove_source(&mut self, column: &ColumnRef) -> bool {
        let before = self.source_columns.len();
        self.source_columns.retain(|source| source != column);

        before != self.source_columns.len()
    }

    pub fn sources(&self) -> &[ColumnRef] {
        self.source_columns.as_slice()
    }

    pub(crate) fn retain_sources<F: FnMut(&ColumnRef) -> bool>(&mut self, keep: F) {
        self.source_columns.retain(keep);
    }

    /// All sources share a name: use it. Otherwise `combined_` and every distinct name.
    pub fn suggested_alias(&self) -> Option<String> {
        let mut names: Vec<&str> = Vec::new();
        for source in self.source_columns.iter().filter(|c| !c.is_blank()) {
            if !names.contains(&source.column.as_str()) {
                names.push(source.column.as_str());
            }
        }

        match names.as_slice() {
            [] => None,
            [single] => Some(single.to_string()),
            many => Some(format!("combined_{}", many.join("_"))),
        }
    }
}

fn distinct_sources<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<ColumnRef>, D::Error> {
    let sources = Vec::<ColumnRef>::deserialize(deserializer)?;

    Ok(CombinedColumnSpec::default()
        .with_sources(sources)
        .source_columns)
}

impl GroupBySpec {
    pub fn new(column: ColumnRef) -> Self {
        GroupBySpec { column }
    }
}

impl OrderBySpec {
    pub fn new(column: ColumnRef, direction: OrderDirection) -> Self {
        OrderBySpec { column, direction }
    }
}

impl Display for FilterOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Display for Connector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Connector::And => write!(f, "AND"),
            Connector::Or => write!(f, "OR"),
        }
    }
}

impl Display for AggregateFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        };

        write!(f, "{name}")
    }
}

impl Display for OrderDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(text: &str) -> ColumnRef {
        text.parse().unwrap()
    }

    #[test]
    fn aggregates_suggest_an_alias() {
        let aggregate = AggregateSpec::new(AggregateFunction::Sum, column("orders.total"));

        assert_eq!(aggregate.alias.as_deref(), Some("SUM_total"));
        assert!(aggregate.has_generated_alias());
    }

    #[test]
    fn generated_aliases_follow_changes() {
        let mut aggregate = AggregateSpec::new(AggregateFunction::Sum, column("orders.total"));

        aggregate.set_function(AggregateFunction::Max);
        assert_eq!(aggregate.alias.as_deref(), Some("MAX_total"));

        aggregate.set_column(column("orders.tax"));
        assert_eq!(aggregate.alias.as_deref(), Some("MAX_tax"));
    }

    #[test]
    fn user_aliases_are_kept() {
        let mut aggregate =
            AggregateSpec::new(AggregateFunction::Count, column("orders.id")).with_alias("n");

        aggregate.set_function(AggregateFunction::Max);

        assert_eq!(aggregate.alias.as_deref(), Some("n"));
        assert!(!aggregate.has_generated_alias());
    }

    #[test]
    fn blank_columns_get_no_alias() {
        let aggregate = AggregateSpec::new(AggregateFunction::Count, ColumnRef::default());

        assert_eq!(aggregate.alias, None);
    }

    #[test]
    fn combined_sources_behave_like_a_set() {
        let mut combined = CombinedColumnSpec::new("email");

        assert!(combined.add_source(column("users.email")));
        assert!(combined.add_source(column("contacts.email")));
        assert!(!combined.add_source(column("users.email")));
        assert_eq!(combined.sources().len(), 2);

        assert!(combined.remove_source(&column("users.email")));
        assert!(!combined.remove_source(&column("users.email")));
        assert_eq!(combined.sources(), &[column("contacts.email")]);
    }

    #[test]
    fn combined_sources_stay_distinct_when_loaded() {
        let combined: CombinedColumnSpec = serde_json::from_str(
            r#"{"alias": "email", "source_columns": ["users.email", "contacts.email", "users.email"]}"#,
        )
        .unwrap();

        assert_eq!(
            combined.sources(),
            &[column("users.email"), column("contacts.email")]
        );
    }

    #[test]
    fn combined_alias_suggestions() {
        let shared = CombinedColumnSpec::new("")
            .with_sources([column("users.email"), column("contacts.email")]);
        assert_eq!(shared.suggested_alias().as_deref(), Some("email"));

        let mixed = CombinedColumnSpec::new("").with_sources([
            column("users.phone"),
            column("contacts.mobile"),
            column("leads.phone"),
        ]);
        assert_eq!(
            mixed.suggested_alias().as_deref(),
            Some("combined_phone_mobile")
        );

        assert_eq!(CombinedColumnSpec::new("").suggested_alias(), None);
    }

    #[test]
    fn operators_deserialize_from_their_sql_text() {
        let predicate: FilterPredicate = serde_json::from_str(
            r#"{"column": "t.deleted_at", "operator": "IS NOT NULL", "connector": "OR"}"#,
        )
        .unwrap();

        assert_eq!(predicate.operator, FilterOperator::IsNotNull);
        assert_eq!(predicate.connector, Connector::Or);
        assert_eq!(predicate.value, "");
        assert!(!predicate.operator.takes_value());
    }
}
