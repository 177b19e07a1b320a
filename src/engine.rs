//! The query building core: no I/O in here, only data in and text out.
//!
//! The catalog says what exists, the model says what the user picked, rendering turns the model
//! into SQL, and the safety scanner guards the way in for SQL we didn't render ourselves.
pub mod assistant;
pub mod catalog;
pub mod join_inference;
pub mod model;
pub mod rendering;
pub mod safety;
mod session;


pub use assistant::{Assistant, GenerationServiceError, TextGenerator};
pub use catalog::{CatalogProvider, ColumnName, SchemaCatalog, Table, TableName};
pub use join_inference::JoinCandidates;
pub use model::{
    AggregateFunction, AggregateSpec, ColumnRef, CombinedColumnSpec, Connector, FilterOperator,
    FilterPredicate, GroupBySpec, JoinChain, JoinChainError, JoinSpec, JoinType, OrderBySpec,
    OrderDirection, QueryModel, SchemaInconsistencyError,
};
pub use rendering::{generate, EmptyQueryError};
pub use safety::{validate, RejectionReason, UnsafeQueryRejected};
pub use session::Session;
