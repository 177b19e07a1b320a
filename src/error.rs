use crate::engine::{
    EmptyQueryError, GenerationServiceError, JoinChainError, SchemaInconsistencyError,
    UnsafeQueryRejected,
};
use std::env::VarError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(value: E) -> Self {
        Error(Box::new(value.into()))
    }
}

#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum ErrorKind {
    #[error("{0}")]
    EmptyQuery(#[from] EmptyQueryError),
    /// The query model points at tables or columns the current schema does not have.
    #[error("Query does not match the database schema:\n{0}")]
    SchemaInconsistency(#[from] SchemaInconsistencyError),
    #[error("Invalid join:\n{0}")]
    JoinChain(#[from] JoinChainError),
    /// Text from the text generation service did not pass the safety scanner.
    #[error("Generated SQL was rejected, try rephrasing the request:\n{0}")]
    UnsafeQueryRejected(#[from] UnsafeQueryRejected),
    #[error("{0}")]
    GenerationService(#[from] GenerationServiceError),
    #[error("Internal error:\n{0}")]
    InternalError(#[from] InternalError),
    #[error("Could not find environment variable: \n{0}")]
    EnvVarError(#[from] VarError),
    #[error("IO error:\n{0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error:\n{0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Error reading data from stdin")]
    DialogueError(#[from] dialoguer::Error),
}

#[derive(Error, Debug)]
pub struct InternalError(pub String);

impl Display for InternalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    pub fn into_inner(self) -> ErrorKind {
        *self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_convert_into_the_crate_error() {
        let error: Error = EmptyQueryError.into();

        assert!(matches!(error.kind(), ErrorKind::EmptyQuery(_)));
        assert_eq!(
            error.to_string(),
            "Cannot generate a query without any selected table"
        );
    }

    #[test]
    fn internal_errors_keep_their_message() {
        let error: Error = InternalError("no context selected".to_string()).into();

        assert_eq!(error.to_string(), "Internal error:\nno context selected");
    }
}
