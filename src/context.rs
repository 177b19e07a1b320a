use crate::cache;
use crate::cache::Cacheable;
use crate::engine::SchemaCatalog;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A named database connection the user can switch to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub name: ContextName,
    pub connection: ConnectionParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextName(String);

/// Where the schema comes from. We never connect ourselves, this only keys the cached schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConnectionParams {
    pub db_type: DbType,
    pub hostname: String,
    pub port: u16,
    pub user: String,
    pub database: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DbType {
    SqlServer,
    MySql,
}

/// The last known schema of a database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub connection: ConnectionParams,
    pub catalog: SchemaCatalog,
}

/// An opaque secret, like the API key of the text generation service.
///
/// Stored as is. Encrypting it is up to whoever manages the cache folder.
#[derive(Serialize, Deserialize)]
pub struct Credential {
    pub name: CredentialName,
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialName(String);

impl ContextName {
    pub fn current() -> Result<ContextName, crate::Error> {
        // All context names share the same cache key, because that's how we save the current
        // context. Reading from any of them gets us the current one.
        cache::read(&ContextName("any".to_string()).cache_key())
    }
}

impl Context {
    pub fn current() -> Result<Context, crate::Error> {
        cache::read(&ContextName::current()?)
    }
}

impl CredentialName {
    pub fn generation_api_key() -> Self {
        CredentialName("generation-api-key".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContextName {
    fn from(value: String) -> Self {
        ContextName(value)
    }
}

impl From<&str> for ContextName {
    fn from(value: &str) -> Self {
        ContextName(value.to_string())
    }
}

impl From<ContextName> for String {
    fn from(value: ContextName) -> Self {
        value.0
    }
}

impl Display for ContextName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for DbType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::SqlServer => write!(f, "SQL Server"),
            DbType::MySql => write!(f, "MySQL"),
        }
    }
}

impl Display for ConnectionParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{user}@{host}:{port}/{database} ({db_type})",
            user = self.user,
            host = self.hostname,
            port = self.port,
            database = self.database,
            db_type = self.db_type,
        )
    }
}
