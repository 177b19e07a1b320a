//! Everything we keep between runs: contexts, schema snapshots and credentials.
//!
//! To use the cache system, implement the Cacheable and CacheKey traits, then you can
//! use the read(), read_all() and write() functions.
use crate::context::{
    CatalogSnapshot, ConnectionParams, Context, ContextName, Credential, CredentialName,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

pub trait CacheKey {
    fn as_path(&self) -> String;
}

/// Anything that can be cached needs to implement this trait.
///
/// Binding the key type to the cached type means the compiler stops us from reading a
/// `Context` with a key meant for a `CatalogSnapshot`.
pub trait Cacheable {
    type CacheKey;

    fn cache_key(&self) -> Self::CacheKey;

    /// All instances of a type live in the same folder, named after this. Must be unique.
    fn type_id() -> &'static str;
}

pub fn read<D, K>(cache_key: &K) -> Result<D, crate::Error>
where
    D: Cacheable<CacheKey = K> + DeserializeOwned,
    K: CacheKey,
{
    let file_location = get_cache_path(D::type_id(), cache_key.as_path().as_str())?;
    log::debug!("reading {}", file_location.display());

    let data = serde_json::from_reader(fs::File::open(file_location)?)?;

    Ok(data)
}

/// Reads every cached instance of a type, in no particular order.
pub fn read_all<D>() -> Result<Vec<D>, crate::Error>
where
    D: Cacheable + DeserializeOwned,
{
    let folder = require_cache_folder(D::type_id())?;

    let mut all = Vec::new();
    for entry in fs::read_dir(folder)? {
        let data = serde_json::from_reader(fs::File::open(entry?.path())?)?;
        all.push(data);
    }

    Ok(all)
}

pub fn write<D, K>(data: &D) -> Result<(), crate::Error>
where
    D: Cacheable<CacheKey = K> + Serialize,
    K: CacheKey,
{
    let file_location = get_cache_path(D::type_id(), data.cache_key().as_path().as_str())?;
    log::debug!("writing {}", file_location.display());

    let data = serde_json::to_string(&data)?;

    fs::write(file_location, data)?;

    Ok(())
}

fn get_cache_path(type_id: &'static str, cache_key: &str) -> Result<PathBuf, crate::Error> {
    let mut location = require_cache_folder(type_id)?;

    location.push(cache_key);

    Ok(location)
}

fn require_cache_folder(type_id: &'static str) -> Result<PathBuf, crate::Error> {
    let home = std::env::var("HOME")?;

    let mut path = PathBuf::from(home);
    path.push(".cache");
    path.push("sql-fetcher");
    path.push("v1");
    path.push(type_id);

    fs::create_dir_all(&path)?;

    Ok(path)
}

// Please dump all impls here, so we keep the rest of the code base clean.

impl Cacheable for CatalogSnapshot {
    type CacheKey = ConnectionParams;

    fn cache_key(&self) -> Self::CacheKey {
        self.connection.clone()
    }

    fn type_id() -> &'static str {
        "catalog"
    }
}

impl CacheKey for ConnectionParams {
    fn as_path(&self) -> String {
        format!(
            "catalog-{}-{}-{}-{}.json",
            self.hostname, self.port, self.user, self.database
        )
    }
}

impl Cacheable for Context {
    type CacheKey = ContextName;

    fn cache_key(&self) -> Self::CacheKey {
        self.name.clone()
    }

    fn type_id() -> &'static str {
        "context"
    }
}

impl CacheKey for ContextName {
    fn as_path(&self) -> String {
        format!("context_{}.json", self)
    }
}

impl Cacheable for ContextName {
    type CacheKey = SharedCacheKey;

    fn cache_key(&self) -> Self::CacheKey {
        SharedCacheKey(Self::type_id().to_owned())
    }

    fn type_id() -> &'static str {
        "current_context"
    }
}

impl Cacheable for Credential {
    type CacheKey = CredentialName;

    fn cache_key(&self) -> Self::CacheKey {
        self.name.clone()
    }

    fn type_id() -> &'static str {
        "credential"
    }
}

impl CacheKey for CredentialName {
    fn as_path(&self) -> String {
        format!("credential_{}.json", self.as_str())
    }
}

/// For things there is only one of.
pub struct SharedCacheKey(String);

impl CacheKey for SharedCacheKey {
    fn as_path(&self) -> String {
        self.0.clone()
    }
}
