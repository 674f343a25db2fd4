//! Selection of the record store implementation at startup.

use std::{fmt, str::FromStr, sync::Arc};

use futures::future::BoxFuture;
use thiserror::Error;

use crate::dao::storage::StorageResult;

use super::{RecordStore, memory::InMemoryRecordStore};

/// Environment variable naming the backend to run against.
pub const STORAGE_BACKEND_ENV: &str = "STORAGE_BACKEND";

/// Record store implementations this binary can run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// MongoDB through the official driver.
    #[cfg(feature = "mongo-store")]
    Mongo,
    /// CouchDB over its HTTP API.
    #[cfg(feature = "couch-store")]
    Couch,
    /// Process-local maps; contents are lost on exit.
    Memory,
}

/// `STORAGE_BACKEND` named something this build cannot serve.
#[derive(Debug, Error)]
#[error("unsupported storage backend `{requested}` (available: {available})")]
pub struct UnknownBackend {
    requested: String,
    available: String,
}

impl StorageBackend {
    /// Backends compiled into this binary, preferred first.
    pub fn available() -> Vec<Self> {
        let mut backends = Vec::with_capacity(3);
        #[cfg(feature = "mongo-store")]
        backends.push(Self::Mongo);
        #[cfg(feature = "couch-store")]
        backends.push(Self::Couch);
        backends.push(Self::Memory);
        backends
    }

    /// Read [`STORAGE_BACKEND_ENV`], defaulting to the first compiled backend.
    pub fn from_env() -> Result<Self, UnknownBackend> {
        match std::env::var(STORAGE_BACKEND_ENV) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(Self::default()),
        }
    }

    /// Name accepted by [`StorageBackend::from_str`].
    pub const fn as_str(self) -> &'static str {
        match self {
            #[cfg(feature = "mongo-store")]
            Self::Mongo => "mongo",
            #[cfg(feature = "couch-store")]
            Self::Couch => "couch",
            Self::Memory => "memory",
        }
    }

    /// Build the reconnecting factory handed to the storage supervisor.
    ///
    /// The memory backend hands out the same store on every call so data survives a
    /// supervisor restart.
    pub fn connector(
        self,
    ) -> impl FnMut() -> BoxFuture<'static, StorageResult<Arc<dyn RecordStore>>> + Send + 'static
    {
        let memory = InMemoryRecordStore::new();
        move || -> BoxFuture<'static, StorageResult<Arc<dyn RecordStore>>> {
            match self {
                #[cfg(feature = "mongo-store")]
                Self::Mongo => Box::pin(connect_mongo()),
                #[cfg(feature = "couch-store")]
                Self::Couch => Box::pin(connect_couch()),
                Self::Memory => {
                    let store = memory.clone();
                    Box::pin(async move { Ok(Arc::new(store) as Arc<dyn RecordStore>) })
                }
            }
        }
    }
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::available()
            .first()
            .copied()
            .unwrap_or(Self::Memory)
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = UnknownBackend;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        Self::available()
            .into_iter()
            .find(|backend| backend.as_str() == wanted)
            .ok_or_else(|| UnknownBackend {
                requested: value.to_owned(),
                available: Self::available()
                    .iter()
                    .map(|backend| backend.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo() -> StorageResult<Arc<dyn RecordStore>> {
    use super::mongodb::{MongoConfig, MongoRecordStore};

    let config = MongoConfig::from_env().await?;
    let store = MongoRecordStore::connect(config).await?;
    Ok(Arc::new(store))
}

#[cfg(feature = "couch-store")]
async fn connect_couch() -> StorageResult<Arc<dyn RecordStore>> {
    use super::couchdb::{CouchConfig, CouchRecordStore};

    let config = CouchConfig::from_env()?;
    let store = CouchRecordStore::connect(config).await?;
    Ok(Arc::new(store))
}
