// Application state module
// Everything a request needs, built once at startup and shared read-only

use std::sync::Arc;

use super::types::Config;
use super::LoadError;
use crate::proxy::{BlobProxy, ProxyOptions};
use crate::store::ObjectStoreBlobStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub proxy: BlobProxy,
}

impl AppState {
    pub const fn new(config: Config, proxy: BlobProxy) -> Self {
        Self { config, proxy }
    }

    /// Construct the store client and proxy described by `config`
    pub fn from_config(config: Config) -> Result<Self, LoadError> {
        let store = ObjectStoreBlobStore::from_config(&config.storage)?;
        let options = ProxyOptions::from_config(&config.proxy)?;
        let proxy = BlobProxy::new(Arc::new(store), options);
        Ok(Self::new(config, proxy))
    }
}
