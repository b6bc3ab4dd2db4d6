//! Blocking client for the IPFS daemon RPC API.
//!
//! Only two endpoints are used: `add` to publish a document and `cat` to
//! read one back. Both are `POST` requests as the RPC API requires.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use vdict_types::Cid;

use crate::cache::CachedStore;
use crate::config::StoreConfig;
use crate::encoding::{decode_value, encode_document};
use crate::error::{StoreError, StoreResult};
use crate::traits::{ContentStore, Document};

/// Response body of `/api/v0/add`.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// [`ContentStore`] backed by an IPFS daemon.
pub struct IpfsHttpStore {
    client: Client,
    api_base: String,
}

impl IpfsHttpStore {
    /// Build a client for the daemon described by `config`.
    ///
    /// No request is made here; an unreachable daemon surfaces on the first
    /// `put` or `get`.
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_base: config.api_base(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn add_url(&self) -> String {
        format!("{}/api/v0/add", self.api_base)
    }

    fn cat_url(&self, cid: &Cid) -> String {
        format!("{}/api/v0/cat?arg={}", self.api_base, cid.long())
    }
}

impl ContentStore for IpfsHttpStore {
    fn put(&self, document: &Document) -> StoreResult<Cid> {
        let bytes = encode_document(document)?;
        let size = bytes.len();
        let part = multipart::Part::bytes(bytes)
            .file_name("document.json")
            .mime_str("application/json")
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.add_url())
            .multipart(form)
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Transport(format!("add failed ({status}): {body}")));
        }

        let added: AddResponse = response
            .json()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let cid = Cid::new(&added.hash)?;
        debug!(cid = %cid.short_id(), size, "published document to daemon");
        Ok(cid)
    }

    fn get(&self, cid: &Cid) -> StoreResult<Value> {
        let response = self
            .client
            .post(self.cat_url(cid))
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_failure(cid, &status.to_string(), &body));
        }

        let bytes = response
            .bytes()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        debug!(cid = %cid.short_id(), size = bytes.len(), "fetched document from daemon");
        decode_value(&bytes)
    }
}

impl std::fmt::Debug for IpfsHttpStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpfsHttpStore")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Map a failed `cat` reply to a store error.
///
/// The daemon reports a missing block as a generic 500 whose message
/// mentions "not found"; anything else is a transport failure.
fn classify_failure(cid: &Cid, status: &str, body: &str) -> StoreError {
    if body.to_ascii_lowercase().contains("not found") {
        StoreError::NotFound(cid.clone())
    } else {
        StoreError::Transport(format!("cat {cid} failed ({status}): {body}"))
    }
}

/// Open a store for the daemon described by `config`, cached if requested.
pub fn connect(config: &StoreConfig) -> StoreResult<Arc<dyn ContentStore>> {
    let store = IpfsHttpStore::new(config)?;
    info!(api = %store.api_base(), cache = config.cache, "using IPFS daemon");
    if config.cache {
        Ok(Arc::new(CachedStore::new(store)))
    } else {
        Ok(Arc::new(store))
    }
}
