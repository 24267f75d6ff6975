//! Client for the hierarchical JSON store holding monitoring records.
//!
//! Every node is addressed by a slash-separated path and read with
//! `GET <base>/<path>.json`, optionally `?shallow=true` to list child keys
//! without their contents. A `null` body (absent node) reads as an empty map.

use crate::error::RemoteError;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

/// Default remote database.
pub const DEFAULT_BASE_URL: &str = "https://sudepmonitor.firebaseio.com/";

/// A source of JSON mappings addressed by path.
pub trait RemoteStore {
    /// Read the node at `path`. Absent nodes read as an empty map.
    fn read(&self, path: &str, shallow: bool) -> Result<Map<String, Value>, RemoteError>;
}

/// Remote store configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the database
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Full URL for a node.
    pub fn node_url(&self, path: &str, shallow: bool) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_matches('/');
        if shallow {
            format!("{base}/{path}.json?shallow=true")
        } else {
            format!("{base}/{path}.json")
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, Duration::from_secs(30))
    }
}

/// Normalize a decoded body into a mapping.
pub fn normalize_body(body: Value) -> Result<Map<String, Value>, RemoteError> {
    match body {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(RemoteError::Decode(format!(
            "expected an object, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Async HTTP client for the remote store.
pub struct FirebaseClient {
    config: RemoteConfig,
    client: reqwest::Client,
}

impl FirebaseClient {
    /// Create a new client.
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Fetch the node at `path`.
    pub async fn read(
        &self,
        path: &str,
        shallow: bool,
    ) -> Result<Map<String, Value>, RemoteError> {
        let url = self.config.node_url(path, shallow);
        tracing::debug!(%url, "reading remote node");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RemoteError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        normalize_body(body)
    }
}

/// Blocking remote store for synchronous callers.
pub struct BlockingFirebaseStore {
    inner: FirebaseClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingFirebaseStore {
    /// Create a new blocking store.
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RemoteError::Runtime(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: FirebaseClient::new(config)?,
            runtime,
        })
    }
}

impl RemoteStore for BlockingFirebaseStore {
    fn read(&self, path: &str, shallow: bool) -> Result<Map<String, Value>, RemoteError> {
        self.runtime.block_on(self.inner.read(path, shallow))
    }
}

/// A store backed by an in-memory JSON tree, such as a database export.
///
/// Records every path it is asked for, in order.
#[derive(Debug, Default)]
pub struct JsonTreeStore {
    root: Value,
    reads: RefCell<Vec<String>>,
}

impl JsonTreeStore {
    pub fn new(root: Value) -> Self {
        Self {
            root,
            reads: RefCell::new(Vec::new()),
        }
    }

    /// Load a JSON export from disk.
    pub fn from_file(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RemoteError::Network(format!("Failed to read {path:?}: {e}")))?;
        let root = serde_json::from_str(&content).map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Self::new(root))
    }

    /// Paths read so far.
    pub fn reads(&self) -> Vec<String> {
        self.reads.borrow().clone()
    }

    fn node(&self, path: &str) -> Option<&Value> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(&self.root, |node, segment| node.get(segment))
    }
}

impl RemoteStore for JsonTreeStore {
    fn read(&self, path: &str, shallow: bool) -> Result<Map<String, Value>, RemoteError> {
        self.reads.borrow_mut().push(path.to_string());

        let node = self.node(path).cloned().unwrap_or(Value::Null);
        let map = normalize_body(node)?;
        if shallow {
            Ok(map.into_iter().map(|(k, _)| (k, Value::Bool(true))).collect())
        } else {
            Ok(map)
        }
    }
}
