// Short-lived request keys guarding against duplicate in-flight work
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::chain::ChainStep;
use crate::error::{ApiFault, ValidationError};
use crate::request::ApiRequest;

pub const DEFAULT_EXPIRE_MS: u64 = 15_000;

/// Context field holding the key a request claimed, so the handler can
/// release it once the work finishes.
pub const CLAIMED_KEY_FIELD: &str = "claimed_request_key";

/// Backing store for expiring keys. `set_if_absent` must be atomic: it
/// claims the key and schedules its expiry in one operation, returning
/// `false` when somebody else holds it.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn exists(&self, key: &str) -> anyhow::Result<bool>;
    async fn set_if_absent(&self, key: &str, ttl_ms: u64) -> anyhow::Result<bool>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// How a guarded endpoint derives its key and reacts to a collision.
#[derive(Debug, Clone, Default)]
pub struct KeyOptions {
    /// Dotted request lookups whose values identify the unit of work, e.g.
    /// `body.orderId` or `params.accountId`.
    pub lookups: Vec<String>,
    /// Override for the request path component of the key.
    pub path: Option<String>,
    /// Override for the request method component of the key.
    pub method: Option<String>,
    /// Response message on collision.
    pub message: Option<String>,
    /// Only detect a held key, never claim one.
    pub check_only: bool,
    /// Key lifetime; the configured default applies when absent.
    pub expire_ms: Option<u64>,
}

impl KeyOptions {
    pub fn for_lookups(lookups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            lookups: lookups.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Factory for chain steps that reject concurrent duplicates of the same
/// logical request.
#[derive(Clone)]
pub struct ExpiringKeys {
    store: Arc<dyn KeyStore>,
}

impl ExpiringKeys {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    pub fn step(&self, options: KeyOptions) -> Arc<dyn ChainStep> {
        Arc::new(ExpiringKeyStep { store: self.store.clone(), options })
    }

    /// Release a previously claimed key.
    pub async fn clean(&self, key: &str) -> anyhow::Result<()> {
        self.store.delete(key).await
    }
}

struct ExpiringKeyStep {
    store: Arc<dyn KeyStore>,
    options: KeyOptions,
}

impl ExpiringKeyStep {
    /// `key:<path>:<method>:<lookup:value>...`. Returns `None` when any
    /// lookup fails to resolve; the request then passes unguarded rather
    /// than colliding on a garbage key.
    fn build_key(&self, req: &ApiRequest) -> Option<String> {
        if self.options.lookups.is_empty() {
            return None;
        }
        let path = self.options.path.clone().unwrap_or_else(|| req.path.clone());
        let method = self
            .options
            .method
            .clone()
            .unwrap_or_else(|| req.method.clone())
            .to_lowercase();

        let mut parts = Vec::with_capacity(self.options.lookups.len());
        for lookup in &self.options.lookups {
            let value = req.lookup(lookup)?;
            parts.push(format!("{lookup}:{value}"));
        }
        Some(format!("key:{path}:{method}:{}", parts.join(":")))
    }

    /// A duplicate request is client-recoverable: retry once the holder
    /// finishes. Kept out of the fatal log path.
    fn collision(&self) -> ApiFault {
        let message = self
            .options
            .message
            .as_deref()
            .unwrap_or("A blocking key was found");
        ApiFault::from(ValidationError::with_status(
            "DUPLICATE_REQUEST",
            message,
            409,
        ))
    }
}

#[async_trait]
impl ChainStep for ExpiringKeyStep {
    async fn call(&self, req: &mut ApiRequest) -> Result<(), ApiFault> {
        let Some(key) = self.build_key(req) else {
            return Ok(());
        };

        // A store outage must not block traffic; the guard degrades to a
        // pass-through.
        match self.store.exists(&key).await {
            Err(_) => return Ok(()),
            Ok(true) => return Err(self.collision()),
            Ok(false) => {}
        }
        if self.options.check_only {
            return Ok(());
        }

        let ttl = self
            .options
            .expire_ms
            .unwrap_or(crate::config::pipeline_config().default_key_ttl_ms);
        match self.store.set_if_absent(&key, ttl).await {
            Ok(true) => {
                req.context
                    .insert(CLAIMED_KEY_FIELD.to_string(), Value::String(key));
                Ok(())
            }
            Ok(false) => Err(self.collision()),
            Err(_) => Ok(()),
        }
    }
}
