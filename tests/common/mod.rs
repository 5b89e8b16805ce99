// Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use routewire::chain::{step_fn, Chain, ChainStep};
use routewire::error::{ApiFault, GenericError};
use routewire::handler::{Handler, HandlerReply};
use routewire::logging::Logger;
use routewire::register::{Authorizer, Dependencies, RoutingLayer};
use routewire::registry::ModelRegistry;
use routewire::request::ApiRequest;
use routewire::spec::EndpointSpec;
use routewire::validation::{
    SchemaFailure, SchemaValidator, ValidationSettings, ValidatorOutput,
};

/// Logger capturing every entry for later assertions.
#[derive(Default)]
pub struct RecordingLogger {
    pub entries: Mutex<Vec<(String, String, Value)>>,
}

impl RecordingLogger {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries_for(&self, level: &str) -> Vec<(String, Value)> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _, _)| l == level)
            .map(|(_, message, meta)| (message.clone(), meta.clone()))
            .collect()
    }

    fn record(&self, level: &str, message: &str, meta: Value) {
        self.entries
            .lock()
            .unwrap()
            .push((level.to_string(), message.to_string(), meta));
    }
}

impl Logger for RecordingLogger {
    fn debug(&self, message: &str, meta: Value) {
        self.record("debug", message, meta);
    }

    fn info(&self, message: &str, meta: Value) {
        self.record("info", message, meta);
    }

    fn error(&self, message: &str, meta: Value) {
        self.record("error", message, meta);
    }

    fn fatal(&self, message: &str, meta: Value) {
        self.record("fatal", message, meta);
    }
}

/// Validation engine stub reporting a fixed set of failures.
pub struct StubValidator {
    pub failures: Vec<SchemaFailure>,
    pub seen_models: Mutex<Vec<ModelRegistry>>,
}

impl StubValidator {
    pub fn passing() -> Arc<Self> {
        Arc::new(Self { failures: Vec::new(), seen_models: Mutex::new(Vec::new()) })
    }

    pub fn failing(failures: Vec<SchemaFailure>) -> Arc<Self> {
        Arc::new(Self { failures, seen_models: Mutex::new(Vec::new()) })
    }
}

impl SchemaValidator for StubValidator {
    fn validate(
        &self,
        _spec: &EndpointSpec,
        _request: &ApiRequest,
        models: &mut ModelRegistry,
        _settings: &ValidationSettings,
    ) -> Result<ValidatorOutput, GenericError> {
        self.seen_models.lock().unwrap().push(models.clone());
        Ok(ValidatorOutput::Failures(self.failures.clone()))
    }
}

/// Authorizer recognizing a fixed list of policies, each resolving to a
/// pass-through step.
pub struct StaticAuthorizer {
    policies: Vec<String>,
}

impl StaticAuthorizer {
    pub fn with_policies(policies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            policies: policies.iter().map(|p| p.to_string()).collect(),
        })
    }
}

impl Authorizer for StaticAuthorizer {
    fn middleware_for_policy(&self, policy: &str) -> Option<Arc<dyn ChainStep>> {
        if self.policies.iter().any(|p| p == policy) {
            Some(step_fn(|_req| Ok(())))
        } else {
            None
        }
    }
}

/// Routing layer collecting attached chains by method, for assertions
/// without a real HTTP stack.
#[derive(Default)]
pub struct CollectingRouting {
    pub chains: Vec<(&'static str, Chain)>,
    pub models: Option<ModelRegistry>,
}

impl RoutingLayer for CollectingRouting {
    fn add_get(&mut self, chain: Chain) {
        self.chains.push(("GET", chain));
    }

    fn add_post(&mut self, chain: Chain) {
        self.chains.push(("POST", chain));
    }

    fn add_put(&mut self, chain: Chain) {
        self.chains.push(("PUT", chain));
    }

    fn add_patch(&mut self, chain: Chain) {
        self.chains.push(("PATCH", chain));
    }

    fn add_delete(&mut self, chain: Chain) {
        self.chains.push(("DELETE", chain));
    }

    fn add_models(&mut self, registry: ModelRegistry) {
        self.models = Some(registry);
    }
}

/// Handler replying with a fixed body.
pub struct StaticHandler {
    pub reply: Value,
}

impl StaticHandler {
    pub fn replying(reply: Value) -> Arc<Self> {
        Arc::new(Self { reply })
    }

    pub fn ok() -> Arc<Self> {
        Self::replying(json!({"ok": true}))
    }
}

#[async_trait]
impl Handler for StaticHandler {
    async fn handle(&self, _req: &mut ApiRequest) -> Result<HandlerReply, ApiFault> {
        Ok(HandlerReply::json(self.reply.clone()))
    }
}

/// Handler echoing back the request body, params and query.
pub struct EchoHandler;

impl EchoHandler {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl Handler for EchoHandler {
    async fn handle(&self, req: &mut ApiRequest) -> Result<HandlerReply, ApiFault> {
        Ok(HandlerReply::json(json!({
            "body": req.body,
            "params": req.params,
            "query": req.query,
        })))
    }
}

/// Handler failing with a configured fault.
pub struct FailingHandler {
    pub fault: ApiFault,
}

impl FailingHandler {
    pub fn with_fault(fault: ApiFault) -> Arc<Self> {
        Arc::new(Self { fault })
    }
}

#[async_trait]
impl Handler for FailingHandler {
    async fn handle(&self, _req: &mut ApiRequest) -> Result<HandlerReply, ApiFault> {
        Err(self.fault.clone())
    }
}

/// In-memory expiring-key store. Ignores TTLs; tests release keys
/// explicitly.
#[derive(Default)]
pub struct MemoryKeyStore {
    pub held: Mutex<std::collections::HashSet<String>>,
}

#[async_trait]
impl routewire::expiring::KeyStore for MemoryKeyStore {
    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.held.lock().unwrap().contains(key))
    }

    async fn set_if_absent(&self, key: &str, _ttl_ms: u64) -> anyhow::Result<bool> {
        Ok(self.held.lock().unwrap().insert(key.to_string()))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.held.lock().unwrap().remove(key);
        Ok(())
    }
}

pub fn dependencies(
    validator: Arc<dyn SchemaValidator>,
    logger: Arc<RecordingLogger>,
) -> Dependencies {
    Dependencies::new(validator, logger)
        .with_authorizer(StaticAuthorizer::with_policies(&["open", "admin"]))
}

pub fn models(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(name, schema)| (name.to_string(), schema.clone()))
        .collect()
}

pub fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
