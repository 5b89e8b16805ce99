// Startup-time discovery and wiring of handler modules
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;

use crate::chain::{Chain, ChainStep};
use crate::error::{ApiFault, RegistrationError};
use crate::handler::{Handler, HandlerParts, HandlerRegistration, HandlerReply};
use crate::logging::Logger;
use crate::registry::{ModelRegistry, SharedModels};
use crate::request::ApiRequest;
use crate::spec::{EndpointSpec, HttpMethod};
use crate::validation::{self, SchemaValidator, ValidationSettings};

/// The authorization capability: a named policy resolves to the middleware
/// enforcing it. `None` means the policy is not recognized.
pub trait Authorizer: Send + Sync {
    fn middleware_for_policy(&self, policy: &str) -> Option<Arc<dyn ChainStep>>;
}

/// The routing layer the registrar attaches chains to, keyed by HTTP
/// method, plus the canonical model set once registration completes.
pub trait RoutingLayer {
    fn add_get(&mut self, chain: Chain);
    fn add_post(&mut self, chain: Chain);
    fn add_put(&mut self, chain: Chain);
    fn add_patch(&mut self, chain: Chain);
    fn add_delete(&mut self, chain: Chain);
    fn add_models(&mut self, registry: ModelRegistry);
}

/// Shared collaborators handed to every handler module. An absent
/// authorizer fails registration of any handler needing one, with advice
/// to upgrade the dependency.
#[derive(Clone)]
pub struct Dependencies {
    pub authorizer: Option<Arc<dyn Authorizer>>,
    pub validator: Arc<dyn SchemaValidator>,
    pub logger: Arc<dyn Logger>,
}

impl Dependencies {
    pub fn new(validator: Arc<dyn SchemaValidator>, logger: Arc<dyn Logger>) -> Self {
        Self { authorizer: None, validator, logger }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }
}

/// One resource: an optional model declaration map and any number of
/// handler modules.
pub struct ResourceModule {
    pub name: String,
    pub models: Option<Map<String, Value>>,
    pub handlers: Vec<HandlerParts>,
}

impl ResourceModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), models: None, handlers: Vec::new() }
    }

    pub fn with_models(mut self, models: Map<String, Value>) -> Self {
        self.models = Some(models);
        self
    }

    pub fn with_handler(mut self, parts: HandlerParts) -> Self {
        self.handlers.push(parts);
        self
    }
}

/// Register every resource: models merge into the registry first, then each
/// handler is validated and attached. Any failure logs the failing module
/// and aborts the whole pass; partial registration never proceeds
/// silently. Returns the accumulated registry, which is also handed to the
/// routing layer as the canonical model set.
pub fn register_resources(
    resources: Vec<ResourceModule>,
    deps: &Dependencies,
    routing: &mut dyn RoutingLayer,
    seed: Option<ModelRegistry>,
) -> Result<ModelRegistry, RegistrationError> {
    let shared = SharedModels::new(seed.unwrap_or_default());

    for resource in resources {
        if let Some(models) = resource.models {
            shared.merge(models);
        }
        for parts in resource.handlers {
            let module = format!("{}/handlers/{}", resource.name, parts.name);
            let outcome = HandlerRegistration::from_parts(parts)
                .and_then(|registration| attach_handler(registration, &shared, deps, routing));
            if let Err(err) = outcome {
                deps.logger.error(
                    "handler registration failed",
                    json!({ "module": module, "error": err.to_string() }),
                );
                return Err(err);
            }
        }
    }

    let registry = shared.snapshot();
    routing.add_models(registry.clone());
    Ok(registry)
}

/// Filesystem front-end honoring the directory layout contract
/// `<base>/<resource>/models/*`: immediate subdirectories are resources,
/// their model declaration files load into the registry, and handler
/// modules are supplied per resource name (handlers are code, not files).
pub fn register_from_dir(
    base: &Path,
    mut handlers_by_resource: std::collections::HashMap<String, Vec<HandlerParts>>,
    deps: &Dependencies,
    routing: &mut dyn RoutingLayer,
    seed: Option<ModelRegistry>,
) -> Result<ModelRegistry, RegistrationError> {
    let load_error = |path: &Path, message: String| {
        let err = RegistrationError::ResourceLoad {
            path: path.display().to_string(),
            message,
        };
        deps.logger.error(
            "resource discovery failed",
            json!({ "path": path.display().to_string(), "error": err.to_string() }),
        );
        err
    };

    let mut entries: Vec<_> = std::fs::read_dir(base)
        .map_err(|e| load_error(base, e.to_string()))?
        .collect::<Result<_, _>>()
        .map_err(|e| load_error(base, e.to_string()))?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut resources = Vec::new();
    for entry in entries {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let mut resource = ResourceModule::new(&name);

        let models_dir = path.join("models");
        if models_dir.is_dir() {
            let models = ModelRegistry::load_dir(&models_dir).map_err(|err| {
                deps.logger.error(
                    "resource discovery failed",
                    json!({
                        "path": models_dir.display().to_string(),
                        "error": err.to_string(),
                    }),
                );
                err
            })?;
            resource.models = Some(models);
        }
        if let Some(handlers) = handlers_by_resource.remove(&name) {
            resource.handlers = handlers;
        }
        resources.push(resource);
    }

    register_resources(resources, deps, routing, seed)
}

/// Wire one validated registration into the routing layer. Delegated
/// registrations run their own function; automatic ones get the full
/// chain: authorization middleware, custom middleware, schema validation,
/// handler, response normalization.
pub fn attach_handler(
    registration: HandlerRegistration,
    models: &SharedModels,
    deps: &Dependencies,
    routing: &mut dyn RoutingLayer,
) -> Result<(), RegistrationError> {
    match registration {
        HandlerRegistration::Delegated { name, register } => {
            register(deps, routing).map_err(|e| RegistrationError::Delegated {
                name,
                message: format!("{e:#}"),
            })
        }
        HandlerRegistration::Automatic {
            name,
            spec,
            policy,
            middleware,
            validation_settings,
            handler,
        } => {
            let method = spec.http_method()?;
            let authorizer = deps
                .authorizer
                .as_ref()
                .ok_or(RegistrationError::AuthorizerUnavailable { name })?;
            let auth_step = authorizer
                .middleware_for_policy(&policy)
                .ok_or(RegistrationError::UnrecognizedPolicy { policy })?;

            let settings = validation_settings
                .map(|overrides| overrides.apply_to(ValidationSettings::default()))
                .unwrap_or_default();
            let wrapped = Arc::new(ValidatingHandler {
                spec: spec.clone(),
                settings,
                validator: deps.validator.clone(),
                models: models.clone(),
                inner: handler,
            });

            let mut steps = vec![auth_step];
            steps.extend(middleware);
            let chain = Chain::new(spec, steps, wrapped, Some(deps.logger.clone()));

            match method {
                HttpMethod::Get => routing.add_get(chain),
                HttpMethod::Post => routing.add_post(chain),
                HttpMethod::Put => routing.add_put(chain),
                HttpMethod::Patch => routing.add_patch(chain),
                HttpMethod::Delete => routing.add_delete(chain),
            }
            Ok(())
        }
    }
}

/// Terminal wrapper: validate the request against the declared spec, then
/// delegate. Error remapping stays with the wrapped handler.
struct ValidatingHandler {
    spec: EndpointSpec,
    settings: ValidationSettings,
    validator: Arc<dyn SchemaValidator>,
    models: SharedModels,
    inner: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for ValidatingHandler {
    async fn handle(&self, req: &mut ApiRequest) -> Result<HandlerReply, ApiFault> {
        let models = self.models.snapshot();
        validation::validate_request(
            self.validator.as_ref(),
            &self.spec,
            &models,
            req,
            &self.settings,
        )?;
        self.inner.handle(req).await
    }

    fn on_handler_error(&self, fault: ApiFault) -> ApiFault {
        self.inner.on_handler_error(fault)
    }
}
