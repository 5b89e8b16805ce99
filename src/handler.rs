// Handler contract and the validating registration factory
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::chain::ChainStep;
use crate::error::{ApiFault, RegistrationError};
use crate::register::{Dependencies, RoutingLayer};
use crate::request::ApiRequest;
use crate::spec::EndpointSpec;
use crate::validation::ValidationOverrides;

/// A handler's success payload, with an optional status override. The
/// override is honored by the normalizer only inside (200, 208].
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerReply {
    pub status: Option<u16>,
    pub body: Value,
}

impl HandlerReply {
    pub fn json(body: Value) -> Self {
        Self { status: None, body }
    }

    pub fn with_status(status: u16, body: Value) -> Self {
        Self { status: Some(status), body }
    }
}

impl From<Value> for HandlerReply {
    fn from(body: Value) -> Self {
        Self::json(body)
    }
}

/// The unit of business logic for one endpoint: request in, payload or
/// fault out.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, req: &mut ApiRequest) -> Result<HandlerReply, ApiFault>;

    /// Remap an error before it reaches the normalizer. The default keeps
    /// the error as-is; a handler may substitute any other fault, including
    /// escalating to or from a validation error.
    fn on_handler_error(&self, fault: ApiFault) -> ApiFault {
        fault
    }
}

/// Escape hatch for handlers needing full control over their own wiring.
pub type RegisterFn =
    Box<dyn Fn(&Dependencies, &mut dyn RoutingLayer) -> anyhow::Result<()> + Send + Sync>;

/// Per-handler configuration as declared by the handler module.
#[derive(Default)]
pub struct HandlerConfiguration {
    /// Named authorization policy; required for automatic registration.
    pub authorization: Option<String>,
    /// Custom middleware, run after authorization and before validation.
    pub middleware: Vec<Arc<dyn ChainStep>>,
    /// Overrides for the default validation behaviors.
    pub validation_settings: Option<ValidationOverrides>,
}

impl HandlerConfiguration {
    pub fn for_policy(policy: impl Into<String>) -> Self {
        Self {
            authorization: Some(policy.into()),
            ..Self::default()
        }
    }

    pub fn with_middleware(mut self, step: Arc<dyn ChainStep>) -> Self {
        self.middleware.push(step);
        self
    }

    pub fn with_validation_settings(mut self, overrides: ValidationOverrides) -> Self {
        self.validation_settings = Some(overrides);
        self
    }
}

/// Everything a handler module exposes, before validation. Built by the
/// module, consumed once by `HandlerRegistration::from_parts`.
pub struct HandlerParts {
    pub name: String,
    pub register: Option<RegisterFn>,
    pub spec: Option<EndpointSpec>,
    pub configuration: Option<HandlerConfiguration>,
    pub handler: Option<Arc<dyn Handler>>,
}

impl HandlerParts {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            register: None,
            spec: None,
            configuration: None,
            handler: None,
        }
    }

    pub fn with_register(mut self, register: RegisterFn) -> Self {
        self.register = Some(register);
        self
    }

    pub fn with_spec(mut self, spec: EndpointSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    pub fn with_configuration(mut self, configuration: HandlerConfiguration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }
}

/// A validated registration, one of two modes. `Delegated` wins when the
/// module provides its own `register` function; otherwise `Automatic`
/// requires the full descriptor contract.
pub enum HandlerRegistration {
    Delegated {
        name: String,
        register: RegisterFn,
    },
    Automatic {
        name: String,
        spec: EndpointSpec,
        policy: String,
        middleware: Vec<Arc<dyn ChainStep>>,
        validation_settings: Option<ValidationOverrides>,
        handler: Arc<dyn Handler>,
    },
}

impl HandlerRegistration {
    /// The validating factory. Every invariant of the descriptor contract
    /// is checked here, once, at startup.
    pub fn from_parts(parts: HandlerParts) -> Result<Self, RegistrationError> {
        let name = parts.name;
        if let Some(register) = parts.register {
            return Ok(HandlerRegistration::Delegated { name, register });
        }

        let spec = parts
            .spec
            .ok_or_else(|| RegistrationError::MissingSpec { name: name.clone() })?;
        let configuration = parts.configuration.ok_or_else(|| {
            RegistrationError::MissingConfiguration { name: name.clone() }
        })?;
        let policy = match configuration.authorization {
            Some(policy) if !policy.is_empty() => policy,
            _ => {
                return Err(RegistrationError::MissingAuthorizationPolicy {
                    name,
                })
            }
        };
        let handler = parts
            .handler
            .ok_or_else(|| RegistrationError::MissingHandler { name: name.clone() })?;

        Ok(HandlerRegistration::Automatic {
            name,
            spec,
            policy,
            middleware: configuration.middleware,
            validation_settings: configuration.validation_settings,
            handler,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            HandlerRegistration::Delegated { name, .. } => name,
            HandlerRegistration::Automatic { name, .. } => name,
        }
    }
}

// Hand-written: the function and handler fields are unprintable.
impl std::fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerRegistration::Delegated { name, .. } => f
                .debug_struct("Delegated")
                .field("name", name)
                .finish_non_exhaustive(),
            HandlerRegistration::Automatic { name, spec, policy, .. } => f
                .debug_struct("Automatic")
                .field("name", name)
                .field("spec", spec)
                .field("policy", policy)
                .finish_non_exhaustive(),
        }
    }
}
