pub mod chain;
pub mod config;
pub mod error;
pub mod expiring;
pub mod handler;
pub mod logging;
pub mod pagination;
pub mod register;
pub mod registry;
pub mod request;
pub mod response;
pub mod router;
pub mod spec;
pub mod validation;

pub use chain::{AuthKind, Chain, ChainStep};
pub use error::{ApiFault, FaultKind, GenericError, RegistrationError, ValidationError};
pub use handler::{Handler, HandlerConfiguration, HandlerParts, HandlerRegistration, HandlerReply};
pub use register::{Authorizer, Dependencies, ResourceModule, RoutingLayer};
pub use registry::{ModelRegistry, SharedModels};
pub use request::ApiRequest;
pub use response::BufferedResponse;
pub use spec::{EndpointSpec, HttpMethod, SecurityRequirement, SpecParameter};
pub use validation::{SchemaValidator, ValidationOverrides, ValidationSettings, ValidatorOutput};
