// Request validation against the declared endpoint spec
pub mod patterns;
pub mod settings;

pub use settings::{AdditionalProperties, ValidationOverrides, ValidationSettings};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiFault, GenericError, ValidationError, WRONG_DATA};
use crate::registry::ModelRegistry;
use crate::request::ApiRequest;
use crate::spec::EndpointSpec;

/// One failure reported by the schema validation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaFailure {
    pub message: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl SchemaFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: String::new(),
            failed_value: None,
            code: None,
        }
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.failed_value = Some(value);
        self
    }
}

/// The two return shapes observed across engine versions: a plain failure
/// list, or a report object wrapping an `errors` list. Both normalize to
/// the same thing.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatorOutput {
    Failures(Vec<SchemaFailure>),
    Report { errors: Vec<SchemaFailure> },
}

impl ValidatorOutput {
    pub fn into_failures(self) -> Vec<SchemaFailure> {
        match self {
            ValidatorOutput::Failures(failures) => failures,
            ValidatorOutput::Report { errors } => errors,
        }
    }

    pub fn clean() -> Self {
        ValidatorOutput::Failures(Vec::new())
    }
}

/// The schema validation engine. Given a spec fragment, a request and a
/// model dictionary it reports failures, or errors out entirely. Engines
/// are known to mutate the model dictionary they are given, which is why
/// `validate_request` always hands over a scratch copy.
pub trait SchemaValidator: Send + Sync {
    fn validate(
        &self,
        spec: &EndpointSpec,
        request: &ApiRequest,
        models: &mut ModelRegistry,
        settings: &ValidationSettings,
    ) -> Result<ValidatorOutput, GenericError>;
}

/// Run a request through the engine and raise a typed validation fault on
/// failure. In improved-message mode all failures collapse into one
/// `WRONG_DATA` error with enriched, comma-joined text; in legacy mode each
/// failure becomes its own error.
pub fn validate_request(
    validator: &dyn SchemaValidator,
    spec: &EndpointSpec,
    models: &ModelRegistry,
    request: &ApiRequest,
    settings: &ValidationSettings,
) -> Result<(), ApiFault> {
    // Scratch copy: repeated requests must not observe engine mutations.
    let mut scratch = models.clone();
    let failures = validator
        .validate(spec, request, &mut scratch, settings)
        .map_err(ApiFault::Generic)?
        .into_failures();

    if failures.is_empty() {
        return Ok(());
    }

    let errors = if settings.improved_error_messages {
        let message = failures
            .iter()
            .map(enriched_message)
            .collect::<Vec<_>>()
            .join(", ");
        vec![ValidationError::wrong_data(message)]
    } else {
        failures
            .into_iter()
            .map(|failure| {
                let code = failure.code.unwrap_or_else(|| WRONG_DATA.to_string());
                ValidationError::new(code, failure.message)
            })
            .collect()
    };
    Err(ApiFault::Validation(errors))
}

fn enriched_message(failure: &SchemaFailure) -> String {
    let value = failure.failed_value.as_ref().map(|v| match v {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    });
    match (value, failure.path.is_empty()) {
        (Some(value), false) => {
            format!("{} - got {} in {}", failure.message, value, failure.path)
        }
        (Some(value), true) => format!("{} - got {}", failure.message, value),
        (None, false) => format!("{} in {}", failure.message, failure.path),
        (None, true) => failure.message.clone(),
    }
}
