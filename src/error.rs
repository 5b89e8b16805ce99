// Error taxonomy for the request pipeline
use serde_json::{json, Value};
use thiserror::Error;

/// Default error code attached to schema validation failures.
pub const WRONG_DATA: &str = "WRONG_DATA";

/// Substring emitted by the storage engine on unique-index violations.
/// Matches both the "index:" and "collection:" variants of the message.
pub const DUPLICATE_KEY_MARKER: &str = "E11000 duplicate key error";

/// Client-caused, recoverable error. Always carries a status in [400, 599].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: String,
    pub message: String,
    pub status: u16,
}

impl ValidationError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status: 400,
        }
    }

    /// Status override outside [400, 599] falls back to 400.
    pub fn with_status(code: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        let mut err = Self::new(code, message);
        if (400..=599).contains(&status) {
            err.status = status;
        }
        err
    }

    pub fn wrong_data(message: impl Into<String>) -> Self {
        Self::new(WRONG_DATA, message)
    }
}

impl Default for ValidationError {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Classification carried by an error's `type` field, when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    Invalid,
    NotFound,
    Other(String),
}

impl FaultKind {
    pub fn from_type(value: &str) -> Self {
        match value {
            "INVALID" => FaultKind::Invalid,
            "NOT_FOUND" => FaultKind::NotFound,
            other => FaultKind::Other(other.to_string()),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            FaultKind::Invalid => 400,
            FaultKind::NotFound => 404,
            FaultKind::Other(_) => 400,
        }
    }
}

/// Unexpected error: programming or infrastructure fault.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericError {
    pub code: Option<String>,
    pub message: String,
    pub status: Option<u16>,
    pub kind: Option<FaultKind>,
}

impl GenericError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            status: None,
            kind: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        let mut err = Self::new(message);
        err.status = Some(status);
        err
    }

    /// Explicit status wins; else the `type` classification; else 500.
    pub fn status_code(&self) -> u16 {
        if let Some(status) = self.status {
            return status;
        }
        self.kind.as_ref().map(FaultKind::status).unwrap_or(500)
    }

    /// The machine-readable code, falling back to the message.
    pub fn code(&self) -> &str {
        self.code.as_deref().unwrap_or(&self.message)
    }
}

impl std::fmt::Display for GenericError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GenericError {}

/// Any failure flowing through the request pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFault {
    Validation(Vec<ValidationError>),
    Generic(GenericError),
}

impl ApiFault {
    pub fn generic(message: impl Into<String>) -> Self {
        ApiFault::Generic(GenericError::new(message))
    }

    /// Coerce an arbitrary JSON value into a typed fault, the single entry
    /// point for failures coming from dynamic sources (delegated handlers,
    /// storage drivers, foreign middleware).
    ///
    /// A value without a string `message` becomes a generic fault whose
    /// message is the value's display form. An array is a validation fault
    /// only when every element carries the validation marker; otherwise the
    /// whole array is one generic fault. Re-coercing the serialized form of
    /// a fault yields an equal fault.
    pub fn coerce(value: &Value) -> ApiFault {
        if let Some(items) = value.as_array() {
            if items.iter().all(is_validation_value) {
                return ApiFault::Validation(
                    items.iter().map(validation_from_value).collect(),
                );
            }
            return ApiFault::Generic(GenericError::new(display_value(value)));
        }
        if is_validation_value(value) {
            return ApiFault::Validation(vec![validation_from_value(value)]);
        }
        match value.get("message").and_then(Value::as_str) {
            Some(message) => {
                let mut err = GenericError::new(message);
                err.code = value
                    .get("code")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                // A non-numeric status is treated as absent.
                err.status = value
                    .get("status")
                    .and_then(Value::as_u64)
                    .and_then(|s| u16::try_from(s).ok());
                err.kind = value
                    .get("type")
                    .and_then(Value::as_str)
                    .map(FaultKind::from_type);
                ApiFault::Generic(err)
            }
            None => ApiFault::Generic(GenericError::new(display_value(value))),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ApiFault::Validation(_))
    }

    /// A generic fault reporting a storage unique-index violation.
    pub fn is_storage_conflict(&self) -> bool {
        match self {
            ApiFault::Generic(err) => err.message.contains(DUPLICATE_KEY_MARKER),
            ApiFault::Validation(_) => false,
        }
    }

    /// Resolved HTTP status: first element's status for validation faults
    /// (400 when the list is empty), the generic resolution otherwise.
    pub fn status(&self) -> u16 {
        match self {
            ApiFault::Validation(errors) => {
                errors.first().map(|e| e.status).unwrap_or(400)
            }
            ApiFault::Generic(err) => err.status_code(),
        }
    }

    pub fn code(&self) -> String {
        match self {
            ApiFault::Validation(errors) => {
                errors.first().map(|e| e.code.clone()).unwrap_or_default()
            }
            ApiFault::Generic(err) => err.code().to_string(),
        }
    }

    /// All messages joined with ", " for validation faults.
    pub fn message(&self) -> String {
        match self {
            ApiFault::Validation(errors) => errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            ApiFault::Generic(err) => err.message.clone(),
        }
    }

    /// Raw form handed to the fatal log sink.
    pub fn to_value(&self) -> Value {
        match self {
            ApiFault::Validation(errors) => Value::Array(
                errors
                    .iter()
                    .map(|e| {
                        json!({
                            "name": "ValidationError",
                            "code": e.code,
                            "message": e.message,
                            "status": e.status,
                        })
                    })
                    .collect(),
            ),
            ApiFault::Generic(err) => {
                let mut value = json!({ "message": err.message });
                if let Some(code) = &err.code {
                    value["code"] = json!(code);
                }
                if let Some(status) = err.status {
                    value["status"] = json!(status);
                }
                value
            }
        }
    }
}

fn is_validation_value(value: &Value) -> bool {
    let marker = |field: &str| {
        value.get(field).and_then(Value::as_str) == Some("ValidationError")
    };
    marker("name") || marker("type")
}

fn validation_from_value(value: &Value) -> ValidationError {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let status = value
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok())
        .unwrap_or(400);
    ValidationError::with_status(field("code"), field("message"), status)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl std::fmt::Display for ApiFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiFault {}

impl From<ValidationError> for ApiFault {
    fn from(err: ValidationError) -> Self {
        ApiFault::Validation(vec![err])
    }
}

impl From<Vec<ValidationError>> for ApiFault {
    fn from(errors: Vec<ValidationError>) -> Self {
        ApiFault::Validation(errors)
    }
}

impl From<GenericError> for ApiFault {
    fn from(err: GenericError) -> Self {
        ApiFault::Generic(err)
    }
}

impl From<anyhow::Error> for ApiFault {
    fn from(err: anyhow::Error) -> Self {
        ApiFault::Generic(GenericError::new(format!("{err:#}")))
    }
}

impl From<String> for ApiFault {
    fn from(message: String) -> Self {
        ApiFault::generic(message)
    }
}

impl From<&str> for ApiFault {
    fn from(message: &str) -> Self {
        ApiFault::generic(message)
    }
}

/// Startup-time wiring failures. These abort registration of the module
/// that raised them; they never reach the request path.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(
        "{name} has no OpenAPI specification. The handler must provide a spec \
         describing the endpoint."
    )]
    MissingSpec { name: String },

    #[error(
        "{name} has no configuration. The handler must provide a configuration \
         carrying an authorization policy."
    )]
    MissingConfiguration { name: String },

    #[error(
        "{name} has no authorization policy. The configuration must carry an \
         'authorization' property describing how requests should be authorized."
    )]
    MissingAuthorizationPolicy { name: String },

    #[error(
        "{name} has no handler function. The handler must provide the function \
         which will receive incoming requests."
    )]
    MissingHandler { name: String },

    #[error("Unrecognized authorization policy: {policy}")]
    UnrecognizedPolicy { policy: String },

    #[error(
        "{name} cannot be registered: the authorization dependency does not \
         provide policy middleware. Upgrade it to a version that does."
    )]
    AuthorizerUnavailable { name: String },

    #[error("Handler spec has unrecognized HTTP method \"{method}\"")]
    UnrecognizedHttpMethod { method: String },

    #[error("failed to load {path}: {message}")]
    ResourceLoad { path: String, message: String },

    #[error("{name} failed to register: {message}")]
    Delegated { name: String, message: String },
}
