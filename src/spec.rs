// Endpoint specification types
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;

use crate::error::RegistrationError;

/// Declarative description of one endpoint: method, path, parameters and
/// expected responses. Declared by the handler; immutable after
/// registration apart from the derived `security` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<SpecParameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub responses: Map<String, Value>,
    /// Filled at registration from the chain's authorization middleware.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Value>,
}

impl EndpointSpec {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            nickname: None,
            summary: None,
            parameters: Vec::new(),
            produces: vec!["application/json".to_string()],
            responses: Map::new(),
            security: None,
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_parameter(mut self, parameter: SpecParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_response(mut self, status: u16, schema: Value) -> Self {
        self.responses.insert(status.to_string(), schema);
        self
    }

    /// The parsed HTTP method; an unrecognized method is a registration-time
    /// fatal error.
    pub fn http_method(&self) -> Result<HttpMethod, RegistrationError> {
        self.method.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecParameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SpecParameter {
    pub fn body(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            location: "body".to_string(),
            required: true,
            schema: Some(schema),
            param_type: None,
            description: None,
        }
    }

    pub fn path(name: impl Into<String>, param_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: "path".to_string(),
            required: true,
            schema: None,
            param_type: Some(param_type.into()),
            description: None,
        }
    }

    pub fn query(name: impl Into<String>, param_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: "query".to_string(),
            required: false,
            schema: None,
            param_type: Some(param_type.into()),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = RegistrationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(RegistrationError::UnrecognizedHttpMethod {
                method: value.to_string(),
            }),
        }
    }
}

/// Mutually exclusive security modes a chain can declare, derived from the
/// `AuthKind` its authorization middleware reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityRequirement {
    ApiKey,
    ApiKeyJwt,
    ApiKeyBasic,
}

impl SecurityRequirement {
    pub fn schemes(&self) -> &'static [&'static str] {
        match self {
            SecurityRequirement::ApiKey => &["ApiKeyAuth"],
            SecurityRequirement::ApiKeyJwt => &["ApiKeyAuth", "JwtAuth"],
            SecurityRequirement::ApiKeyBasic => &["ApiKeyAuth", "BasicAuth"],
        }
    }

    /// OpenAPI security requirement: one object requiring every scheme.
    pub fn to_value(&self) -> Value {
        let mut requirement = Map::new();
        for scheme in self.schemes() {
            requirement.insert(scheme.to_string(), json!([]));
        }
        Value::Array(vec![Value::Object(requirement)])
    }
}

/// Schema fragments shared by endpoint declarations.
pub mod schemas {
    use super::*;

    /// The stable error wire contract: `{"code", "message"}`.
    pub fn error_response() -> Value {
        json!({
            "id": "ErrorResponse",
            "required": ["code", "message"],
            "properties": {
                "code": {
                    "type": "string",
                    "description": "A string identifying the specific error."
                },
                "message": {
                    "type": "string",
                    "description": "English description of the error, usually \
                        including some information on what caused it."
                }
            }
        })
    }

    /// Properties every paginated response carries.
    pub fn default_paging_props() -> Value {
        json!({
            "next": {
                "type": "string",
                "description": "A URL pointing to the next page of results, or \
                    an empty string when no more results are available."
            },
            "previous": {
                "type": "string",
                "description": "A URL pointing to the previous page of results, \
                    or an empty string when already on the first page."
            },
            "count": {
                "type": "integer",
                "format": "int32",
                "description": "The total number of results across all pages."
            }
        })
    }
}
