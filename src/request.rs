// Transport-independent request model
use serde_json::{Map, Value};
use std::collections::HashMap;

/// The per-request data handed through the chain. Built once by the routing
/// adapter; middleware may enrich `context` but requests never share state.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    /// Path parameters, by declared name.
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// Header names are stored lowercased.
    pub headers: HashMap<String, String>,
    /// Parsed JSON body; `Null` when the request had none.
    pub body: Value,
    /// Scratch space for middleware (auth context, claimed keys, ...).
    pub context: Map<String, Value>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Resolve a dotted lookup path such as `body.paymentId` or `params.id`.
    /// The first segment names a section of the request; the rest walks into
    /// it. Returns the value's display form, or `None` when any segment is
    /// missing.
    pub fn lookup(&self, path: &str) -> Option<String> {
        let mut segments = path.split('.');
        let section = segments.next()?;
        match section {
            "method" => Some(self.method.clone()),
            "path" => Some(self.path.clone()),
            "params" => self.params.get(segments.next()?).cloned(),
            "query" => self.query.get(segments.next()?).cloned(),
            "headers" => self
                .headers
                .get(&segments.next()?.to_ascii_lowercase())
                .cloned(),
            "body" => walk_value(&self.body, segments),
            "context" => {
                let value = self.context.get(segments.next()?)?;
                walk_value(value, segments)
            }
            _ => None,
        }
    }
}

fn walk_value<'a>(
    root: &Value,
    segments: impl Iterator<Item = &'a str>,
) -> Option<String> {
    let mut current = root;
    for segment in segments {
        current = current.get(segment)?;
    }
    match current {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
