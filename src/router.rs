// Axum adapter: chains become routes, BufferedResponse becomes a response
use axum::body::Body;
use axum::extract::{Path, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, on, MethodFilter};
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::chain::Chain;
use crate::config::pipeline_config;
use crate::error::{ApiFault, GenericError, ValidationError};
use crate::register::RoutingLayer;
use crate::registry::ModelRegistry;
use crate::request::ApiRequest;
use crate::response::BufferedResponse;

/// Routing layer backed by an axum `Router`. Collects the declared
/// endpoint specs and the model registry as chains are attached, and
/// serves both from `/api-docs`.
#[derive(Default)]
pub struct AxumRouting {
    router: Router,
    specs: Vec<Value>,
    models: ModelRegistry,
}

impl AxumRouting {
    pub fn new() -> Self {
        Self::default()
    }

    /// The assembled router, with the documentation route and the standard
    /// trace and CORS layers applied.
    pub fn into_router(self) -> Router {
        let docs = json!({ "apis": self.specs, "models": self.models.models });
        self.router
            .route("/api-docs", get(move || {
                let docs = docs.clone();
                async move { Json(docs) }
            }))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    fn attach(&mut self, filter: MethodFilter, chain: Chain) {
        let route = axum_path(&chain.spec().path);
        self.specs.push(
            serde_json::to_value(chain.spec()).unwrap_or(Value::Null),
        );
        let chain = Arc::new(chain);
        let handler = move |Path(params): Path<HashMap<String, String>>, req: Request| {
            let chain = chain.clone();
            async move { dispatch(chain, params, req).await }
        };
        self.router = std::mem::take(&mut self.router).route(&route, on(filter, handler));
    }
}

impl RoutingLayer for AxumRouting {
    fn add_get(&mut self, chain: Chain) {
        self.attach(MethodFilter::GET, chain);
    }

    fn add_post(&mut self, chain: Chain) {
        self.attach(MethodFilter::POST, chain);
    }

    fn add_put(&mut self, chain: Chain) {
        self.attach(MethodFilter::PUT, chain);
    }

    fn add_patch(&mut self, chain: Chain) {
        self.attach(MethodFilter::PATCH, chain);
    }

    fn add_delete(&mut self, chain: Chain) {
        self.attach(MethodFilter::DELETE, chain);
    }

    fn add_models(&mut self, registry: ModelRegistry) {
        self.models = registry;
    }
}

/// Declared paths use `{name}` placeholders; axum wants `:name`.
fn axum_path(declared: &str) -> String {
    declared
        .split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2 {
                format!(":{}", &segment[1..segment.len() - 1])
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

async fn dispatch(
    chain: Arc<Chain>,
    params: HashMap<String, String>,
    req: Request,
) -> Response {
    if pipeline_config().log_requests {
        debug!(method = %req.method(), path = %req.uri().path(), "dispatching request");
    }

    let mut api_req = match build_request(params, req).await {
        Ok(req) => req,
        Err(fault) => {
            let mut reply = BufferedResponse::new();
            crate::response::error(&mut reply, None, &fault);
            return into_response(reply);
        }
    };

    let mut reply = BufferedResponse::new();
    chain.run(&mut api_req, &mut reply).await;
    into_response(reply)
}

async fn build_request(
    params: HashMap<String, String>,
    req: Request,
) -> Result<ApiRequest, ApiFault> {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();

    let mut query = HashMap::new();
    if let Some(raw) = req.uri().query() {
        for (name, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            query.insert(name.into_owned(), value.into_owned());
        }
    }

    let mut headers = HashMap::new();
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
        }
    }

    let bytes = axum::body::to_bytes(req.into_body(), pipeline_config().max_body_bytes)
        .await
        .map_err(|_| {
            ApiFault::Generic(GenericError::with_status("Request body too large", 413))
        })?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).map_err(|_| {
            ApiFault::from(ValidationError::wrong_data("Request body is not valid JSON"))
        })?
    };

    let mut api_req = ApiRequest::new(method, path).with_body(body);
    api_req.params = params;
    api_req.query = query;
    api_req.headers = headers;
    Ok(api_req)
}

fn into_response(reply: BufferedResponse) -> Response {
    let status =
        StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match reply.body {
        Some(body) => (status, Json(body)).into_response(),
        None => (status, Body::empty()).into_response(),
    }
}
