// Ordered middleware execution with short-circuit error normalization
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

use crate::error::ApiFault;
use crate::handler::Handler;
use crate::logging::Logger;
use crate::request::ApiRequest;
use crate::response::{self, ResponseWriter};
use crate::spec::{EndpointSpec, SecurityRequirement};

/// What kind of authenticator a middleware is, declared by the middleware
/// itself rather than inferred from its implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthKind {
    #[default]
    None,
    ApiKey,
    Jwt,
    Basic,
}

/// One non-terminal member of a chain. A step completes exactly once, by
/// returning: `Ok(())` continues the chain, `Err` aborts it straight into
/// the error normalizer.
#[async_trait]
pub trait ChainStep: Send + Sync {
    async fn call(&self, req: &mut ApiRequest) -> Result<(), ApiFault>;

    fn auth_kind(&self) -> AuthKind {
        AuthKind::None
    }
}

/// Adapter for synchronous middleware closures.
pub struct FnStep<F>(F);

#[async_trait]
impl<F> ChainStep for FnStep<F>
where
    F: Fn(&mut ApiRequest) -> Result<(), ApiFault> + Send + Sync,
{
    async fn call(&self, req: &mut ApiRequest) -> Result<(), ApiFault> {
        (self.0)(req)
    }
}

pub fn step_fn<F>(f: F) -> Arc<dyn ChainStep>
where
    F: Fn(&mut ApiRequest) -> Result<(), ApiFault> + Send + Sync + 'static,
{
    Arc::new(FnStep(f))
}

/// Adapter for asynchronous middleware closures.
pub struct AsyncFnStep<F>(F);

#[async_trait]
impl<F> ChainStep for AsyncFnStep<F>
where
    F: for<'a> Fn(&'a mut ApiRequest) -> BoxFuture<'a, Result<(), ApiFault>>
        + Send
        + Sync,
{
    async fn call(&self, req: &mut ApiRequest) -> Result<(), ApiFault> {
        (self.0)(req).await
    }
}

pub fn async_step_fn<F>(f: F) -> Arc<dyn ChainStep>
where
    F: for<'a> Fn(&'a mut ApiRequest) -> BoxFuture<'a, Result<(), ApiFault>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(AsyncFnStep(f))
}

/// The wired, request-ready unit attached to the routing layer: ordered
/// steps, one terminal handler, and the declared spec augmented with the
/// derived security requirement. Immutable; holds no per-request state, so
/// any number of requests may run against it concurrently.
pub struct Chain {
    spec: EndpointSpec,
    security: SecurityRequirement,
    steps: Vec<Arc<dyn ChainStep>>,
    terminal: Arc<dyn Handler>,
    logger: Option<Arc<dyn Logger>>,
}

impl Chain {
    pub fn new(
        mut spec: EndpointSpec,
        steps: Vec<Arc<dyn ChainStep>>,
        terminal: Arc<dyn Handler>,
        logger: Option<Arc<dyn Logger>>,
    ) -> Self {
        let security = derive_security(&steps);
        spec.security = Some(security.to_value());
        Self { spec, security, steps, terminal, logger }
    }

    pub fn spec(&self) -> &EndpointSpec {
        &self.spec
    }

    pub fn security(&self) -> SecurityRequirement {
        self.security
    }

    /// Execute the chain for one request. Steps run strictly in order; the
    /// first error short-circuits past the remaining steps and the terminal
    /// handler. A terminal error first passes through the handler's own
    /// `on_handler_error` remapping.
    pub async fn run(&self, req: &mut ApiRequest, res: &mut dyn ResponseWriter) {
        let logger = self.logger.as_deref();
        for step in &self.steps {
            if let Err(fault) = step.call(req).await {
                response::error(res, logger, &fault);
                return;
            }
        }
        match self.terminal.handle(req).await {
            Ok(reply) => response::success(res, reply.status, reply.body),
            Err(fault) => {
                let fault = self.terminal.on_handler_error(fault);
                response::error(res, logger, &fault);
            }
        }
    }
}

/// Exactly one security mode per chain, from the steps' declared kinds.
/// JWT wins over Basic regardless of position; the default is API key only.
fn derive_security(steps: &[Arc<dyn ChainStep>]) -> SecurityRequirement {
    let mut basic = false;
    for step in steps {
        match step.auth_kind() {
            AuthKind::Jwt => return SecurityRequirement::ApiKeyJwt,
            AuthKind::Basic => basic = true,
            AuthKind::None | AuthKind::ApiKey => {}
        }
    }
    if basic {
        SecurityRequirement::ApiKeyBasic
    } else {
        SecurityRequirement::ApiKey
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::handler::HandlerReply;
    use crate::response::BufferedResponse;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records the order in which chain members ran.
    #[derive(Default)]
    struct Trace(Mutex<Vec<&'static str>>);

    impl Trace {
        fn push(&self, name: &'static str) {
            self.0.lock().unwrap().push(name);
        }

        fn seen(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }
    }

    struct TracingStep {
        name: &'static str,
        trace: Arc<Trace>,
        fail: bool,
        kind: AuthKind,
    }

    #[async_trait]
    impl ChainStep for TracingStep {
        async fn call(&self, _req: &mut ApiRequest) -> Result<(), ApiFault> {
            self.trace.push(self.name);
            if self.fail {
                Err(ApiFault::generic("an errr"))
            } else {
                Ok(())
            }
        }

        fn auth_kind(&self) -> AuthKind {
            self.kind
        }
    }

    struct TracingHandler {
        trace: Arc<Trace>,
        outcome: Result<HandlerReply, ApiFault>,
    }

    #[async_trait]
    impl Handler for TracingHandler {
        async fn handle(&self, _req: &mut ApiRequest) -> Result<HandlerReply, ApiFault> {
            self.trace.push("terminal");
            self.outcome.clone()
        }
    }

    fn step(trace: &Arc<Trace>, name: &'static str, fail: bool) -> Arc<dyn ChainStep> {
        Arc::new(TracingStep { name, trace: trace.clone(), fail, kind: AuthKind::None })
    }

    fn auth_step(trace: &Arc<Trace>, kind: AuthKind) -> Arc<dyn ChainStep> {
        Arc::new(TracingStep { name: "auth", trace: trace.clone(), fail: false, kind })
    }

    fn chain(
        steps: Vec<Arc<dyn ChainStep>>,
        trace: &Arc<Trace>,
        outcome: Result<HandlerReply, ApiFault>,
    ) -> Chain {
        Chain::new(
            EndpointSpec::new("POST", "/some-endpoint"),
            steps,
            Arc::new(TracingHandler { trace: trace.clone(), outcome }),
            None,
        )
    }

    #[tokio::test]
    async fn steps_run_in_order_before_the_terminal() {
        let trace = Arc::new(Trace::default());
        let chain = chain(
            vec![step(&trace, "mw1", false), step(&trace, "mw2", false)],
            &trace,
            Ok(HandlerReply::json(json!("Some endpoint response"))),
        );
        let mut req = ApiRequest::new("POST", "/some-endpoint");
        let mut res = BufferedResponse::new();
        chain.run(&mut req, &mut res).await;

        assert_eq!(trace.seen(), vec!["mw1", "mw2", "terminal"]);
        assert_eq!(res.status, 200);
        assert_eq!(res.body, Some(json!("Some endpoint response")));
    }

    #[tokio::test]
    async fn a_failing_step_short_circuits_the_rest() {
        let trace = Arc::new(Trace::default());
        let chain = chain(
            vec![step(&trace, "mw1", true), step(&trace, "mw2", false)],
            &trace,
            Ok(HandlerReply::json(Value::Null)),
        );
        let mut req = ApiRequest::new("POST", "/some-endpoint");
        let mut res = BufferedResponse::new();
        chain.run(&mut req, &mut res).await;

        assert_eq!(trace.seen(), vec!["mw1"]);
        assert_eq!(res.status, 500);
        assert_eq!(res.body, Some(json!({"code": "an errr", "message": "an errr"})));
    }

    #[tokio::test]
    async fn terminal_errors_reach_the_normalizer() {
        let trace = Arc::new(Trace::default());
        let chain = chain(
            Vec::new(),
            &trace,
            Err(ApiFault::from(ValidationError::new("SOME_CODE", "bad input"))),
        );
        let mut req = ApiRequest::new("POST", "/some-endpoint");
        let mut res = BufferedResponse::new();
        chain.run(&mut req, &mut res).await;

        assert_eq!(res.status, 400);
        assert_eq!(
            res.body,
            Some(json!({"code": "SOME_CODE", "message": "bad input"}))
        );
    }

    #[tokio::test]
    async fn async_steps_suspend_without_losing_order() {
        let trace = Arc::new(Trace::default());
        let async_trace = trace.clone();
        let waited = Arc::new(AtomicUsize::new(0));
        let waited_in_step = waited.clone();
        let steps: Vec<Arc<dyn ChainStep>> = vec![async_step_fn(move |_req| {
            let trace = async_trace.clone();
            let waited = waited_in_step.clone();
            Box::pin(async move {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                waited.fetch_add(1, Ordering::SeqCst);
                trace.push("slow");
                Ok(())
            })
        })];
        let chain = chain(steps, &trace, Ok(HandlerReply::json(json!(1))));
        let mut req = ApiRequest::new("GET", "/slow");
        let mut res = BufferedResponse::new();
        chain.run(&mut req, &mut res).await;

        assert_eq!(trace.seen(), vec!["slow", "terminal"]);
        assert_eq!(waited.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn security_defaults_to_api_key_only() {
        let trace = Arc::new(Trace::default());
        let chain = chain(
            vec![step(&trace, "mw1", false)],
            &trace,
            Ok(HandlerReply::json(Value::Null)),
        );
        assert_eq!(chain.security(), SecurityRequirement::ApiKey);
        assert_eq!(
            chain.spec().security,
            Some(json!([{"ApiKeyAuth": []}]))
        );
    }

    #[tokio::test]
    async fn jwt_wins_over_basic_regardless_of_position() {
        let trace = Arc::new(Trace::default());
        let chain = chain(
            vec![auth_step(&trace, AuthKind::Basic), auth_step(&trace, AuthKind::Jwt)],
            &trace,
            Ok(HandlerReply::json(Value::Null)),
        );
        assert_eq!(chain.security(), SecurityRequirement::ApiKeyJwt);
    }

    #[tokio::test]
    async fn basic_authenticator_declares_basic_security() {
        let trace = Arc::new(Trace::default());
        let chain = chain(
            vec![auth_step(&trace, AuthKind::Basic)],
            &trace,
            Ok(HandlerReply::json(Value::Null)),
        );
        assert_eq!(chain.security(), SecurityRequirement::ApiKeyBasic);
    }
}
