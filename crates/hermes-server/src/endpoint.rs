//! Published endpoints and call handling.

use hermes_core::{
    HermesError, InboundCall, Interceptor, InterceptorOutcome, Invoker, Rejection, Value,
};
use hermes_middleware::Pipeline;
use http::StatusCode;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// What became of one inbound call.
#[derive(Debug)]
pub enum CallOutcome {
    /// The method returned a value.
    Reply(Value),
    /// The chain failed; the error is exactly what the chain raised.
    Fault(HermesError),
    /// An interceptor refused the call before the chain ran.
    Rejected(Rejection),
}

impl CallOutcome {
    /// Returns the status the transport should answer with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Reply(_) => StatusCode::OK,
            Self::Fault(err) => err.status_code(),
            Self::Rejected(rejection) => rejection.status(),
        }
    }

    /// Returns the reply value, if the call succeeded.
    #[must_use]
    pub const fn reply(&self) -> Option<&Value> {
        match self {
            Self::Reply(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the fault, if the chain failed.
    #[must_use]
    pub const fn fault(&self) -> Option<&HermesError> {
        match self {
            Self::Fault(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the rejection, if an interceptor refused the call.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    /// Converts into a result, treating a rejection as an authentication
    /// error.
    ///
    /// # Errors
    ///
    /// Returns the fault, or an authentication error for a rejection.
    pub fn into_result(self) -> Result<Value, HermesError> {
        match self {
            Self::Reply(value) => Ok(value),
            Self::Fault(err) => Err(err),
            Self::Rejected(rejection) => Err(HermesError::authentication(rejection.reason())),
        }
    }
}

/// A service reachable at a path, with its assembled pipeline.
pub struct Endpoint {
    path: String,
    service: String,
    published_url: Option<String>,
    pipeline: Pipeline,
    interceptors: Vec<Arc<dyn Interceptor>>,
    properties: HashMap<String, String>,
}

impl Endpoint {
    pub(crate) fn new(
        path: String,
        service: String,
        published_url: Option<String>,
        pipeline: Pipeline,
        interceptors: Vec<Arc<dyn Interceptor>>,
        properties: HashMap<String, String>,
    ) -> Self {
        Self {
            path,
            service,
            published_url,
            pipeline,
            interceptors,
            properties,
        }
    }

    /// Runs the interceptors, then the invoker chain.
    ///
    /// The first interceptor that aborts ends the call; nothing after it runs.
    pub fn handle(&self, mut call: InboundCall) -> CallOutcome {
        for interceptor in &self.interceptors {
            if let InterceptorOutcome::Abort(rejection) = interceptor.intercept(&mut call) {
                debug!(
                    endpoint = %self.path,
                    interceptor = interceptor.name(),
                    status = rejection.status().as_u16(),
                    reason = rejection.reason(),
                    "Call rejected"
                );
                return CallOutcome::Rejected(rejection);
            }
        }

        let mut ctx = call.into_context();
        match self.pipeline.invoke(&mut ctx) {
            Ok(value) => CallOutcome::Reply(value),
            Err(err) => {
                debug!(
                    endpoint = %self.path,
                    call_id = %ctx.call_id(),
                    category = ?err.category(),
                    error = %err,
                    "Call failed"
                );
                CallOutcome::Fault(err)
            }
        }
    }

    /// Handles the call on the runtime's blocking pool.
    ///
    /// The chain is synchronous, so each call occupies one blocking worker
    /// for its whole duration.
    pub async fn call(self: &Arc<Self>, call: InboundCall) -> CallOutcome {
        let endpoint = Arc::clone(self);
        match tokio::task::spawn_blocking(move || endpoint.handle(call)).await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                error!(endpoint = %self.path, error = %join_error, "Call aborted");
                CallOutcome::Fault(HermesError::fault(join_error))
            }
        }
    }

    /// Returns the path the endpoint is mounted at.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the service type name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the externally visible address, if one is known.
    #[must_use]
    pub fn published_url(&self) -> Option<&str> {
        self.published_url.as_deref()
    }

    /// Returns the assembled pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns the interceptor names in execution order.
    #[must_use]
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Returns an endpoint property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("path", &self.path)
            .field("service", &self.service)
            .field("published_url", &self.published_url)
            .field("stages", &self.pipeline.stage_names())
            .field("interceptors", &self.interceptor_names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::fixtures::{self, EchoRejected};
    use hermes_core::{Argument, MethodIdentity};

    fn echo(input: &str) -> InboundCall {
        InboundCall::new(
            MethodIdentity::new("echo").param::<String>(),
            vec![Argument::value(input.to_string())],
        )
    }

    struct Deny;

    impl Interceptor for Deny {
        fn name(&self) -> &'static str {
            "deny"
        }

        fn intercept(&self, _call: &mut InboundCall) -> InterceptorOutcome {
            InterceptorOutcome::Abort(Rejection::new(StatusCode::FORBIDDEN, "denied"))
        }
    }

    fn endpoint(
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> (Arc<fixtures::PersonService>, Endpoint) {
        let (service, descriptor) = fixtures::person_service().unwrap();
        let endpoint = Endpoint::new(
            "/people".to_string(),
            descriptor.type_name().to_string(),
            None,
            Pipeline::builder(descriptor).build(),
            interceptors,
            HashMap::from([("mode".to_string(), "test".to_string())]),
        );
        (service, endpoint)
    }

    #[test]
    fn test_reply_and_fault() {
        let (_, endpoint) = endpoint(Vec::new());

        let reply = endpoint.handle(echo("hi"));
        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(reply.reply().unwrap().downcast_ref::<String>().unwrap(), "hi");

        let fault = endpoint.handle(echo("reject"));
        assert_eq!(fault.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(fault.fault().unwrap().downcast_fault_ref::<EchoRejected>().is_some());
        assert!(fault.into_result().is_err());
    }

    #[test]
    fn test_rejection_skips_chain() {
        let (service, endpoint) = endpoint(vec![Arc::new(Deny)]);

        let outcome = endpoint.handle(echo("hi"));

        assert_eq!(outcome.status(), StatusCode::FORBIDDEN);
        assert_eq!(outcome.rejection().unwrap().reason(), "denied");
        assert_eq!(service.dispatched(), 0);
        assert_eq!(endpoint.interceptor_names(), vec!["deny"]);
    }

    #[test]
    fn test_accessors() {
        let (_, endpoint) = endpoint(Vec::new());
        assert_eq!(endpoint.path(), "/people");
        assert_eq!(endpoint.service(), fixtures::PERSON_SERVICE);
        assert_eq!(endpoint.property("mode"), Some("test"));
        assert!(endpoint.published_url().is_none());
        assert!(format!("{endpoint:?}").contains("/people"));
    }

    #[test]
    fn test_async_call_runs_on_blocking_pool() {
        let (_, endpoint) = endpoint(Vec::new());
        let endpoint = Arc::new(endpoint);

        let outcome = tokio_test::block_on(endpoint.call(echo("async")));

        assert_eq!(outcome.reply().unwrap().downcast_ref::<String>().unwrap(), "async");
    }
}
