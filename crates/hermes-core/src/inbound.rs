//! Inbound calls and the interceptor contract.
//!
//! The transport hands each decoded call to the endpoint as an
//! [`InboundCall`]: the resolved method, its arguments, the transport headers
//! and any security token found in the message. [`Interceptor`]s run over it
//! before the invoker chain and may abort the call with a [`Rejection`].

use crate::context::{Exchange, InvocationContext};
use crate::method::MethodIdentity;
use crate::value::Argument;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH};
use http::{HeaderMap, Response, StatusCode};

/// Username and password carried in the message security header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameToken {
    /// User name.
    pub username: String,
    /// Password, if the token carries one.
    pub password: Option<String>,
}

impl UsernameToken {
    /// Creates a token with a password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
        }
    }
}

/// A decoded call as received from the transport.
#[derive(Debug)]
pub struct InboundCall {
    method: MethodIdentity,
    arguments: Vec<Argument>,
    headers: HeaderMap,
    security_token: Option<UsernameToken>,
    exchange: Exchange,
}

impl InboundCall {
    /// Creates a call with no headers.
    #[must_use]
    pub fn new(method: MethodIdentity, arguments: Vec<Argument>) -> Self {
        Self {
            method,
            arguments,
            headers: HeaderMap::new(),
            security_token: None,
            exchange: Exchange::new(),
        }
    }

    /// Adds a transport header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Attaches the message security token.
    #[must_use]
    pub fn with_security_token(mut self, token: UsernameToken) -> Self {
        self.security_token = Some(token);
        self
    }

    /// Returns the resolved target method.
    #[must_use]
    pub const fn method(&self) -> &MethodIdentity {
        &self.method
    }

    /// Returns the call arguments.
    #[must_use]
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Returns the transport headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the message security token, if any.
    #[must_use]
    pub const fn security_token(&self) -> Option<&UsernameToken> {
        self.security_token.as_ref()
    }

    /// Returns the call's exchange.
    #[must_use]
    pub const fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// Returns the call's exchange for mutation.
    pub fn exchange_mut(&mut self) -> &mut Exchange {
        &mut self.exchange
    }

    /// Turns the call into the context that enters the invoker chain,
    /// carrying the exchange along.
    #[must_use]
    pub fn into_context(self) -> InvocationContext {
        InvocationContext::with_exchange(self.method, self.arguments, self.exchange)
    }
}

/// A call refused before it reached the invoker chain.
#[derive(Debug, Clone)]
pub struct Rejection {
    status: StatusCode,
    headers: HeaderMap,
    reason: String,
}

impl Rejection {
    /// Creates a rejection with an empty body.
    #[must_use]
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        Self {
            status,
            headers,
            reason: reason.into(),
        }
    }

    /// Adds a response header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns why the call was refused, for logs only.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Builds the empty-bodied response sent back to the caller.
    #[must_use]
    pub fn response(&self) -> Response<Bytes> {
        let mut response = Response::new(Bytes::new());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
    }
}

/// What an interceptor decided.
#[derive(Debug)]
pub enum InterceptorOutcome {
    /// Let the call proceed.
    Continue,
    /// Stop processing and answer with the rejection.
    Abort(Rejection),
}

/// Runs over an inbound call before the invoker chain.
pub trait Interceptor: Send + Sync {
    /// Returns the interceptor name, used in logs.
    fn name(&self) -> &'static str;

    /// Inspects the call, possibly enriching its exchange.
    fn intercept(&self, call: &mut InboundCall) -> InterceptorOutcome;
}
