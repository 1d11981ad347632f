//! # Hermes Core
//!
//! Core types for the Hermes invocation pipeline.
//!
//! This crate provides the foundational types shared by every Hermes crate:
//!
//! - [`InvocationContext`] - Per-call context: target method, arguments and exchange state
//! - [`MethodIdentity`] - Method name plus parameter shape (overloads are distinct)
//! - [`ServiceDescriptor`] - A service implementation with its explicitly registered methods
//! - [`MethodMetadataIndex`] - Immutable per-method policy map built once per endpoint
//! - [`HermesError`] - Standard error type propagated through every layer
//! - [`Principal`] - Authenticated caller identity
//! - Capability traits consumed by the pipeline: [`Invoker`], [`Validator`],
//!   [`SessionFactory`] and [`Interceptor`]

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
pub mod fixtures;
mod identity;
pub mod inbound;
mod invoker;
mod metadata;
pub mod method;
pub mod service;
pub mod session;
pub mod validation;
mod value;

pub use context::{CallId, Exchange, InvocationContext};
pub use error::{BoxError, ErrorCategory, FaultEnvelope, HermesError, HermesResult};
pub use identity::Principal;
pub use inbound::{InboundCall, Interceptor, InterceptorOutcome, Rejection, UsernameToken};
pub use invoker::{FnInvoker, Invoker};
pub use metadata::{ExceptionMeterPolicy, MethodMetadataIndex, MethodPolicy};
pub use method::{
    CacheMode, ErrorMatcher, ExceptionMetered, FlushMode, Metered, MethodIdentity, Timed,
    TxOptions, UnitOfWork,
};
pub use service::{
    MethodSpec, ParamKind, ParamSpec, RegisteredMethod, ServiceBuilder, ServiceDescriptor,
};
pub use session::{OwnedSession, Session, SessionFactory, SessionHandle};
pub use validation::{
    ConstraintValidator, Validate, ValidationError, Validator, Violation, Violations,
};
pub use value::{Argument, InvokeResult, ResponseCallback, Value};
