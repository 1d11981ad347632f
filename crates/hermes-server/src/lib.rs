//! # Hermes Server
//!
//! Publishes services as endpoints and handles their calls.
//!
//! An [`Environment`] owns the metric registry and validator shared by all
//! endpoints. [`Environment::publish_endpoint`] turns an [`EndpointBuilder`]
//! into an [`Endpoint`]: it assembles the invoker pipeline from the service's
//! declared policies and installs the authentication gate when requested.
//!
//! The transport decodes each request into an
//! [`InboundCall`](hermes_core::InboundCall) and hands it to
//! [`Endpoint::handle`] (synchronous) or [`Endpoint::call`] (async, on the
//! blocking pool). The resulting [`CallOutcome`] carries the reply, the fault
//! or the rejection to encode.
//!
//! ## Example
//!
//! ```
//! use hermes_core::fixtures::{self, RecordingSessionFactory};
//! use hermes_core::{Argument, InboundCall, MethodIdentity};
//! use hermes_server::{EndpointBuilder, Environment};
//! use std::sync::Arc;
//!
//! let environment = Environment::new("/soap");
//! let (_, descriptor) = fixtures::person_service().unwrap();
//! let endpoint = environment
//!     .publish_endpoint(
//!         EndpointBuilder::new("people", descriptor)
//!             .session_factory(Arc::new(RecordingSessionFactory::new())),
//!     )
//!     .unwrap();
//!
//! let call = InboundCall::new(
//!     MethodIdentity::new("echo").param::<String>(),
//!     vec![Argument::value(String::from("hello"))],
//! );
//! let outcome = endpoint.handle(call);
//! assert_eq!(outcome.reply().unwrap().downcast_ref::<String>().unwrap(), "hello");
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builder;
mod endpoint;
mod environment;

pub use builder::{EndpointBuilder, LOCAL_TRANSPORT_PREFIX};
pub use endpoint::{CallOutcome, Endpoint};
pub use environment::Environment;
