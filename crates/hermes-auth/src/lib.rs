//! # Hermes Auth
//!
//! Authenticates inbound calls before they reach the invoker chain.
//!
//! The [`AuthenticationGate`] is an [`Interceptor`](hermes_core::Interceptor).
//! It extracts [`BasicCredentials`] from the call, asks the configured
//! [`Authenticator`] who they belong to, and either stores the resolved
//! [`Principal`](hermes_core::Principal) in the call's exchange or aborts the
//! call with an empty-bodied challenge response.
//!
//! ## Credential Sources
//!
//! Tried in order:
//!
//! 1. `Authorization: Basic <base64(username:password)>` transport header
//! 2. Username token carried in the message security header
//!
//! ## Outcomes
//!
//! | Situation                       | Response                     |
//! |---------------------------------|------------------------------|
//! | No usable credentials           | 401 + `WWW-Authenticate`     |
//! | Authenticator resolves nobody   | 401 + `WWW-Authenticate`     |
//! | Authenticator fails             | 500 + `WWW-Authenticate`     |
//! | Authenticator resolves a caller | call continues               |
//!
//! ## Example
//!
//! ```
//! use hermes_auth::{AuthenticationGate, BasicAuthentication, BasicCredentials};
//! use hermes_core::{InboundCall, Interceptor, InterceptorOutcome, MethodIdentity, Principal};
//! use http::header::AUTHORIZATION;
//!
//! let authentication = BasicAuthentication::from_fn(
//!     |c| Ok((c.password() == "secret").then(|| Principal::new(c.username()))),
//!     "hermes",
//! );
//! let gate = AuthenticationGate::new(authentication).unwrap();
//!
//! let header = BasicCredentials::new("alice", "secret").to_authorization().unwrap();
//! let mut call = InboundCall::new(MethodIdentity::new("ping"), Vec::new())
//!     .with_header(AUTHORIZATION, header);
//!
//! assert!(matches!(gate.intercept(&mut call), InterceptorOutcome::Continue));
//! assert_eq!(call.exchange().principal().unwrap().name(), "alice");
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-auth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod authenticator;
mod credentials;
mod error;
mod gate;

pub use authenticator::{Authenticator, BasicAuthentication};
pub use credentials::BasicCredentials;
pub use error::AuthenticationError;
pub use gate::AuthenticationGate;
