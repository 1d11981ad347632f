//! # Hermes Middleware
//!
//! The invoker chain that wraps every published service method.
//!
//! A [`Pipeline`] runs a call through a fixed sequence of [`Layer`]s before
//! the raw dispatch into the service, and the result flows back up through
//! the same layers in reverse.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Call → Validation → Transaction → Timing → CallRate → FailureRate → Dispatch
//!                                                                       ↓
//! Result ← ─────────────────── (reverse order) ─────────────────────────┘
//! ```
//!
//! | Stage | Layer                 | Applies to                          |
//! |-------|-----------------------|-------------------------------------|
//! | 1     | Validation            | methods with validated parameters   |
//! | 2     | Transaction           | methods running in a unit of work   |
//! | 3     | Timing                | timed methods                       |
//! | 4     | Call rate             | metered methods                     |
//! | 5     | Failure rate          | exception-metered methods           |
//!
//! The [`PipelineAssembler`] only materializes a stage when at least one
//! method of the service carries the matching policy, and each stage passes
//! untagged methods straight through.
//!
//! Authentication is not a layer. It runs as an
//! [`Interceptor`](hermes_core::Interceptor) ahead of the chain.
//!
//! ## Example
//!
//! ```
//! use hermes_middleware::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 5);
//! assert_eq!(stages[0].name(), "validation");
//! assert_eq!(stages[4].name(), "failure_rate");
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assembler;
pub mod layer;
pub mod pipeline;
pub mod stages;
mod target;

pub use assembler::PipelineAssembler;
pub use layer::{FnLayer, Layer, Next};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use target::TargetMethods;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::TargetMethods;
    use hermes_core::fixtures::{self, PersonService};
    use hermes_core::{
        Argument, InvocationContext, MethodIdentity, MethodMetadataIndex, ServiceDescriptor,
    };
    use std::sync::Arc;

    pub fn person_targets() -> (Arc<PersonService>, Arc<ServiceDescriptor>, TargetMethods) {
        let (service, descriptor) = fixtures::person_service().unwrap();
        let targets = TargetMethods::new(Arc::new(MethodMetadataIndex::build(&descriptor)));
        (service, descriptor, targets)
    }

    pub fn echo(input: &str) -> InvocationContext {
        InvocationContext::new(
            MethodIdentity::new("echo").param::<String>(),
            vec![Argument::value(input.to_string())],
        )
    }

    pub fn ping() -> InvocationContext {
        InvocationContext::new(MethodIdentity::new("ping"), Vec::new())
    }
}
