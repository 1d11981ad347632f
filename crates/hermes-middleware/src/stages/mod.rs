//! Pipeline stages.
//!
//! Each stage consults the endpoint's [`TargetMethods`](crate::TargetMethods)
//! for the call's method and passes calls without a matching policy straight
//! through.
//!
//! 1. [`validation`] - Check arguments before anything else runs
//! 2. [`transaction`] - Open, commit or roll back, and close a session
//! 3. [`timing`] - Time the call on every exit path
//! 4. [`call_rate`] - Count the call
//! 5. [`failure_rate`] - Count failures matching the declared error type

pub mod call_rate;
pub mod failure_rate;
pub mod timing;
pub mod transaction;
pub mod validation;

pub use call_rate::CallRateLayer;
pub use failure_rate::FailureRateLayer;
pub use timing::TimingLayer;
pub use transaction::TransactionLayer;
pub use validation::ValidationLayer;
