//! Method identity and declarative policy tags.
//!
//! A service registers each exposed method together with the tags that select
//! the pipeline behaviors applying to it: [`Timed`], [`Metered`],
//! [`ExceptionMetered`] and [`UnitOfWork`]. Tags are plain values attached
//! at registration time, so nothing is discovered by introspection at runtime.

use serde::{Deserialize, Serialize};
use std::any::type_name;
use std::error::Error as StdError;
use std::fmt;

/// Suffix appended to synthesized exception meter names.
pub const EXCEPTIONS_SUFFIX: &str = "exceptions";

/// Identity of a service method: its name plus its parameter shape.
///
/// Two overloads with the same name but different parameter types are
/// distinct identities and resolve to distinct policies.
///
/// # Example
///
/// ```
/// use hermes_core::MethodIdentity;
///
/// let id = MethodIdentity::new("echo").param::<String>();
/// assert_eq!(id.name(), "echo");
/// assert_eq!(id.params().len(), 1);
/// assert!(id.to_string().starts_with("echo("));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodIdentity {
    name: String,
    params: Vec<&'static str>,
}

impl MethodIdentity {
    /// Creates an identity for a method with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Creates an identity from a name and parameter type names.
    #[must_use]
    pub fn with_params(name: impl Into<String>, params: Vec<&'static str>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Appends a parameter of type `T`.
    #[must_use]
    pub fn param<T: ?Sized>(mut self) -> Self {
        self.params.push(type_name::<T>());
        self
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter type names.
    #[must_use]
    pub fn params(&self) -> &[&'static str] {
        &self.params
    }
}

impl fmt::Display for MethodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(", "))
    }
}

/// Joins metric name segments with `.`, skipping empty ones.
#[must_use]
pub fn metric_name(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}

/// Resolves the metric name for a tag.
///
/// An explicit absolute name is used verbatim; an explicit relative name is
/// prefixed with the declaring type; otherwise the name is
/// `<declaring type>.<method>[.<suffix>]`.
#[must_use]
pub fn choose_metric_name(
    explicit: Option<&str>,
    absolute: bool,
    declaring_type: &str,
    method: &str,
    suffix: &str,
) -> String {
    match explicit.filter(|n| !n.is_empty()) {
        Some(name) if absolute => name.to_string(),
        Some(name) => metric_name(&[declaring_type, name]),
        None => metric_name(&[declaring_type, method, suffix]),
    }
}

/// Marks a method whose calls are timed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timed {
    /// Explicit metric name.
    pub name: Option<String>,
    /// Use `name` verbatim instead of prefixing the declaring type.
    pub absolute: bool,
}

impl Timed {
    /// Tag with a synthesized name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag with an explicit name, relative to the declaring type.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            absolute: false,
        }
    }

    /// Tag with an explicit absolute name.
    #[must_use]
    pub fn absolute(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            absolute: true,
        }
    }
}

/// Marks a method whose call rate is metered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metered {
    /// Explicit metric name.
    pub name: Option<String>,
    /// Use `name` verbatim instead of prefixing the declaring type.
    pub absolute: bool,
}

impl Metered {
    /// Tag with a synthesized name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag with an explicit name, relative to the declaring type.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            absolute: false,
        }
    }

    /// Tag with an explicit absolute name.
    #[must_use]
    pub fn absolute(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            absolute: true,
        }
    }
}

/// Marks a method whose failures are metered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionMetered {
    /// Explicit metric name.
    pub name: Option<String>,
    /// Use `name` verbatim instead of prefixing the declaring type.
    pub absolute: bool,
    /// Which failures are counted.
    pub cause: ErrorMatcher,
}

impl ExceptionMetered {
    /// Tag counting every failure under a synthesized name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag counting failures where the error or its cause is an `E`.
    #[must_use]
    pub fn of<E: StdError + 'static>() -> Self {
        Self {
            cause: ErrorMatcher::of::<E>(),
            ..Self::default()
        }
    }

    /// Sets an explicit name, relative to the declaring type.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self.absolute = false;
        self
    }

    /// Sets an explicit absolute name.
    #[must_use]
    pub fn absolute(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self.absolute = true;
        self
    }
}

/// Selects which errors an exception meter counts.
///
/// Matching is by concrete type via downcasting. [`ErrorMatcher::any`]
/// counts every error.
#[derive(Clone, Copy)]
pub struct ErrorMatcher {
    type_name: &'static str,
    matcher: fn(&(dyn StdError + 'static)) -> bool,
}

fn is_error_of<E: StdError + 'static>(error: &(dyn StdError + 'static)) -> bool {
    error.is::<E>()
}

fn is_any_error(_: &(dyn StdError + 'static)) -> bool {
    true
}

impl ErrorMatcher {
    /// Matches errors of concrete type `E`.
    #[must_use]
    pub fn of<E: StdError + 'static>() -> Self {
        Self {
            type_name: type_name::<E>(),
            matcher: is_error_of::<E>,
        }
    }

    /// Matches every error.
    #[must_use]
    pub fn any() -> Self {
        Self {
            type_name: "any",
            matcher: is_any_error,
        }
    }

    /// Returns the matched type name, or `any`.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if `error` itself matches.
    #[must_use]
    pub fn matches(&self, error: &(dyn StdError + 'static)) -> bool {
        (self.matcher)(error)
    }

    /// Returns `true` if `error` or its immediate cause matches.
    #[must_use]
    pub fn matches_error_or_cause(&self, error: &(dyn StdError + 'static)) -> bool {
        self.matches(error) || error.source().is_some_and(|cause| self.matches(cause))
    }
}

impl Default for ErrorMatcher {
    fn default() -> Self {
        Self::any()
    }
}

impl PartialEq for ErrorMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

impl Eq for ErrorMatcher {}

impl fmt::Debug for ErrorMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorMatcher").field(&self.type_name).finish()
    }
}

/// How a session interacts with its second-level cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Read from and write to the cache.
    #[default]
    Normal,
    /// Bypass the cache entirely.
    Ignore,
    /// Read from the cache only.
    Get,
    /// Write to the cache only.
    Put,
    /// Write to the cache, refreshing existing entries.
    Refresh,
}

/// When a session flushes pending changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Only on explicit flush.
    Manual,
    /// On commit.
    Commit,
    /// Before queries and on commit.
    #[default]
    Auto,
    /// Before every query.
    Always,
}

/// Configuration for one unit of work.
///
/// # Example
///
/// ```
/// use hermes_core::{FlushMode, TxOptions};
///
/// let opts = TxOptions::default().read_only(true).flush_mode(FlushMode::Manual);
/// assert!(opts.transactional);
/// assert!(opts.read_only);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxOptions {
    /// Begin a transaction around the call.
    pub transactional: bool,
    /// Open the session read-only.
    pub read_only: bool,
    /// Cache interaction.
    pub cache_mode: CacheMode,
    /// Flush behavior.
    pub flush_mode: FlushMode,
}

/// Marks a method that runs inside a unit of work.
pub type UnitOfWork = TxOptions;

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            transactional: true,
            read_only: false,
            cache_mode: CacheMode::Normal,
            flush_mode: FlushMode::Auto,
        }
    }
}

impl TxOptions {
    /// Sets whether a transaction is begun.
    #[must_use]
    pub const fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    /// Sets the read-only flag.
    #[must_use]
    pub const fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Sets the cache mode.
    #[must_use]
    pub const fn cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    /// Sets the flush mode.
    #[must_use]
    pub const fn flush_mode(mut self, flush_mode: FlushMode) -> Self {
        self.flush_mode = flush_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("inner")]
    struct Inner;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] Inner);

    #[derive(Debug, Error)]
    #[error("unrelated")]
    struct Unrelated;

    #[test]
    fn test_overloads_are_distinct() {
        let a = MethodIdentity::new("getPerson").param::<i64>();
        let b = MethodIdentity::new("getPerson").param::<String>();
        let c = MethodIdentity::new("getPerson").param::<i64>();
        assert_ne!(a, b);
        assert_eq!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_identity_display() {
        let id = MethodIdentity::with_params("sum", vec!["i32", "i32"]);
        assert_eq!(id.to_string(), "sum(i32, i32)");
        assert_eq!(MethodIdentity::new("ping").to_string(), "ping()");
    }

    #[test]
    fn test_choose_metric_name() {
        let ty = "com.example.Svc";
        assert_eq!(choose_metric_name(None, false, ty, "echo", ""), "com.example.Svc.echo");
        assert_eq!(
            choose_metric_name(None, false, ty, "echo", EXCEPTIONS_SUFFIX),
            "com.example.Svc.echo.exceptions"
        );
        assert_eq!(
            choose_metric_name(Some("calls"), false, ty, "echo", ""),
            "com.example.Svc.calls"
        );
        assert_eq!(choose_metric_name(Some("calls"), true, ty, "echo", ""), "calls");
        assert_eq!(
            choose_metric_name(Some(""), true, ty, "echo", ""),
            "com.example.Svc.echo"
        );
    }

    #[test]
    fn test_error_matcher_direct_and_cause() {
        let matcher = ErrorMatcher::of::<Inner>();
        assert!(matcher.matches_error_or_cause(&Inner));
        assert!(matcher.matches_error_or_cause(&Outer(Inner)));
        assert!(!matcher.matches(&Outer(Inner)));
        assert!(!matcher.matches_error_or_cause(&Unrelated));
    }

    #[test]
    fn test_error_matcher_any() {
        let matcher = ErrorMatcher::default();
        assert_eq!(matcher.type_name(), "any");
        assert!(matcher.matches(&Unrelated));
    }

    #[test]
    fn test_tx_options_defaults() {
        let opts = UnitOfWork::default();
        assert!(opts.transactional);
        assert!(!opts.read_only);
        assert_eq!(opts.cache_mode, CacheMode::Normal);
        assert_eq!(opts.flush_mode, FlushMode::Auto);

        let opts = opts.transactional(false).cache_mode(CacheMode::Ignore);
        assert!(!opts.transactional);
        assert_eq!(opts.cache_mode, CacheMode::Ignore);
    }

    #[test]
    fn test_exception_metered_builders() {
        let tag = ExceptionMetered::of::<Inner>().absolute("failures");
        assert_eq!(tag.name.as_deref(), Some("failures"));
        assert!(tag.absolute);
        assert_eq!(tag.cause, ErrorMatcher::of::<Inner>());
    }

    proptest! {
        #[test]
        fn prop_metric_name_has_no_empty_segments(
            segments in proptest::collection::vec("[a-z]{0,6}", 0..6)
        ) {
            let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
            let name = metric_name(&refs);
            prop_assert!(!name.starts_with('.'));
            prop_assert!(!name.ends_with('.'));
            prop_assert!(!name.contains(".."));
        }

        #[test]
        fn prop_absolute_names_are_verbatim(name in "[a-z][a-z.]{0,12}") {
            prop_assert_eq!(
                choose_metric_name(Some(&name), true, "Svc", "m", EXCEPTIONS_SUFFIX),
                name.clone()
            );
        }
    }
}
