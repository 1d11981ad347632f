//! Argument validation capability.
//!
//! Domain argument types describe their own constraints by implementing
//! [`Validate`]. The pipeline asks a [`Validator`] to check each validated
//! parameter of a call and fails the call with a [`ValidationError`] carrying
//! every violation found.

use crate::service::ParamSpec;
use crate::value::Argument;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted path to the offending value, e.g. `person.fullName`.
    pub path: String,
    /// What is wrong with it.
    pub message: String,
}

impl Violation {
    /// Creates a violation.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{} {}", self.path, self.message)
        }
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    match (prefix.is_empty(), field.is_empty()) {
        (true, _) => field.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) if field.starts_with('[') => format!("{prefix}{field}"),
        (false, false) => format!("{prefix}.{field}"),
    }
}

/// Collects violations while a value validates itself.
///
/// # Example
///
/// ```
/// use hermes_core::{Validate, Violations};
///
/// struct Person { full_name: String }
///
/// impl Validate for Person {
///     fn validate(&self, v: &mut Violations) {
///         v.not_empty("fullName", &self.full_name);
///     }
/// }
///
/// let mut v = Violations::at("person");
/// Person { full_name: String::new() }.validate(&mut v);
/// assert_eq!(v.into_vec()[0].to_string(), "person.fullName must not be empty");
/// ```
#[derive(Debug, Default)]
pub struct Violations {
    prefix: String,
    items: Vec<Violation>,
}

impl Violations {
    /// Creates an empty collector at the root path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty collector whose paths start with `prefix`.
    #[must_use]
    pub fn at(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            items: Vec::new(),
        }
    }

    /// Records a violation on `field`.
    pub fn push(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.items
            .push(Violation::new(join_path(&self.prefix, field), message));
        self
    }

    /// Requires `value` to contain at least one non-whitespace character.
    pub fn not_empty(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, "must not be empty");
        }
        self
    }

    /// Requires `value` to be present.
    pub fn not_null<T>(&mut self, field: &str, value: Option<&T>) -> &mut Self {
        if value.is_none() {
            self.push(field, "must not be null");
        }
        self
    }

    /// Records `message` against the value itself unless `valid` holds.
    ///
    /// Used for conditional validity rules computed from the value's own state.
    pub fn check(&mut self, valid: bool, message: impl Into<String>) -> &mut Self {
        if !valid {
            self.push("", message);
        }
        self
    }

    /// Validates a composite field, prefixing its violations with `field`.
    pub fn nested<V: Validate + ?Sized>(&mut self, field: &str, child: &V) -> &mut Self {
        let mut inner = Self::at(join_path(&self.prefix, field));
        child.validate(&mut inner);
        self.items.append(&mut inner.items);
        self
    }

    /// Returns `true` if nothing was violated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Consumes the collector.
    #[must_use]
    pub fn into_vec(self) -> Vec<Violation> {
        self.items
    }
}

/// A type that can check its own constraints.
pub trait Validate {
    /// Records every violated constraint into `violations`.
    fn validate(&self, violations: &mut Violations);
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self, violations: &mut Violations) {
        for (i, item) in self.iter().enumerate() {
            violations.nested(&format!("[{i}]"), item);
        }
    }
}

impl<T: Validate> Validate for Option<T> {
    fn validate(&self, violations: &mut Violations) {
        if let Some(inner) = self {
            inner.validate(violations);
        }
    }
}

fn join_messages(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Raised when arguments violate their constraints.
#[derive(Debug, Clone, Error)]
#[error("Validation failed: {}", join_messages(.violations))]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    /// Creates an error from the collected violations.
    #[must_use]
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Returns every violation.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Returns every violation formatted as `path message`.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

/// Checks one call argument against its parameter's constraints.
pub trait Validator: Send + Sync {
    /// Returns the violations found, empty if the argument is valid.
    fn validate(&self, param: &ParamSpec, argument: &Argument) -> Vec<Violation>;
}

/// Default validator driven by each parameter's [`Validate`] implementation.
///
/// Null arguments pass, as do arguments whose type does not match the
/// parameter (dispatch reports those). Paths are prefixed with the
/// parameter name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintValidator;

impl Validator for ConstraintValidator {
    fn validate(&self, param: &ParamSpec, argument: &Argument) -> Vec<Violation> {
        let Some(value) = argument.as_value() else {
            return Vec::new();
        };
        let mut violations = Violations::at(param.name());
        param.check_constraints(value, &mut violations);
        violations.into_vec()
    }
}
