//! Test fixtures for Hermes development and testing.
//!
//! This module provides a recording session factory and a small person
//! service that tests across the Hermes workspace share.
//!
//! # Example
//!
//! ```
//! use hermes_core::fixtures;
//!
//! let (service, descriptor) = fixtures::person_service().unwrap();
//! assert_eq!(descriptor.type_name(), fixtures::PERSON_SERVICE);
//! assert_eq!(service.dispatched(), 0);
//! ```

use crate::context::InvocationContext;
use crate::error::{BoxError, HermesError, HermesResult};
use crate::method::{ExceptionMetered, Metered, Timed, TxOptions};
use crate::service::{MethodSpec, ServiceDescriptor};
use crate::session::{Session, SessionFactory};
use crate::validation::{Validate, Violations};
use crate::value::{InvokeResult, Value};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Declaring type of the fixture person service.
pub const PERSON_SERVICE: &str = "com.example.PersonService";

/// Error raised by a recording session told to fail.
#[derive(Debug, Error)]
#[error("session {operation} failed")]
pub struct SessionFailure {
    /// The failing operation.
    pub operation: &'static str,
}

/// Counters shared by a [`RecordingSessionFactory`] and its sessions.
#[derive(Debug, Default)]
pub struct SessionStats {
    opens: AtomicUsize,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    closes: AtomicUsize,
    fail_open: AtomicBool,
    fail_commit: AtomicBool,
    fail_rollback: AtomicBool,
    fail_close: AtomicBool,
    last_options: Mutex<Option<TxOptions>>,
    events: Mutex<Vec<String>>,
}

impl SessionStats {
    /// Sessions opened.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Transactions begun.
    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    /// Transactions committed.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Transactions rolled back.
    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    /// Sessions closed.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Options applied by the most recent `configure`.
    pub fn last_options(&self) -> Option<TxOptions> {
        *self.last_options.lock()
    }

    /// Every session operation in order, e.g. `open:1`, `commit:1`.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn record(&self, event: &str, id: usize) {
        self.events.lock().push(format!("{event}:{id}"));
    }
}

/// Session factory that counts every operation.
#[derive(Debug, Clone, Default)]
pub struct RecordingSessionFactory {
    stats: Arc<SessionStats>,
}

impl RecordingSessionFactory {
    /// Creates a factory whose sessions always succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared counters.
    #[must_use]
    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    /// Makes `open_session` fail.
    #[must_use]
    pub fn failing_open(self) -> Self {
        self.stats.fail_open.store(true, Ordering::SeqCst);
        self
    }

    /// Makes `commit` fail.
    #[must_use]
    pub fn failing_commit(self) -> Self {
        self.stats.fail_commit.store(true, Ordering::SeqCst);
        self
    }

    /// Makes `rollback` fail.
    #[must_use]
    pub fn failing_rollback(self) -> Self {
        self.stats.fail_rollback.store(true, Ordering::SeqCst);
        self
    }

    /// Makes `close` fail.
    #[must_use]
    pub fn failing_close(self) -> Self {
        self.stats.fail_close.store(true, Ordering::SeqCst);
        self
    }
}

impl SessionFactory for RecordingSessionFactory {
    fn open_session(&self) -> HermesResult<Box<dyn Session>> {
        if self.stats.fail_open.load(Ordering::SeqCst) {
            return Err(HermesError::transaction(
                "could not open session",
                SessionFailure { operation: "open" },
            ));
        }
        let id = self.stats.opens.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.record("open", id);
        Ok(Box::new(RecordingSession {
            id,
            stats: Arc::clone(&self.stats),
            active: false,
        }))
    }
}

/// Session produced by [`RecordingSessionFactory`].
#[derive(Debug)]
pub struct RecordingSession {
    id: usize,
    stats: Arc<SessionStats>,
    active: bool,
}

impl RecordingSession {
    /// One-based open sequence number.
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Completes the transaction from inside domain code, as a nested
    /// unit of work would.
    pub fn finish_early(&mut self) {
        self.active = false;
        self.stats.record("finish_early", self.id);
    }

    fn fail_if(flag: &AtomicBool, operation: &'static str) -> Result<(), BoxError> {
        if flag.load(Ordering::SeqCst) {
            Err(Box::new(SessionFailure { operation }))
        } else {
            Ok(())
        }
    }
}

impl Session for RecordingSession {
    fn configure(&mut self, options: &TxOptions) {
        *self.stats.last_options.lock() = Some(*options);
        self.stats.record("configure", self.id);
    }

    fn begin_transaction(&mut self) -> Result<(), BoxError> {
        self.stats.begins.fetch_add(1, Ordering::SeqCst);
        self.stats.record("begin", self.id);
        self.active = true;
        Ok(())
    }

    fn is_transaction_active(&self) -> bool {
        self.active
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        self.stats.record("commit", self.id);
        self.active = false;
        Self::fail_if(&self.stats.fail_commit, "commit")?;
        self.stats.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BoxError> {
        self.stats.record("rollback", self.id);
        self.active = false;
        Self::fail_if(&self.stats.fail_rollback, "rollback")?;
        self.stats.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        self.stats.record("close", self.id);
        Self::fail_if(&self.stats.fail_close, "close")
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A person record with two required fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    /// Full name, required.
    pub full_name: String,
    /// Job title, required.
    pub job_title: String,
}

impl Person {
    /// Creates a person.
    #[must_use]
    pub fn new(full_name: impl Into<String>, job_title: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            job_title: job_title.into(),
        }
    }
}

impl Validate for Person {
    fn validate(&self, v: &mut Violations) {
        v.not_empty("fullName", &self.full_name)
            .not_empty("jobTitle", &self.job_title);
    }
}

/// No person stored under the requested id.
#[derive(Debug, Error)]
#[error("no person with id {0}")]
pub struct PersonNotFound(pub i64);

/// The echo service refused its input.
#[derive(Debug, Error)]
#[error("echo rejected: {0}")]
pub struct EchoRejected(pub String);

/// A downstream failure caused by an [`EchoRejected`].
#[derive(Debug, Error)]
#[error("downstream failure")]
pub struct Downstream(#[source] pub EchoRejected);

/// A failure unrelated to the echo service.
#[derive(Debug, Error)]
#[error("unrelated failure")]
pub struct Unrelated;

/// In-memory person service that counts dispatched calls.
#[derive(Debug, Default)]
pub struct PersonService {
    people: Mutex<Vec<Person>>,
    dispatched: AtomicUsize,
}

impl PersonService {
    /// Number of calls that reached a handler.
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Stored people.
    pub fn people(&self) -> Vec<Person> {
        self.people.lock().clone()
    }

    fn enter(&self) {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
    }

    fn create_person(&self, ctx: &InvocationContext) -> InvokeResult {
        self.enter();
        let person = ctx.arg::<Person>(0)?.clone();
        self.people.lock().push(person.clone());
        Ok(Value::new(person))
    }

    fn get_persons(&self) -> InvokeResult {
        self.enter();
        Ok(Value::new(self.people()))
    }

    fn get_person(&self, ctx: &InvocationContext) -> InvokeResult {
        self.enter();
        let id = *ctx.arg::<i64>(0)?;
        let people = self.people.lock();
        usize::try_from(id)
            .ok()
            .and_then(|i| people.get(i))
            .cloned()
            .map(Value::new)
            .ok_or_else(|| HermesError::fault(PersonNotFound(id)))
    }

    fn echo(&self, ctx: &InvocationContext) -> InvokeResult {
        self.enter();
        let input = ctx.arg::<String>(0)?;
        match input.as_str() {
            "reject" => Err(HermesError::fault(EchoRejected(input.clone()))),
            "downstream" => Err(HermesError::fault(Downstream(EchoRejected(input.clone())))),
            "unrelated" => Err(HermesError::fault(Unrelated)),
            _ => Ok(Value::new(match ctx.principal() {
                Some(principal) => format!("{principal}: {input}"),
                None => input.clone(),
            })),
        }
    }

    fn create_person_async(&self, ctx: &InvocationContext) -> InvokeResult {
        let result = self.create_person(ctx);
        ctx.callback(1)?.complete(&result);
        result.map(|_| Value::unit())
    }
}

/// Builds the fixture person service and its descriptor.
///
/// | Method | Tags |
/// |---|---|
/// | `createPerson(Person)` | validated, unit of work |
/// | `createPersonAsync(Person, callback)` | validated, unit of work |
/// | `getPersons()` | read-only unit of work |
/// | `getPerson(i64)` | unit of work |
/// | `echo(String)` | timed, metered, exception-metered on [`EchoRejected`] |
/// | `ping()` | none |
pub fn person_service() -> HermesResult<(Arc<PersonService>, Arc<ServiceDescriptor>)> {
    let service = Arc::new(PersonService::default());
    let descriptor = ServiceDescriptor::builder_from_arc(PERSON_SERVICE, Arc::clone(&service))
        .method(
            MethodSpec::new("createPerson")
                .validated_param::<Person>("person")
                .unit_of_work(TxOptions::default())
                .handler(PersonService::create_person),
        )
        .method(
            MethodSpec::new("createPersonAsync")
                .validated_param::<Person>("person")
                .async_variant()
                .unit_of_work(TxOptions::default())
                .handler(PersonService::create_person_async),
        )
        .method(
            MethodSpec::new("getPersons")
                .unit_of_work(TxOptions::default().read_only(true))
                .handler(|svc: &PersonService, _| svc.get_persons()),
        )
        .method(
            MethodSpec::new("getPerson")
                .param::<i64>("id")
                .unit_of_work(TxOptions::default())
                .handler(PersonService::get_person),
        )
        .method(
            MethodSpec::new("echo")
                .param::<String>("input")
                .timed(Timed::new())
                .metered(Metered::new())
                .exception_metered(ExceptionMetered::of::<EchoRejected>())
                .handler(PersonService::echo),
        )
        .method(MethodSpec::new("ping").handler(|svc: &PersonService, _| {
            svc.enter();
            Ok(Value::new(String::from("pong")))
        }))
        .build()?;

    Ok((service, Arc::new(descriptor)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::Invoker;
    use crate::method::MethodIdentity;
    use crate::value::Argument;

    #[test]
    fn test_recording_session_counts() {
        let factory = RecordingSessionFactory::new();
        let mut session = factory.open_session().unwrap();
        session.configure(&TxOptions::default().read_only(true));
        session.begin_transaction().unwrap();
        assert!(session.is_transaction_active());
        session.commit().unwrap();
        assert!(!session.is_transaction_active());
        session.close().unwrap();

        let stats = factory.stats();
        assert_eq!(stats.opens(), 1);
        assert_eq!(stats.begins(), 1);
        assert_eq!(stats.commits(), 1);
        assert_eq!(stats.closes(), 1);
        assert!(stats.last_options().unwrap().read_only);
        assert_eq!(
            stats.events(),
            vec!["open:1", "configure:1", "begin:1", "commit:1", "close:1"]
        );
    }

    #[test]
    fn test_failing_factory() {
        assert!(RecordingSessionFactory::new()
            .failing_open()
            .open_session()
            .is_err());

        let factory = RecordingSessionFactory::new().failing_commit();
        let mut session = factory.open_session().unwrap();
        session.begin_transaction().unwrap();
        assert!(session.commit().is_err());
        assert_eq!(factory.stats().commits(), 0);
    }

    #[test]
    fn test_person_validation() {
        let mut v = Violations::at("person");
        Person::new("", " ").validate(&mut v);
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn test_person_service_dispatch() {
        let (service, descriptor) = person_service().unwrap();
        let mut ctx = InvocationContext::new(
            MethodIdentity::new("createPerson").param::<Person>(),
            vec![Argument::value(Person::new("Ann", "Pilot"))],
        );
        descriptor.invoke(&mut ctx).unwrap();
        assert_eq!(service.people().len(), 1);

        let mut ctx = InvocationContext::new(
            MethodIdentity::new("getPerson").param::<i64>(),
            vec![Argument::value(5_i64)],
        );
        let err = descriptor.invoke(&mut ctx).unwrap_err();
        assert!(err.downcast_fault_ref::<PersonNotFound>().is_some());
        assert_eq!(service.dispatched(), 2);
    }
}
