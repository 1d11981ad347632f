//! Behavior of a fully assembled pipeline.

use hermes_core::fixtures::{self, Person, RecordingSessionFactory};
use hermes_core::{
    Argument, ErrorCategory, ExceptionMetered, HermesError, InvocationContext, Invoker, Metered,
    MethodIdentity, MethodSpec, ServiceDescriptor, SessionFactory, Timed, TxOptions, Validate,
    Value, Violations,
};
use hermes_middleware::{Pipeline, PipelineAssembler};
use hermes_telemetry::MetricRegistry;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("insufficient funds for {0}")]
struct InsufficientFunds(i64);

const LIMIT: i64 = 1000;
const TIMER: &str = "com.example.Accounts.transfer";
const CALLS: &str = "com.example.Accounts.transfer";
const FAILURES: &str = "com.example.Accounts.transfer.exceptions";

#[derive(Debug, Clone)]
struct Transfer {
    from: String,
    amount: i64,
}

impl Validate for Transfer {
    fn validate(&self, v: &mut Violations) {
        v.not_empty("from", &self.from)
            .check(self.amount > 0, "amount must be positive");
    }
}

#[derive(Default)]
struct Accounts {
    dispatched: AtomicUsize,
}

impl Accounts {
    fn transfer(&self, ctx: &InvocationContext) -> hermes_core::InvokeResult {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        let transfer = ctx.arg::<Transfer>(0)?;
        if transfer.amount > LIMIT {
            return Err(HermesError::fault(InsufficientFunds(transfer.amount)));
        }
        Ok(Value::new(transfer.amount))
    }
}

struct Fixture {
    accounts: Arc<Accounts>,
    sessions: Arc<RecordingSessionFactory>,
    registry: Arc<MetricRegistry>,
    pipeline: Pipeline,
}

fn fixture() -> Fixture {
    let accounts = Arc::new(Accounts::default());
    let descriptor =
        ServiceDescriptor::builder_from_arc("com.example.Accounts", Arc::clone(&accounts))
        .method(
            MethodSpec::new("transfer")
                .validated_param::<Transfer>("transfer")
                .unit_of_work(TxOptions::default())
                .timed(Timed::new())
                .metered(Metered::new())
                .exception_metered(ExceptionMetered::of::<InsufficientFunds>())
                .handler(Accounts::transfer),
        )
        .build()
        .unwrap();

    let sessions = Arc::new(RecordingSessionFactory::new());
    let registry = Arc::new(MetricRegistry::new());
    let pipeline = PipelineAssembler::new(Arc::clone(&registry))
        .with_session_factory(Arc::clone(&sessions) as Arc<dyn SessionFactory>)
        .assemble(Arc::new(descriptor));

    Fixture {
        accounts,
        sessions,
        registry,
        pipeline,
    }
}

fn transfer(from: &str, amount: i64) -> InvocationContext {
    InvocationContext::new(
        MethodIdentity::new("transfer").param::<Transfer>(),
        vec![Argument::value(Transfer {
            from: from.to_string(),
            amount,
        })],
    )
}

#[test]
fn invalid_call_opens_no_session_and_is_not_counted() {
    let f = fixture();

    let err = f.pipeline.invoke(&mut transfer("", -5)).unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Validation);
    let HermesError::Validation(validation) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(validation.violations().len(), 2);
    assert_eq!(f.accounts.dispatched.load(Ordering::SeqCst), 0);
    assert_eq!(f.sessions.stats().opens(), 0);
    assert_eq!(f.registry.timer_count(TIMER), 0);
    assert_eq!(f.registry.meter_count(CALLS), 0);
}

#[test]
fn missing_or_null_argument_opens_no_session() {
    let f = fixture();

    for arguments in [Vec::new(), vec![Argument::Null]] {
        let mut ctx =
            InvocationContext::new(MethodIdentity::new("transfer").param::<Transfer>(), arguments);
        let err = f.pipeline.invoke(&mut ctx).unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.to_string().contains("transfer must not be null"));
    }

    assert_eq!(f.accounts.dispatched.load(Ordering::SeqCst), 0);
    assert_eq!(f.sessions.stats().opens(), 0);
    assert_eq!(f.registry.meter_count(CALLS), 0);
}

#[test]
fn failed_call_is_rolled_back_counted_and_unchanged() {
    let f = fixture();

    let err = f.pipeline.invoke(&mut transfer("alice", 5000)).unwrap_err();

    assert_eq!(
        err.downcast_fault_ref::<InsufficientFunds>().map(|e| e.0),
        Some(5000)
    );
    assert_eq!(err.to_string(), "insufficient funds for 5000");
    let stats = f.sessions.stats();
    assert_eq!((stats.rollbacks(), stats.commits(), stats.closes()), (1, 0, 1));
    assert_eq!(f.registry.timer_count(TIMER), 1);
    assert_eq!(f.registry.meter_count(CALLS), 1);
    assert_eq!(f.registry.meter_count(FAILURES), 1);
}

#[test]
fn successful_call_commits_once() {
    let f = fixture();

    let value = f.pipeline.invoke(&mut transfer("alice", 10)).unwrap();

    assert_eq!(value.downcast_ref::<i64>(), Some(&10));
    let stats = f.sessions.stats();
    assert_eq!((stats.begins(), stats.commits(), stats.closes()), (1, 1, 1));
    assert_eq!(f.registry.meter_count(FAILURES), 0);
}

#[test]
fn create_person_end_to_end() {
    let (service, descriptor) = fixtures::person_service().unwrap();
    let sessions = Arc::new(RecordingSessionFactory::new());
    let pipeline = PipelineAssembler::new(Arc::new(MetricRegistry::new()))
        .with_session_factory(Arc::clone(&sessions) as Arc<dyn SessionFactory>)
        .assemble(descriptor);
    let create = |person: Person| {
        InvocationContext::new(
            MethodIdentity::new("createPerson").param::<Person>(),
            vec![Argument::value(person)],
        )
    };

    let err = pipeline.invoke(&mut create(Person::new("Ada", ""))).unwrap_err();
    assert!(err.to_string().contains("person.jobTitle must not be empty"));
    assert_eq!(sessions.stats().opens(), 0);
    assert_eq!(service.dispatched(), 0);

    let created = pipeline
        .invoke(&mut create(Person::new("Ada", "Engineer")))
        .unwrap();
    assert_eq!(created.downcast_ref::<Person>().unwrap().job_title, "Engineer");
    let stats = sessions.stats();
    assert_eq!((stats.opens(), stats.commits(), stats.closes()), (1, 1, 1));
    assert_eq!(service.people().len(), 1);
}

#[test]
fn concurrent_calls_lose_no_updates() {
    let f = Arc::new(fixture());
    let threads = 8;
    let per_thread = 200;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let f = Arc::clone(&f);
            thread::spawn(move || {
                for i in 0..per_thread {
                    let amount = if (t + i) % 4 == 0 { LIMIT + 1 } else { 1 };
                    let _ = f.pipeline.invoke(&mut transfer("alice", amount));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let total = (threads * per_thread) as u64;
    let failures = (0..threads)
        .flat_map(|t| (0..per_thread).map(move |i| (t + i) % 4 == 0))
        .filter(|failed| *failed)
        .count();
    assert_eq!(f.registry.timer_count(TIMER), total);
    assert_eq!(f.registry.meter_count(CALLS), total);
    assert_eq!(f.registry.meter_count(FAILURES), failures as u64);
    let stats = f.sessions.stats();
    assert_eq!(stats.opens() as u64, total);
    assert_eq!(stats.closes() as u64, total);
    assert_eq!(stats.rollbacks(), failures);
}

proptest! {
    #[test]
    fn prop_counts_follow_outcomes(amounts in prop::collection::vec(1_i64..2 * LIMIT, 0..40)) {
        let f = fixture();
        for amount in &amounts {
            let _ = f.pipeline.invoke(&mut transfer("alice", *amount));
        }

        let failed = amounts.iter().filter(|a| **a > LIMIT).count();
        let succeeded = amounts.len() - failed;
        let stats = f.sessions.stats();

        prop_assert_eq!(f.registry.timer_count(TIMER), amounts.len() as u64);
        prop_assert_eq!(f.registry.meter_count(FAILURES), failed as u64);
        prop_assert_eq!(stats.commits(), succeeded);
        prop_assert_eq!(stats.rollbacks(), failed);
        prop_assert_eq!(stats.closes(), amounts.len());
    }
}
