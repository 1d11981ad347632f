//! Unit-of-work stage.
//!
//! Opens one session per call to a method declaring a unit of work, binds it
//! to the call's exchange while the method runs, then commits or rolls back
//! and closes it.
//!
//! ## Session lifecycle
//!
//! ```text
//! NoSession → Open ─(transactional)→ Active → Committed ─┐
//!              │                         └──→ RolledBack ─┤
//!              └──────────────────────────────────────────┴→ Closed
//! ```
//!
//! `Closed` is reached exactly once per call, on every exit path. The close
//! happens when the scope guard drops, so it also runs while unwinding.
//!
//! Commit and rollback only act on a transaction that is still active. Code
//! running inside the call may already have completed it, in which case the
//! stage leaves it alone.

use crate::layer::{Layer, Next};
use crate::target::TargetMethods;
use hermes_core::{
    HermesError, HermesResult, InvocationContext, InvokeResult, MethodIdentity, OwnedSession,
    SessionFactory, TxOptions,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Layer that runs unit-of-work methods inside a session.
///
/// # Behavior
///
/// 1. Pass through if the method declares no unit of work
/// 2. Open a session and apply the declared options
/// 3. Begin a transaction if the unit of work is transactional
/// 4. Bind the session to the exchange and delegate
/// 5. Commit on success, roll back on failure
/// 6. Unbind and close the session
///
/// A commit failure is reported as [`HermesError::Transaction`]. Rollback
/// and close failures are logged and never replace the error already in
/// flight.
pub struct TransactionLayer {
    targets: TargetMethods,
    factory: Arc<dyn SessionFactory>,
}

impl TransactionLayer {
    /// Creates the stage.
    #[must_use]
    pub fn new(targets: TargetMethods, factory: Arc<dyn SessionFactory>) -> Self {
        Self { targets, factory }
    }
}

impl Layer for TransactionLayer {
    fn name(&self) -> &'static str {
        "transaction"
    }

    fn invoke(&self, ctx: &mut InvocationContext, next: Next<'_>) -> InvokeResult {
        let Some(options) = self.targets.policy(ctx).and_then(|p| p.transactional) else {
            return next.run(ctx);
        };

        let scope = UnitOfWorkScope::open(self.factory.as_ref(), options, ctx.method())?;

        ctx.exchange_mut().bind_session(scope.session.handle());
        let result = next.run(ctx);
        ctx.exchange_mut().unbind_session();

        scope.complete(result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeState {
    Open,
    Active,
    Committed,
    RolledBack,
    Closed,
}

/// Owns the session of one call and closes it when dropped.
struct UnitOfWorkScope {
    session: OwnedSession,
    method: String,
    state: ScopeState,
}

impl UnitOfWorkScope {
    fn open(
        factory: &dyn SessionFactory,
        options: TxOptions,
        method: &MethodIdentity,
    ) -> HermesResult<Self> {
        let mut scope = Self {
            session: OwnedSession::new(factory.open_session()?),
            method: method.to_string(),
            state: ScopeState::Open,
        };

        scope.session.with(|s| s.configure(&options));

        if options.transactional {
            scope
                .session
                .with(|s| s.begin_transaction())
                .unwrap_or(Ok(()))
                .map_err(|e| HermesError::transaction("could not begin transaction", e))?;
            scope.state = ScopeState::Active;
            debug!(method = %scope.method, read_only = options.read_only, "Transaction started");
        }

        Ok(scope)
    }

    fn complete(mut self, result: InvokeResult) -> InvokeResult {
        match result {
            Ok(value) => self.commit().map(|()| value),
            Err(error) => {
                self.rollback();
                Err(error)
            }
        }
    }

    fn commit(&mut self) -> HermesResult<()> {
        if self.state != ScopeState::Active {
            return Ok(());
        }
        self.state = ScopeState::Committed;

        let committed = self
            .session
            .with(|s| {
                if s.is_transaction_active() {
                    s.commit().map(|()| true)
                } else {
                    Ok(false)
                }
            })
            .unwrap_or(Ok(false));

        match committed {
            Ok(true) => {
                debug!(method = %self.method, "Transaction committed");
                Ok(())
            }
            Ok(false) => {
                debug!(method = %self.method, "Transaction already completed, commit skipped");
                Ok(())
            }
            Err(e) => {
                warn!(method = %self.method, error = %e, "Commit failed");
                self.state = ScopeState::Active;
                self.rollback();
                Err(HermesError::transaction("could not commit transaction", e))
            }
        }
    }

    fn rollback(&mut self) {
        if self.state != ScopeState::Active {
            return;
        }
        self.state = ScopeState::RolledBack;

        let rolled_back = self
            .session
            .with(|s| {
                if s.is_transaction_active() {
                    s.rollback().map(|()| true)
                } else {
                    Ok(false)
                }
            })
            .unwrap_or(Ok(false));

        match rolled_back {
            Ok(true) => debug!(method = %self.method, "Transaction rolled back"),
            Ok(false) => {
                debug!(method = %self.method, "Transaction already completed, rollback skipped");
            }
            Err(e) => warn!(method = %self.method, error = %e, "Rollback failed"),
        }
    }

    fn close(&mut self) {
        if self.state == ScopeState::Closed {
            return;
        }
        self.state = ScopeState::Closed;

        if let Some(Err(e)) = self.session.close() {
            warn!(method = %self.method, error = %e, "Failed to close session");
        }
    }
}

impl Drop for UnitOfWorkScope {
    fn drop(&mut self) {
        // Still active here means the call never completed, e.g. a panic.
        self.rollback();
        self.close();
    }
}
