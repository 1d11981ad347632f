//! Transactional session capability.
//!
//! The pipeline opens one [`Session`] per transactional call through an
//! injected [`SessionFactory`]. While the call runs the session is bound to
//! the call's [`Exchange`](crate::Exchange) so the service method can use it
//! through a [`SessionHandle`].

use crate::error::{BoxError, HermesResult};
use crate::method::TxOptions;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opens sessions for units of work.
pub trait SessionFactory: Send + Sync {
    /// Opens a new session exclusively owned by the caller.
    fn open_session(&self) -> HermesResult<Box<dyn Session>>;
}

/// A transactional resource handle.
pub trait Session: Send {
    /// Applies read-only, cache and flush settings before any domain code runs.
    fn configure(&mut self, options: &TxOptions);

    /// Begins a transaction.
    fn begin_transaction(&mut self) -> Result<(), BoxError>;

    /// Returns `true` while a begun transaction has been neither committed
    /// nor rolled back.
    fn is_transaction_active(&self) -> bool;

    /// Commits the active transaction.
    fn commit(&mut self) -> Result<(), BoxError>;

    /// Rolls back the active transaction.
    fn rollback(&mut self) -> Result<(), BoxError>;

    /// Releases the session.
    fn close(&mut self) -> Result<(), BoxError>;

    /// Gives domain code access to the concrete session type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

type Slot = Arc<Mutex<Option<Box<dyn Session>>>>;

/// The session of one call, owned by the stage that opened it.
///
/// Hands out [`SessionHandle`]s for the call's exchange. Closing the session
/// takes it out of the shared slot, so every handle is dead afterwards.
pub struct OwnedSession {
    slot: Slot,
}

impl OwnedSession {
    /// Takes ownership of an open session.
    #[must_use]
    pub fn new(session: Box<dyn Session>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(session))),
        }
    }

    /// Returns a handle to bind to the call's exchange.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            slot: Arc::clone(&self.slot),
        }
    }

    /// Runs `f` with exclusive access to the session.
    ///
    /// Returns `None` once the session is closed.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Session) -> R) -> Option<R> {
        self.slot.lock().as_mut().map(|s| f(s.as_mut()))
    }

    /// Closes the session and detaches it from every handle.
    ///
    /// Returns `None` if it was already closed.
    pub fn close(&self) -> Option<Result<(), BoxError>> {
        let session = self.slot.lock().take();
        session.map(|mut s| s.close())
    }

    /// Returns `true` once [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl fmt::Debug for OwnedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedSession")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Access to the session bound to the current call.
///
/// Handles cannot be cloned and stop working once the session is closed,
/// so the session never outlives its call.
pub struct SessionHandle {
    slot: Slot,
}

impl SessionHandle {
    /// Runs `f` with exclusive access to the session.
    ///
    /// Returns `None` once the session is closed.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Session) -> R) -> Option<R> {
        self.slot.lock().as_mut().map(|s| f(s.as_mut()))
    }

    /// Runs `f` with the session downcast to `S`, if it is one and still open.
    pub fn with_typed<S: Session + 'static, R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        let mut guard = self.slot.lock();
        guard
            .as_mut()
            .and_then(|s| s.as_any_mut().downcast_mut::<S>())
            .map(f)
    }

    /// Returns `true` while the session is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("open", &self.is_open())
            .finish()
    }
}
