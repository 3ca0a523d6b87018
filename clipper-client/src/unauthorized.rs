//! Process-wide "request failed authorization" callback.
//!
//! The HTTP layer owns a hook and calls [`UnauthorizedHook::notify`] whenever
//! a request is rejected after its refresh attempt; the session manager
//! registers itself as the single handler and unregisters on teardown.

use std::sync::{
    Arc, RwLock,
    atomic::{AtomicU64, Ordering},
};

use futures::future::BoxFuture;
use tracing::debug;

/// Callback invoked on authorization failure.
pub type UnauthorizedHandler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Identifies one registration so a stale owner cannot clear its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationId(u64);

struct Slot {
    id: RegistrationId,
    handler: UnauthorizedHandler,
}

/// Holds at most one [`UnauthorizedHandler`].
#[derive(Clone, Default)]
pub struct UnauthorizedHook {
    slot: Arc<RwLock<Option<Slot>>>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for UnauthorizedHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnauthorizedHook")
            .field("registered", &self.is_registered())
            .finish()
    }
}

impl UnauthorizedHook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler`, replacing any previous one.
    pub fn register(&self, handler: UnauthorizedHandler) -> RegistrationId {
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut guard) = self.slot.write() {
            *guard = Some(Slot { id, handler });
        }
        id
    }

    /// Remove the handler only if `id` is still the current registration.
    pub fn unregister(&self, id: RegistrationId) -> bool {
        match self.slot.write() {
            Ok(mut guard) if guard.as_ref().is_some_and(|slot| slot.id == id) => {
                *guard = None;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.slot.read().is_ok_and(|guard| guard.is_some())
    }

    /// Run the installed handler to completion, if any.
    pub async fn notify(&self) {
        let handler = self
            .slot
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|slot| slot.handler.clone()));

        match handler {
            Some(handler) => handler().await,
            None => debug!("authorization failure with no unauthorized handler registered"),
        }
    }
}
