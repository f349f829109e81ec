//! View scopes.
//!
//! A [`ViewScope`] stands for one live screen. Work started on behalf of the
//! screen carries a [`ScopeToken`]; once the scope is closed or dropped,
//! results that arrive late are discarded instead of touching shared state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owner handle of a live view. Closing or dropping it deactivates every
/// token handed out from it.
#[derive(Debug)]
pub struct ViewScope {
    token: ScopeToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            token: ScopeToken {
                active: Arc::new(AtomicBool::new(true)),
            },
        }
    }

    /// Cheap handle for in-flight work
    pub fn token(&self) -> ScopeToken {
        self.token.clone()
    }

    pub fn is_active(&self) -> bool {
        self.token.is_active()
    }

    pub fn close(&self) {
        self.token.active.store(false, Ordering::SeqCst);
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.close();
    }
}

/// Shared liveness flag of a [`ViewScope`]
#[derive(Debug, Clone)]
pub struct ScopeToken {
    active: Arc<AtomicBool>,
}

impl ScopeToken {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
