use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct GateState {
    total: usize,
    routes: HashMap<String, usize>,
}

/// Counting gate over concurrent requests, per route and overall.
///
/// [`ConnectionGate::acquire`] blocks while either limit is reached. The
/// returned [`Permit`] gives its slot back when dropped.
#[derive(Debug)]
pub struct ConnectionGate {
    max_per_route: usize,
    max_total: usize,
    state: Mutex<GateState>,
    released: Condvar,
}

impl ConnectionGate {
    pub fn new(max_per_route: usize, max_total: usize) -> Self {
        Self {
            max_per_route: max_per_route.max(1),
            max_total: max_total.max(1),
            state: Mutex::new(GateState::default()),
            released: Condvar::new(),
        }
    }

    /// Take a slot for `route`, waiting until one is free.
    pub fn acquire(self: &Arc<Self>, route: &str) -> Permit {
        let mut state = self.lock();
        let mut waited = false;
        loop {
            let on_route = state.routes.get(route).copied().unwrap_or(0);
            if state.total < self.max_total && on_route < self.max_per_route {
                break;
            }
            if !waited {
                tracing::debug!(route, in_flight = state.total, "waiting for a connection slot");
                waited = true;
            }
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.total += 1;
        *state.routes.entry(route.to_string()).or_insert(0) += 1;
        Permit {
            gate: Arc::clone(self),
            route: route.to_string(),
        }
    }

    /// Requests currently holding a slot.
    pub fn in_use(&self) -> usize {
        self.lock().total
    }

    /// Requests currently holding a slot on `route`.
    pub fn in_use_for(&self, route: &str) -> usize {
        self.lock().routes.get(route).copied().unwrap_or(0)
    }

    pub fn max_per_route(&self) -> usize {
        self.max_per_route
    }

    pub fn max_total(&self) -> usize {
        self.max_total
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, route: &str) {
        let mut state = self.lock();
        state.total = state.total.saturating_sub(1);
        if let Some(count) = state.routes.get_mut(route) {
            *count -= 1;
            if *count == 0 {
                state.routes.remove(route);
            }
        }
        drop(state);
        self.released.notify_all();
    }
}

/// A held slot. Released on drop.
#[derive(Debug)]
pub struct Permit {
    gate: Arc<ConnectionGate>,
    route: String,
}

impl Permit {
    pub fn route(&self) -> &str {
        &self.route
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.gate.release(&self.route);
    }
}
