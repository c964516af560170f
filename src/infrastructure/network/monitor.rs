//! In-process connectivity monitor.
//!
//! The platform layer pushes connectivity changes with [`ConnectivityMonitor::update`];
//! subscribers receive the current state on subscription and every change
//! afterwards.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::NetworkState;
use crate::domain::ports::{ConnectivityObserver, ConnectivityPort};

/// Default [`ConnectivityPort`] implementation.
#[derive(Default)]
pub struct ConnectivityMonitor {
    state: Mutex<NetworkState>,
    observers: Mutex<Vec<Weak<dyn ConnectivityObserver>>>,
    // Serializes change delivery so observers see changes in commit order.
    notify: Mutex<()>,
}

impl ConnectivityMonitor {
    /// Creates a monitor starting in `initial`.
    #[must_use]
    pub fn new(initial: NetworkState) -> Self {
        Self {
            state: Mutex::new(initial),
            observers: Mutex::new(Vec::new()),
            notify: Mutex::new(()),
        }
    }

    /// Creates a shared monitor.
    #[must_use]
    pub fn shared(initial: NetworkState) -> Arc<Self> {
        Arc::new(Self::new(initial))
    }

    /// Records a connectivity change and notifies live observers.
    /// Repeating the current state notifies nobody.
    ///
    /// Observers may read [`ConnectivityPort::current`] but must not call
    /// `update` or `subscribe` from their callback.
    pub fn update(&self, state: NetworkState) {
        let _delivery = self.notify.lock();
        {
            let mut current = self.state.lock();
            if *current == state {
                return;
            }
            *current = state;
        }
        debug!(state = %state, "Network state changed");

        // State lock is released so observers may read the current state.
        let live: Vec<Arc<dyn ConnectivityObserver>> = {
            let mut observers = self.observers.lock();
            observers.retain(|o| o.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in live {
            observer.on_network_changed(state.is_metered_only());
        }
    }

    /// Number of observers still alive.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .iter()
            .filter(|o| o.strong_count() > 0)
            .count()
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("state", &*self.state.lock())
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl ConnectivityPort for ConnectivityMonitor {
    fn current(&self) -> NetworkState {
        *self.state.lock()
    }

    fn subscribe(&self, observer: Weak<dyn ConnectivityObserver>) {
        let Some(live) = observer.upgrade() else {
            return;
        };
        let _delivery = self.notify.lock();
        self.observers.lock().push(observer);
        trace!("Connectivity observer subscribed");
        live.on_network_changed(self.current().is_metered_only());
    }
}
