//! Port definitions for network connectivity changes.

use std::sync::Weak;

use crate::domain::NetworkState;

/// Receives connectivity changes.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectivityObserver: Send + Sync {
    /// Called with `true` when the only available network is metered.
    fn on_network_changed(&self, metered_only: bool);
}

/// Source of connectivity changes.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectivityPort: Send + Sync {
    /// Current connectivity.
    fn current(&self) -> NetworkState;

    /// Registers an observer. The current state is delivered right away,
    /// later changes as they happen. Dropped observers are skipped.
    fn subscribe(&self, observer: Weak<dyn ConnectivityObserver>);
}
