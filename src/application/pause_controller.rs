//! Download pause policy combining a manual switch with network awareness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tracing::debug;

use super::slot::PolicyFlag;
use crate::domain::ports::{ConnectivityObserver, ConnectivityPort};

/// Decides whether downloads are currently paused.
///
/// Built once with the hub in a disabled state. The connectivity
/// subscription is registered the first time automatic pausing is enabled
/// and kept for the controller's lifetime; disabling only flips a flag.
pub struct PauseController {
    manual: PolicyFlag,
    auto_enabled: AtomicBool,
    metered_only: AtomicBool,
    subscribed: AtomicBool,
    connectivity: Arc<dyn ConnectivityPort>,
}

impl PauseController {
    /// Creates a controller with both drivers off.
    #[must_use]
    pub fn new(connectivity: Arc<dyn ConnectivityPort>) -> Arc<Self> {
        Arc::new(Self {
            manual: PolicyFlag::new("pauseDownload", false),
            auto_enabled: AtomicBool::new(false),
            metered_only: AtomicBool::new(false),
            subscribed: AtomicBool::new(false),
            connectivity,
        })
    }

    /// Sets the manual override. Returns true if the value changed.
    pub fn set_manual_pause(&self, paused: bool) -> bool {
        self.manual.set(paused)
    }

    /// Manual override.
    #[must_use]
    pub fn is_manual_pause(&self) -> bool {
        self.manual.get()
    }

    /// Turns pause-on-metered-network on or off.
    /// Returns true if the value changed.
    pub fn set_auto_pause_enabled(self: &Arc<Self>, enabled: bool) -> bool {
        if enabled && !self.subscribed.swap(true, Ordering::AcqRel) {
            self.metered_only
                .store(self.connectivity.current().is_metered_only(), Ordering::Release);
            let observer: Arc<dyn ConnectivityObserver> = self.clone();
            let observer: Weak<dyn ConnectivityObserver> = Arc::downgrade(&observer);
            self.connectivity.subscribe(observer);
            debug!("Subscribed to connectivity changes");
        }

        let changed = self
            .auto_enabled
            .compare_exchange(!enabled, enabled, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if changed {
            debug!(flag = "mobileNetworkPauseDownload", value = enabled, "set");
        }
        changed
    }

    /// True if pause-on-metered-network is on.
    #[must_use]
    pub fn is_auto_pause_enabled(&self) -> bool {
        self.auto_enabled.load(Ordering::Acquire)
    }

    /// True if only a metered network was available at the last change.
    #[must_use]
    pub fn is_metered_only(&self) -> bool {
        self.metered_only.load(Ordering::Acquire)
    }

    /// `manual || (auto_enabled && metered_only)`.
    #[must_use]
    pub fn effective_paused(&self) -> bool {
        self.is_manual_pause() || (self.is_auto_pause_enabled() && self.is_metered_only())
    }
}

impl ConnectivityObserver for PauseController {
    fn on_network_changed(&self, metered_only: bool) {
        let previous = self.metered_only.swap(metered_only, Ordering::AcqRel);
        if previous != metered_only {
            debug!(metered_only, "Download pause network state changed");
        }
    }
}

impl std::fmt::Debug for PauseController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PauseController")
            .field("manual", &self.is_manual_pause())
            .field("auto_enabled", &self.is_auto_pause_enabled())
            .field("metered_only", &self.is_metered_only())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NetworkState;
    use crate::domain::ports::mocks::MockConnectivityPort;
    use crate::infrastructure::network::ConnectivityMonitor;
    use test_case::test_case;

    fn quiet_port(state: NetworkState) -> Arc<dyn ConnectivityPort> {
        let mut port = MockConnectivityPort::new();
        port.expect_current().return_const(state);
        port.expect_subscribe().times(1).return_const(());
        Arc::new(port)
    }

    #[test]
    fn test_starts_unpaused_without_subscribing() {
        let mut port = MockConnectivityPort::new();
        port.expect_subscribe().never();
        let controller = PauseController::new(Arc::new(port));

        assert!(!controller.effective_paused());
        assert!(!controller.set_auto_pause_enabled(false));
    }

    #[test]
    fn test_subscribes_once_across_toggles() {
        let controller = PauseController::new(quiet_port(NetworkState::Metered));

        assert!(controller.set_auto_pause_enabled(true));
        assert!(controller.set_auto_pause_enabled(false));
        assert!(controller.set_auto_pause_enabled(true));
        assert!(!controller.set_auto_pause_enabled(true));
    }

    #[test_case(true, false, false, true ; "manual wins when auto disabled")]
    #[test_case(true, true, false, true ; "manual wins on unmetered network")]
    #[test_case(false, false, true, false ; "metered ignored when auto disabled")]
    #[test_case(false, true, false, false ; "unmetered network does not pause")]
    #[test_case(false, true, true, true ; "metered only pauses when enabled")]
    fn test_effective_paused(manual: bool, auto: bool, metered_only: bool, expected: bool) {
        let controller = PauseController::new(quiet_port(NetworkState::Unmetered));
        controller.set_auto_pause_enabled(true);
        controller.set_auto_pause_enabled(auto);
        controller.set_manual_pause(manual);
        controller.on_network_changed(metered_only);

        assert_eq!(controller.effective_paused(), expected);
    }

    #[test]
    fn test_follows_monitor_changes() {
        let monitor = ConnectivityMonitor::shared(NetworkState::Metered);
        let controller = PauseController::new(monitor.clone());

        controller.set_auto_pause_enabled(true);
        assert!(controller.effective_paused());

        monitor.update(NetworkState::Unmetered);
        assert!(!controller.effective_paused());

        monitor.update(NetworkState::Metered);
        controller.set_auto_pause_enabled(false);
        assert!(!controller.effective_paused());
        assert_eq!(monitor.observer_count(), 1);
    }

    #[test]
    fn test_subscription_does_not_keep_controller_alive() {
        let monitor = ConnectivityMonitor::shared(NetworkState::Unmetered);
        let controller = PauseController::new(monitor.clone());
        controller.set_auto_pause_enabled(true);

        drop(controller);
        assert_eq!(monitor.observer_count(), 0);
    }
}
