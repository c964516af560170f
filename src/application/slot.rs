//! Registry slots holding the active strategy for each role.
//!
//! Every slot has its own lock, so swapping one strategy never waits on
//! another. Readers get an `Arc` to the instance that was current when
//! they asked; in-flight work may keep using a replaced instance.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::domain::errors::CacheError;
use crate::domain::ports::{Identify, Retire};

fn same_instance<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Slot holding exactly one active implementation of a plain strategy.
pub struct StrategyHandle<T: ?Sized> {
    name: &'static str,
    current: RwLock<Arc<T>>,
}

impl<T: ?Sized + Identify> StrategyHandle<T> {
    /// Creates a slot with its default instance installed.
    #[must_use]
    pub fn new(name: &'static str, initial: Arc<T>) -> Self {
        Self {
            name,
            current: RwLock::new(initial),
        }
    }

    /// Slot name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the current instance.
    #[must_use]
    pub fn get(&self) -> Arc<T> {
        self.current.read().clone()
    }

    /// Installs `candidate`. `None` leaves the slot untouched.
    ///
    /// Returns true if something was installed.
    pub fn set(&self, candidate: Option<Arc<T>>) -> bool {
        let Some(candidate) = candidate else {
            return false;
        };
        let identifier = candidate.identifier();
        *self.current.write() = candidate;
        debug!(slot = %self.name, strategy = %identifier, "set");
        true
    }

    /// Appends the current instance's identifier.
    ///
    /// # Errors
    /// Propagates formatter errors from `out`.
    pub fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.current.read().append_identifier(out)
    }
}

impl<T: ?Sized> fmt::Debug for StrategyHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// What happened on a [`CacheLifecycle::set`] call.
#[derive(Debug)]
pub enum Replacement {
    /// No candidate was given; nothing changed.
    Ignored,
    /// The candidate is installed and the previous instance was retired.
    Replaced,
    /// The candidate is installed; retiring the previous instance failed.
    ReplacedWithTeardownError(CacheError),
}

impl Replacement {
    /// True if a new instance was installed.
    #[must_use]
    pub const fn is_installed(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Slot for a resource that has to be retired before it is replaced.
///
/// The write lock is held across retirement and installation, so a reader
/// sees either the old instance before retirement started or the new one.
/// Readers arriving mid-retirement block until the candidate is installed.
/// For the same reason [`Retire::retire`] must not read this slot.
pub struct CacheLifecycle<T: ?Sized> {
    name: &'static str,
    current: RwLock<Arc<T>>,
}

impl<T: ?Sized + Identify + Retire> CacheLifecycle<T> {
    /// Creates a slot with its default instance installed.
    #[must_use]
    pub fn new(name: &'static str, initial: Arc<T>) -> Self {
        Self {
            name,
            current: RwLock::new(initial),
        }
    }

    /// Slot name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the current instance.
    #[must_use]
    pub fn get(&self) -> Arc<T> {
        self.current.read().clone()
    }

    /// Retires the current instance and installs `candidate`.
    /// `None` leaves the slot untouched and retires nothing.
    ///
    /// Teardown failures are logged and reported in the return value; the
    /// candidate is installed regardless.
    pub fn set(&self, candidate: Option<Arc<T>>) -> Replacement {
        let Some(candidate) = candidate else {
            return Replacement::Ignored;
        };
        let identifier = candidate.identifier();

        let mut current = self.current.write();
        // Re-installing the active instance must not retire it.
        let teardown = if same_instance(&*current, &candidate) {
            Ok(())
        } else {
            current.retire()
        };
        *current = candidate;
        drop(current);

        debug!(slot = %self.name, strategy = %identifier, "set");
        match teardown {
            Ok(()) => Replacement::Replaced,
            Err(e) => {
                warn!(slot = %self.name, error = %e, "Failed to retire replaced cache");
                Replacement::ReplacedWithTeardownError(e)
            }
        }
    }

    /// Appends the current instance's identifier.
    ///
    /// # Errors
    /// Propagates formatter errors from `out`.
    pub fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.current.read().append_identifier(out)
    }
}

impl<T: ?Sized> fmt::Debug for CacheLifecycle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLifecycle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Boolean policy switch whose setter only acts on real changes.
#[derive(Debug)]
pub struct PolicyFlag {
    name: &'static str,
    value: AtomicBool,
}

impl PolicyFlag {
    /// Creates a flag with an initial value.
    #[must_use]
    pub const fn new(name: &'static str, initial: bool) -> Self {
        Self {
            name,
            value: AtomicBool::new(initial),
        }
    }

    /// Flag name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    /// Sets the flag. Returns true if the value changed; setting the
    /// current value neither writes nor logs.
    pub fn set(&self, value: bool) -> bool {
        let changed = self
            .value
            .compare_exchange(!value, value, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if changed {
            debug!(flag = %self.name, value, "set");
        }
        changed
    }
}
