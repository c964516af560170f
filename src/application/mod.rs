//! Application layer: the configuration hub and its building blocks.

/// The hub itself.
pub mod configuration;
/// Designated-thread message delivery.
pub mod dispatcher;
/// Download pause policy.
pub mod pause_controller;
/// Strategy and cache slots.
pub mod slot;

#[cfg(test)]
mod configuration_test;

pub use configuration::{Configuration, HubEnvironment, HubOptions, TeardownListener};
pub use dispatcher::{
    HandleOutcome, MainThreadCallback, MainThreadDispatcher, Message, MessageHandler,
    MessageKind, MessageSender, MessageTag, Payload, RunLoop, RunLoopHandle,
};
pub use pause_controller::PauseController;
pub use slot::{CacheLifecycle, PolicyFlag, Replacement, StrategyHandle};
