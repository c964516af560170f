//! Delivery of request completions to the designated thread.
//!
//! A [`RunLoop`] is bound to the thread that creates it and is shared
//! infrastructure: several [`MessageHandler`]s may be registered and each
//! message is offered to them in registration order until one accepts it.
//! [`MainThreadDispatcher`] is the handler for this pipeline; it only
//! accepts payloads that can be invoked on the designated thread.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tracing::{debug, trace};

use crate::domain::entities::RequestId;
use crate::domain::errors::DispatchError;

/// Stage of a request a message reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum MessageKind {
    Started,
    Progress { completed: u64, total: u64 },
    Completed,
    Failed,
    Canceled,
}

/// Identifies which request a message belongs to and what it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTag {
    /// Request the message belongs to.
    pub request: RequestId,
    /// Reported stage.
    pub kind: MessageKind,
}

impl MessageTag {
    /// Creates a tag.
    #[must_use]
    pub const fn new(request: RequestId, kind: MessageKind) -> Self {
        Self { request, kind }
    }
}

/// Continuation that must run on the designated thread.
pub trait MainThreadCallback: Send {
    /// Runs the continuation; called on the designated thread only.
    fn invoke_on_main_thread(self: Box<Self>, tag: &MessageTag);
}

impl<F> MainThreadCallback for F
where
    F: FnOnce(&MessageTag) + Send,
{
    fn invoke_on_main_thread(self: Box<Self>, tag: &MessageTag) {
        (*self)(tag);
    }
}

/// Message body.
pub enum Payload {
    /// Runs on the designated thread.
    Callback(Box<dyn MainThreadCallback>),
    /// Anything else sharing the run loop.
    Foreign(Box<dyn Any + Send>),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("Callback"),
            Self::Foreign(_) => f.write_str("Foreign"),
        }
    }
}

/// Tagged unit of work posted to a [`RunLoop`].
#[derive(Debug)]
pub struct Message {
    /// Routing information.
    pub tag: MessageTag,
    /// Body.
    pub payload: Payload,
}

/// Result of offering a message to a handler.
#[derive(Debug)]
pub enum HandleOutcome {
    /// Consumed by the handler.
    Handled,
    /// Declined; the message is handed back for the next handler.
    Unhandled(Message),
}

/// Consumer registered on a [`RunLoop`].
pub trait MessageHandler: Send + Sync {
    /// Handles `message` or hands it back.
    fn handle_message(&self, message: Message) -> HandleOutcome;
}

enum Envelope {
    Message(Message),
    Quit,
}

type Handlers = Arc<Mutex<Vec<Arc<dyn MessageHandler>>>>;

/// Single-consumer message loop owned by one thread.
pub struct RunLoop {
    owner: ThreadId,
    receiver: UnboundedReceiver<Envelope>,
    handlers: Handlers,
    unhandled: usize,
}

impl RunLoop {
    /// Creates a loop owned by the calling thread.
    #[must_use]
    pub fn new() -> (Self, RunLoopHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handlers: Handlers = Arc::new(Mutex::new(Vec::new()));
        let run_loop = Self {
            owner: thread::current().id(),
            receiver,
            handlers: handlers.clone(),
            unhandled: 0,
        };
        (
            run_loop,
            RunLoopHandle {
                sender: MessageSender { sender },
                handlers,
            },
        )
    }

    /// Thread allowed to drive the loop.
    #[must_use]
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Messages no handler accepted so far.
    #[must_use]
    pub const fn unhandled(&self) -> usize {
        self.unhandled
    }

    /// Delivers every message already queued, then returns.
    ///
    /// # Errors
    /// Returns [`DispatchError::WrongThread`] off the owner thread.
    pub fn run_pending(&mut self) -> Result<usize, DispatchError> {
        self.check_thread()?;
        let mut delivered = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(Envelope::Message(message)) => {
                    self.deliver(message);
                    delivered += 1;
                }
                Ok(Envelope::Quit) | Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                    return Ok(delivered);
                }
            }
        }
    }

    /// Blocks delivering messages until [`RunLoopHandle::quit`] is called
    /// or every [`RunLoopHandle`], [`MessageSender`] and
    /// [`MainThreadDispatcher`] is dropped. Registered handlers do not keep
    /// the loop alive. Must not be called from async context.
    ///
    /// # Errors
    /// Returns [`DispatchError::WrongThread`] off the owner thread.
    pub fn run(&mut self) -> Result<usize, DispatchError> {
        self.check_thread()?;
        let mut delivered = 0;
        while let Some(Envelope::Message(message)) = self.receiver.blocking_recv() {
            self.deliver(message);
            delivered += 1;
        }
        debug!(delivered, "Run loop stopped");
        Ok(delivered)
    }

    fn check_thread(&self) -> Result<(), DispatchError> {
        if thread::current().id() == self.owner {
            Ok(())
        } else {
            Err(DispatchError::WrongThread)
        }
    }

    fn deliver(&mut self, mut message: Message) {
        // Handlers may register more handlers while running.
        let handlers = self.handlers.lock().clone();
        for handler in handlers {
            match handler.handle_message(message) {
                HandleOutcome::Handled => return,
                HandleOutcome::Unhandled(back) => message = back,
            }
        }
        self.unhandled += 1;
        trace!(request = %message.tag.request, "Message not handled by any consumer");
    }
}

impl fmt::Debug for RunLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLoop")
            .field("owner", &self.owner)
            .field("handlers", &self.handlers.lock().len())
            .field("unhandled", &self.unhandled)
            .finish_non_exhaustive()
    }
}

/// Posts messages to a [`RunLoop`] from any thread.
#[derive(Debug, Clone)]
pub struct MessageSender {
    sender: UnboundedSender<Envelope>,
}

impl MessageSender {
    /// Queues `message`.
    ///
    /// # Errors
    /// Returns [`DispatchError::Closed`] if the loop is gone.
    pub fn post(&self, message: Message) -> Result<(), DispatchError> {
        self.sender
            .send(Envelope::Message(message))
            .map_err(|_| DispatchError::Closed)
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(m) => m.fmt(f),
            Self::Quit => f.write_str("Quit"),
        }
    }
}

/// Cloneable access to a [`RunLoop`] for producers and handlers.
#[derive(Clone)]
pub struct RunLoopHandle {
    sender: MessageSender,
    handlers: Handlers,
}

impl RunLoopHandle {
    /// Sender usable without handler access.
    #[must_use]
    pub fn sender(&self) -> MessageSender {
        self.sender.clone()
    }

    /// Queues `message`.
    ///
    /// # Errors
    /// Returns [`DispatchError::Closed`] if the loop is gone.
    pub fn post(&self, message: Message) -> Result<(), DispatchError> {
        self.sender.post(message)
    }

    /// Appends a handler; it is offered messages after existing ones.
    pub fn add_handler(&self, handler: Arc<dyn MessageHandler>) {
        self.handlers.lock().push(handler);
    }

    /// Stops a blocking [`RunLoop::run`] after queued messages.
    pub fn quit(&self) {
        let _ = self.sender.sender.send(Envelope::Quit);
    }
}

impl fmt::Debug for RunLoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLoopHandle").finish_non_exhaustive()
    }
}

/// Runs continuations on the loop's thread. Holds no sender, so
/// registering it does not keep the channel open.
#[derive(Debug)]
struct CallbackRunner;

impl MessageHandler for CallbackRunner {
    fn handle_message(&self, message: Message) -> HandleOutcome {
        let Message { tag, payload } = message;
        match payload {
            Payload::Callback(callback) => {
                callback.invoke_on_main_thread(&tag);
                HandleOutcome::Handled
            }
            payload @ Payload::Foreign(_) => HandleOutcome::Unhandled(Message { tag, payload }),
        }
    }
}

/// Posts request continuations to the designated thread and runs them
/// there. Payloads without a continuation are left to other handlers.
///
/// Messages from one producer arrive in post order. A panicking
/// continuation is not caught.
#[derive(Debug)]
pub struct MainThreadDispatcher {
    sender: MessageSender,
}

impl MainThreadDispatcher {
    /// Creates a dispatcher and registers its continuation runner on the
    /// loop behind `handle`.
    #[must_use]
    pub fn attach(handle: &RunLoopHandle) -> Arc<Self> {
        handle.add_handler(Arc::new(CallbackRunner));
        Arc::new(Self {
            sender: handle.sender(),
        })
    }

    /// Posts a tagged payload.
    ///
    /// # Errors
    /// Returns [`DispatchError::Closed`] if the loop is gone.
    pub fn post(&self, tag: MessageTag, payload: Payload) -> Result<(), DispatchError> {
        self.sender.post(Message { tag, payload })
    }

    /// Posts `callback` to run on the designated thread.
    ///
    /// # Errors
    /// Returns [`DispatchError::Closed`] if the loop is gone.
    pub fn post_callback<F>(&self, tag: MessageTag, callback: F) -> Result<(), DispatchError>
    where
        F: FnOnce(&MessageTag) + Send + 'static,
    {
        self.post(tag, Payload::Callback(Box::new(callback)))
    }
}

impl MessageHandler for MainThreadDispatcher {
    fn handle_message(&self, message: Message) -> HandleOutcome {
        CallbackRunner.handle_message(message)
    }
}
