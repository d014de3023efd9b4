//! Mock implementations of the connector collaborator traits
//!
//! `MockMessageSender` stands in for a single Alpha endpoint. Its send and
//! connect outcomes are scripted so that failover and reconnect paths can be
//! driven deterministically without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use omega_core::{
    AlphaResponse, CompensateCommand, MessageHandler, MessageSender, OmegaError, OmegaResult,
    TxEvent,
};

/// Outcome of one scripted send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBehavior {
    /// Accept the event
    Succeed,
    /// Accept the event and answer with `aborted = true`
    Abort,
    /// Reject the event at the application level
    Reject,
    /// Fail with a transport error
    Fail,
}

/// Scripted in-memory Alpha endpoint
#[derive(Debug)]
pub struct MockMessageSender {
    target: String,
    latency: Duration,
    send_script: Mutex<VecDeque<SendBehavior>>,
    default_send: Mutex<SendBehavior>,
    connect_failures_remaining: AtomicUsize,
    fail_all_connects: AtomicBool,
    fail_on_disconnect: AtomicBool,
    send_attempts: AtomicUsize,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    closed: AtomicBool,
    delivered: Mutex<Vec<TxEvent>>,
}

impl MockMessageSender {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            latency: Duration::ZERO,
            send_script: Mutex::new(VecDeque::new()),
            default_send: Mutex::new(SendBehavior::Succeed),
            connect_failures_remaining: AtomicUsize::new(0),
            fail_all_connects: AtomicBool::new(false),
            fail_on_disconnect: AtomicBool::new(false),
            send_attempts: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// Every send sleeps for `latency` before resolving
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Outcomes consumed one per send, falling back to the default afterwards
    pub fn with_script(self, script: Vec<SendBehavior>) -> Self {
        *self.send_script.lock().unwrap() = script.into();
        self
    }

    pub fn with_default(self, behavior: SendBehavior) -> Self {
        *self.default_send.lock().unwrap() = behavior;
        self
    }

    /// Shorthand for a sender whose every send is a transport failure
    pub fn failing(target: impl Into<String>) -> Self {
        Self::new(target).with_default(SendBehavior::Fail)
    }

    /// The first `count` calls to `on_connected` fail
    pub fn fail_connects(self, count: usize) -> Self {
        self.connect_failures_remaining
            .store(count, Ordering::SeqCst);
        self
    }

    /// Every call to `on_connected` fails
    pub fn always_fail_connects(self) -> Self {
        self.fail_all_connects.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_disconnects(self) -> Self {
        self.fail_on_disconnect.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_default(&self, behavior: SendBehavior) {
        *self.default_send.lock().unwrap() = behavior;
    }

    pub fn set_connects_failing(&self, failing: bool) {
        self.fail_all_connects.store(failing, Ordering::SeqCst);
    }

    pub fn send_attempts(&self) -> usize {
        self.send_attempts.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn delivered_events(&self) -> Vec<TxEvent> {
        self.delivered.lock().unwrap().clone()
    }

    fn next_behavior(&self) -> SendBehavior {
        let scripted = self.send_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| *self.default_send.lock().unwrap())
    }
}

#[async_trait]
impl MessageSender for MockMessageSender {
    fn target(&self) -> &str {
        &self.target
    }

    async fn on_connected(&self) -> OmegaResult<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_all_connects.load(Ordering::SeqCst) {
            return Err(OmegaError::Transport(format!(
                "{} is unreachable",
                self.target
            )));
        }

        let remaining = self.connect_failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.connect_failures_remaining
                .store(remaining - 1, Ordering::SeqCst);
            return Err(OmegaError::Transport(format!(
                "{} refused connection",
                self.target
            )));
        }

        Ok(())
    }

    async fn on_disconnected(&self) -> OmegaResult<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_on_disconnect.load(Ordering::SeqCst) {
            return Err(OmegaError::Transport(format!(
                "{} dropped disconnect",
                self.target
            )));
        }

        Ok(())
    }

    async fn send(&self, event: &TxEvent) -> OmegaResult<AlphaResponse> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.next_behavior() {
            SendBehavior::Succeed => {
                self.delivered.lock().unwrap().push(event.clone());
                Ok(AlphaResponse::new(false))
            }
            SendBehavior::Abort => {
                self.delivered.lock().unwrap().push(event.clone());
                Ok(AlphaResponse::new(true))
            }
            SendBehavior::Reject => Err(OmegaError::Rejected(format!(
                "{} rejected {}",
                self.target, event.local_tx_id
            ))),
            SendBehavior::Fail => Err(OmegaError::Transport(format!(
                "connection to {} reset",
                self.target
            ))),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Handler that records every compensation command it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    commands: Arc<Mutex<Vec<CompensateCommand>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<CompensateCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }
}

impl MessageHandler for RecordingHandler {
    fn on_receive(&self, command: CompensateCommand) {
        self.commands.lock().unwrap().push(command);
    }
}
