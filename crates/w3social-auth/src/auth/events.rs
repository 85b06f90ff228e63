/*
[INPUT]:  Committed authentication and profile changes
[OUTPUT]: Events handed to notification collaborators
[POS]:    Auth layer - outbound event publication
[UPDATE]: When adding a sink implementation
*/

use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::types::AuthEvent;

/// Receiver of committed events
///
/// Publication is fire-and-forget: a sink failure never undoes or fails
/// the operation that produced the event.
#[async_trait]
pub trait EventSink: Send + Sync + Debug {
    async fn publish(&self, event: AuthEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn publish(&self, _event: AuthEvent) {}
}

/// Logs events as structured records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: AuthEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(address = %event.address(), %payload, "auth event"),
            Err(err) => warn!(error = %err, "failed to serialize auth event"),
        }
    }
}

/// Forwards events to an in-process consumer
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<AuthEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuthEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn publish(&self, event: AuthEvent) {
        if self.sender.send(event).is_err() {
            warn!("event receiver dropped; discarding auth event");
        }
    }
}
