//! Lifecycle events published by [BeanContext](crate::context::BeanContext).

use crate::bean::BeanIdentifier;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use tracing::trace;

pub type ContextEventListenerPtr = Arc<dyn ContextEventListener + Send + Sync>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContextEvent {
    /// All eager beans have been created.
    Started,
    BeanCreated(BeanIdentifier),
    BeanDestroyed(BeanIdentifier),
    /// All cached beans have been destroyed.
    Stopped,
}

#[cfg_attr(test, automock)]
pub trait ContextEventListener {
    fn on_event(&self, event: &ContextEvent);
}

/// Delivers events to listeners synchronously, in registration order.
#[derive(Clone, Default)]
pub struct EventPublisher {
    listeners: Vec<ContextEventListenerPtr>,
}

impl EventPublisher {
    pub fn new(listeners: Vec<ContextEventListenerPtr>) -> Self {
        Self { listeners }
    }

    pub fn publish(&self, event: ContextEvent) {
        trace!(?event, "Publishing context event");
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }
}
