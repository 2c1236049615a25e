use crate::error::LinkError;
use crate::event::ChannelEvent;
use crate::message::ClientMessage;
use crate::transport::ChannelTransport;
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Default)]
struct Inner {
    connected: bool,
    emit_connected_on_connect: bool,
    queue: VecDeque<ChannelEvent>,
    sent: Vec<ClientMessage>,
    connect_count: usize,
}

/// Deterministic in-memory channel. Cloned handles share state, so a test
/// can keep one handle while the connection manager owns the other.
#[derive(Clone, Default)]
pub struct MemoryChannel {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryChannel {
    /// Channel that surfaces `Connected` as soon as `connect` is called.
    pub fn new() -> Self {
        let channel = Self::default();
        channel.inner.borrow_mut().emit_connected_on_connect = true;
        channel
    }

    /// Channel where every event is scripted by hand.
    pub fn manual() -> Self {
        Self::default()
    }

    pub fn push_event(&self, event: ChannelEvent) {
        self.inner.borrow_mut().queue.push_back(event);
    }

    pub fn push_notification(&self, payload: JsonValue) {
        self.push_event(ChannelEvent::Notification(payload));
    }

    pub fn sent(&self) -> Vec<ClientMessage> {
        self.inner.borrow().sent.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.inner.borrow().connect_count
    }

    pub fn is_connected(&self) -> bool {
        self.inner.borrow().connected
    }

    pub fn queued_len(&self) -> usize {
        self.inner.borrow().queue.len()
    }
}

impl ChannelTransport for MemoryChannel {
    fn connect(&mut self) -> Result<(), LinkError> {
        let mut inner = self.inner.borrow_mut();
        inner.connected = true;
        inner.connect_count += 1;
        if inner.emit_connected_on_connect {
            inner.queue.push_back(ChannelEvent::Connected);
        }
        Ok(())
    }

    fn send(&mut self, message: &ClientMessage) -> Result<(), LinkError> {
        let mut inner = self.inner.borrow_mut();
        if !inner.connected {
            return Err(LinkError::InvalidState("send on a closed channel"));
        }
        inner.sent.push(message.clone());
        Ok(())
    }

    fn poll_event(&mut self) -> Option<ChannelEvent> {
        let mut inner = self.inner.borrow_mut();
        if !inner.connected {
            return None;
        }
        inner.queue.pop_front()
    }

    fn close(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.connected = false;
        inner.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_discards_queued_events() {
        let mut channel = MemoryChannel::new();
        channel.connect().unwrap();
        channel.push_notification(serde_json::json!({ "id": "n1" }));
        channel.close();
        assert!(channel.poll_event().is_none());
        assert_eq!(channel.queued_len(), 0);
    }

    #[test]
    fn send_on_closed_channel_is_a_contract_violation() {
        let mut channel = MemoryChannel::manual();
        let err = channel.send(&ClientMessage::join_room("b1")).unwrap_err();
        assert!(matches!(err, LinkError::InvalidState(_)));
    }
}
