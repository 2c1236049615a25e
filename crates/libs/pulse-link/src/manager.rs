use crate::event::ChannelEvent;
use crate::identity::IdentityContext;
use crate::message::ClientMessage;
use crate::transport::ChannelTransport;
use serde_json::Value as JsonValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Owns one physical channel per authenticated identity. The channel is
/// open only while an identity is present and is torn down unconditionally
/// the moment the identity disappears or changes, even mid-dial.
pub struct ConnectionManager {
    transport: Box<dyn ChannelTransport>,
    state: ConnectionState,
    identity: Option<IdentityContext>,
    active_brand: Option<String>,
}

impl ConnectionManager {
    pub fn new(transport: Box<dyn ChannelTransport>) -> Self {
        Self {
            transport,
            state: ConnectionState::Idle,
            identity: None,
            active_brand: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn identity(&self) -> Option<&IdentityContext> {
        self.identity.as_ref()
    }

    pub fn active_brand(&self) -> Option<&str> {
        self.active_brand.as_deref()
    }

    /// Applies the identity observed by the host application. `None` tears
    /// the channel down; a changed identity tears down and reopens.
    pub fn set_identity(&mut self, identity: Option<IdentityContext>) {
        if self.identity == identity {
            return;
        }
        if self.identity.is_some() {
            self.teardown();
        }
        self.identity = identity;
        if self.identity.is_some() {
            self.open();
        }
    }

    /// Applies the active tenant context. While connected, a brand change
    /// joins the new room immediately; otherwise the room is joined
    /// retroactively on the next `Connected` transition.
    pub fn set_active_brand(&mut self, brand: Option<String>) {
        if self.active_brand == brand {
            return;
        }
        self.active_brand = brand;
        if self.state == ConnectionState::Connected {
            if let Some(brand_id) = self.active_brand.clone() {
                self.send(ClientMessage::join_room(brand_id));
            }
        }
    }

    /// Drains the transport and returns the notification payloads that
    /// arrived, oldest first. Registration and room subscription happen
    /// here, on every `Connected` transition the transport surfaces.
    pub fn pump(&mut self) -> Vec<JsonValue> {
        if self.state == ConnectionState::Idle {
            return Vec::new();
        }
        let mut inbound = Vec::new();
        while let Some(event) = self.transport.poll_event() {
            match event {
                ChannelEvent::Connected => self.on_connected(),
                ChannelEvent::Disconnected => {
                    log::debug!("channel disconnected, waiting for transport retry");
                    self.state = ConnectionState::Disconnected;
                }
                ChannelEvent::Notification(payload) => inbound.push(payload),
            }
        }
        inbound
    }

    /// Unsubscribe-all-and-close: used at component teardown.
    pub fn shutdown(&mut self) {
        self.teardown();
        self.identity = None;
        self.active_brand = None;
    }

    fn open(&mut self) {
        self.state = ConnectionState::Connecting;
        log::debug!("channel connecting");
        if let Err(err) = self.transport.connect() {
            log::warn!("channel connect failed: {err}");
            self.state = ConnectionState::Disconnected;
        }
    }

    fn teardown(&mut self) {
        self.transport.close();
        self.state = ConnectionState::Idle;
        log::debug!("channel torn down");
    }

    fn on_connected(&mut self) {
        self.state = ConnectionState::Connected;
        let Some(identity) = self.identity.clone() else {
            return;
        };
        log::debug!("channel connected, registering {}", identity.user_id);
        self.send(ClientMessage::register(&identity));
        if let Some(brand_id) = self.active_brand.clone() {
            self.send(ClientMessage::join_room(brand_id));
        }
    }

    fn send(&mut self, message: ClientMessage) {
        if let Err(err) = self.transport.send(&message) {
            log::warn!("channel send failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryChannel;
    use serde_json::json;

    fn identity(user_id: &str) -> IdentityContext {
        IdentityContext {
            user_id: user_id.into(),
            full_name: "Asha Rao".into(),
            is_admin: false,
            roles: vec!["sales".into()],
            assigned_brands: vec!["b1".into()],
        }
    }

    fn manager_with_channel() -> (ConnectionManager, MemoryChannel) {
        let channel = MemoryChannel::new();
        let manager = ConnectionManager::new(Box::new(channel.clone()));
        (manager, channel)
    }

    #[test]
    fn starts_idle_and_ignores_pump() {
        let (mut manager, channel) = manager_with_channel();
        assert_eq!(manager.state(), ConnectionState::Idle);
        assert!(manager.pump().is_empty());
        assert_eq!(channel.connect_count(), 0);
    }

    #[test]
    fn identity_arrival_connects_and_registers() {
        let (mut manager, channel) = manager_with_channel();
        manager.set_identity(Some(identity("u1")));
        assert_eq!(manager.state(), ConnectionState::Connecting);

        manager.pump();
        assert_eq!(manager.state(), ConnectionState::Connected);
        let sent = channel.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], ClientMessage::Register(payload) if payload.user_id == "u1"));
    }

    #[test]
    fn same_identity_is_a_no_op() {
        let (mut manager, channel) = manager_with_channel();
        manager.set_identity(Some(identity("u1")));
        manager.pump();
        manager.set_identity(Some(identity("u1")));
        assert_eq!(channel.connect_count(), 1);
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[test]
    fn brand_known_before_connect_is_joined_retroactively() {
        let (mut manager, channel) = manager_with_channel();
        manager.set_active_brand(Some("b9".into()));
        manager.set_identity(Some(identity("u1")));
        manager.pump();

        let sent = channel.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], ClientMessage::join_room("b9"));
    }

    #[test]
    fn brand_change_while_connected_joins_immediately() {
        let (mut manager, channel) = manager_with_channel();
        manager.set_identity(Some(identity("u1")));
        manager.pump();

        manager.set_active_brand(Some("b2".into()));
        manager.set_active_brand(Some("b3".into()));
        let sent = channel.sent();
        assert_eq!(sent[1], ClientMessage::join_room("b2"));
        assert_eq!(sent[2], ClientMessage::join_room("b3"));
    }

    #[test]
    fn clearing_the_brand_sends_nothing() {
        let (mut manager, channel) = manager_with_channel();
        manager.set_identity(Some(identity("u1")));
        manager.pump();
        manager.set_active_brand(None);
        assert_eq!(channel.sent().len(), 1);
    }

    #[test]
    fn reconnect_registers_and_rejoins_again() {
        let (mut manager, channel) = manager_with_channel();
        manager.set_active_brand(Some("b1".into()));
        manager.set_identity(Some(identity("u1")));
        manager.pump();

        channel.push_event(ChannelEvent::Disconnected);
        manager.pump();
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        channel.push_event(ChannelEvent::Connected);
        manager.pump();
        assert_eq!(manager.state(), ConnectionState::Connected);

        let sent = channel.sent();
        assert_eq!(sent.len(), 4);
        assert!(matches!(&sent[2], ClientMessage::Register(_)));
        assert_eq!(sent[3], ClientMessage::join_room("b1"));
    }

    #[test]
    fn identity_change_tears_down_and_reopens() {
        let (mut manager, channel) = manager_with_channel();
        manager.set_identity(Some(identity("u1")));
        manager.pump();

        manager.set_identity(Some(identity("u2")));
        assert_eq!(channel.connect_count(), 2);
        manager.pump();
        let sent = channel.sent();
        assert!(matches!(&sent[1], ClientMessage::Register(payload) if payload.user_id == "u2"));
    }

    #[test]
    fn identity_change_mid_dial_still_tears_down() {
        let channel = MemoryChannel::manual();
        let mut manager = ConnectionManager::new(Box::new(channel.clone()));
        manager.set_identity(Some(identity("u1")));
        assert_eq!(manager.state(), ConnectionState::Connecting);

        manager.set_identity(None);
        assert_eq!(manager.state(), ConnectionState::Idle);
        assert!(!channel.is_connected());
    }

    #[test]
    fn identity_removal_discards_already_queued_events() {
        let (mut manager, channel) = manager_with_channel();
        manager.set_identity(Some(identity("u1")));
        manager.pump();

        channel.push_notification(json!({ "id": "late" }));
        manager.set_identity(None);
        assert!(manager.pump().is_empty());
    }

    #[test]
    fn notifications_are_surfaced_in_arrival_order() {
        let (mut manager, channel) = manager_with_channel();
        manager.set_identity(Some(identity("u1")));
        channel.push_notification(json!({ "id": "n1" }));
        channel.push_notification(json!({ "id": "n2" }));

        let inbound = manager.pump();
        assert_eq!(inbound, vec![json!({ "id": "n1" }), json!({ "id": "n2" })]);
    }

    #[test]
    fn shutdown_clears_identity_and_brand() {
        let (mut manager, channel) = manager_with_channel();
        manager.set_active_brand(Some("b1".into()));
        manager.set_identity(Some(identity("u1")));
        manager.pump();

        manager.shutdown();
        assert_eq!(manager.state(), ConnectionState::Idle);
        assert!(manager.identity().is_none());
        assert!(manager.active_brand().is_none());
        assert!(!channel.is_connected());
    }
}
