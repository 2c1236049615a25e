use pulse_core::clock;
use pulse_core::notifications::{IncomingNotification, NotificationLog, NotificationRecord};
use pulse_core::store::NotificationStore;
use pulse_link::manager::{ConnectionManager, ConnectionState};
use pulse_link::transport::ChannelTransport;
use pulse_link::IdentityContext;

/// Public surface consumed by UI code: a read-only view over the
/// notification log plus the lifecycle inputs that drive the channel.
/// The log is rehydrated from the store before the channel can produce
/// its first event.
pub struct SyncController {
    log: NotificationLog,
    manager: ConnectionManager,
}

impl SyncController {
    pub fn new(store: Box<dyn NotificationStore>, transport: Box<dyn ChannelTransport>) -> Self {
        let log = NotificationLog::open(store);
        Self { log, manager: ConnectionManager::new(transport) }
    }

    /// Current ordered view, newest first. Copy-on-read: callers never
    /// hold a handle into the log itself.
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.log.snapshot()
    }

    pub fn has_unread(&self) -> bool {
        self.log.has_unread()
    }

    pub fn add_notification(&mut self, candidate: IncomingNotification) -> bool {
        self.log.insert(candidate)
    }

    pub fn mark_as_read(&mut self, id: &str) {
        self.log.mark_read(id);
    }

    pub fn mark_all_as_read(&mut self) {
        self.log.mark_all_read();
    }

    pub fn delete_notification(&mut self, id: &str) {
        self.log.delete(id);
    }

    pub fn clear_notifications(&mut self) {
        self.log.clear();
    }

    pub fn time_ago(&self, timestamp: &str) -> String {
        clock::time_ago(timestamp)
    }

    pub fn set_identity(&mut self, identity: Option<IdentityContext>) {
        self.manager.set_identity(identity);
    }

    pub fn set_active_brand(&mut self, brand: Option<String>) {
        self.manager.set_active_brand(brand);
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// The underlying channel handle, for advanced consumers.
    pub fn channel(&mut self) -> &mut ConnectionManager {
        &mut self.manager
    }

    /// One cooperative cycle: drains the channel and feeds every inbound
    /// notification into the log. Returns how many were accepted. Only
    /// `notification` events mutate the log.
    pub fn tick(&mut self) -> usize {
        let mut accepted = 0;
        for payload in self.manager.pump() {
            let candidate: IncomingNotification = match serde_json::from_value(payload) {
                Ok(candidate) => candidate,
                Err(err) => {
                    log::warn!("dropping undecodable notification payload: {err}");
                    continue;
                }
            };
            if self.log.insert(candidate) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Tears the channel down; later ticks cannot mutate the log.
    pub fn shutdown(&mut self) {
        self.manager.shutdown();
    }
}
