pub mod controller;

pub use controller::SyncController;

pub use pulse_core::{
    time_ago, FileStore, IncomingNotification, MemoryStore, NotificationBody, NotificationLog,
    NotificationRecord, NotificationStore, StoreError, LOG_CAPACITY,
};
pub use pulse_link::{
    ChannelEvent, ChannelTransport, ClientMessage, ConnectionManager, ConnectionState,
    IdentityContext, LinkError, MemoryChannel, TcpChannel,
};
