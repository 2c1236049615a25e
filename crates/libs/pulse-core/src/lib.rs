pub mod clock;
pub mod error;
pub mod notifications;
pub mod store;

pub use clock::{time_ago, time_ago_at};
pub use error::StoreError;
pub use notifications::{
    IncomingNotification, NotificationBody, NotificationLog, NotificationRecord, LOG_CAPACITY,
};
pub use store::{FileStore, MemoryStore, NotificationStore};
