use crate::error::LinkError;
use crate::event::ChannelEvent;
use crate::message::ClientMessage;

mod memory;
mod tcp;

pub use memory::MemoryChannel;
pub use tcp::TcpChannel;

/// The physical channel to the server. Implementations own their own
/// reconnect policy; the connection manager only reacts to the
/// `Connected`/`Disconnected` events they surface.
pub trait ChannelTransport {
    fn connect(&mut self) -> Result<(), LinkError>;

    fn send(&mut self, message: &ClientMessage) -> Result<(), LinkError>;

    /// Next queued event, if any. Events never arrive on this call's
    /// thread from anywhere else; the caller drains at its own pace.
    fn poll_event(&mut self) -> Option<ChannelEvent>;

    /// Idempotent. Stops delivery synchronously: events still queued are
    /// discarded and late arrivals from the wire are dropped.
    fn close(&mut self);
}
