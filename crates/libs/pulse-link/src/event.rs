use serde_json::Value as JsonValue;

/// Typed view of what the channel surfaces to the rest of the subsystem.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Disconnected,
    Notification(JsonValue),
}

impl ChannelEvent {
    /// Parses one inbound wire frame. Frames that are not well-formed
    /// objects, carry no `type`, or carry an unrecognized type are dropped
    /// here at the boundary.
    pub fn parse_frame(line: &str) -> Option<ChannelEvent> {
        let value: JsonValue = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("dropping malformed channel frame: {err}");
                return None;
            }
        };
        let JsonValue::Object(mut fields) = value else {
            log::warn!("dropping non-object channel frame");
            return None;
        };
        match fields.remove("type") {
            Some(JsonValue::String(kind)) if kind == "notification" => {
                Some(ChannelEvent::Notification(JsonValue::Object(fields)))
            }
            Some(JsonValue::String(kind)) => {
                log::debug!("ignoring channel frame of type {kind}");
                None
            }
            _ => {
                log::warn!("dropping channel frame without a type");
                None
            }
        }
    }
}
