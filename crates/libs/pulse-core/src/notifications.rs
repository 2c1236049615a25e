use crate::clock;
use crate::store::NotificationStore;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Retention bound: inserting past this evicts the oldest record.
pub const LOG_CAPACITY: usize = 50;

/// Open payload of a pushed event. The named fields are the conventional
/// ones; anything else lands in `extra` untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationBody {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl NotificationBody {
    /// One short human-readable line from whichever fields are present.
    pub fn summary(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        if let Some(user) = &self.user_name {
            let mut line = user.clone();
            if let Some(action) = &self.action {
                line.push(' ');
                line.push_str(action);
            }
            if let Some(entity) = &self.entity_name {
                line.push(' ');
                line.push_str(entity);
            }
            if line.len() > user.len() {
                return line;
            }
        }
        if let Some(message) = &self.message {
            return message.clone();
        }
        if let Some(kind) = &self.kind {
            return kind.clone();
        }
        "notification".to_string()
    }
}

/// Boundary type for an inbound `notification` event, before acceptance.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct IncomingNotification {
    #[serde(default, deserialize_with = "id_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub body: NotificationBody,
}

// Origins are inconsistent about id types; a numeric id is kept, anything
// else nonsensical is treated as absent.
fn id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::String(id)) => Some(id),
        Some(JsonValue::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

/// An accepted record. The serialized form is also the persisted form.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NotificationRecord {
    pub id: String,
    pub timestamp: String,
    #[serde(default)]
    pub read: bool,
    #[serde(flatten)]
    pub body: NotificationBody,
}

/// Bounded, deduplicated, newest-first collection of notification records
/// with a derived unread flag. Owns the persistent store exclusively; every
/// mutation re-establishes the unread invariant and writes through.
pub struct NotificationLog {
    records: Vec<NotificationRecord>,
    has_unread: bool,
    store: Box<dyn NotificationStore>,
}

impl NotificationLog {
    /// Rehydrates from the store; the unread flag reflects the rehydrated
    /// set immediately.
    pub fn open(store: Box<dyn NotificationStore>) -> Self {
        let records = store.load();
        let has_unread = records.iter().any(|record| !record.read);
        Self { records, has_unread, store }
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    /// Copy-on-read view for external consumers.
    pub fn snapshot(&self) -> Vec<NotificationRecord> {
        self.records.clone()
    }

    pub fn has_unread(&self) -> bool {
        self.has_unread
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Inserts a candidate, rejecting a duplicate supplied id (first write
    /// wins). Returns whether the candidate was accepted.
    pub fn insert(&mut self, candidate: IncomingNotification) -> bool {
        self.insert_at(candidate, OffsetDateTime::now_utc())
    }

    pub fn insert_at(&mut self, candidate: IncomingNotification, now: OffsetDateTime) -> bool {
        if let Some(id) = &candidate.id {
            if self.records.iter().any(|record| &record.id == id) {
                return false;
            }
        }
        let record = NotificationRecord {
            id: candidate.id.unwrap_or_else(|| generate_id(now)),
            timestamp: clock::format_rfc3339(now),
            read: false,
            body: candidate.body,
        };
        self.records.insert(0, record);
        self.records.truncate(LOG_CAPACITY);
        self.has_unread = true;
        self.finish_mutation();
        true
    }

    /// Marks one record read. Absent id is a no-op.
    pub fn mark_read(&mut self, id: &str) -> bool {
        let Some(record) = self.records.iter_mut().find(|record| record.id == id) else {
            return false;
        };
        record.read = true;
        self.finish_mutation();
        true
    }

    pub fn mark_all_read(&mut self) {
        for record in &mut self.records {
            record.read = true;
        }
        self.finish_mutation();
    }

    /// Deletes one record. Absent id is a no-op.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.id != id);
        if self.records.len() == before {
            return false;
        }
        self.finish_mutation();
        true
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.finish_mutation();
    }

    fn finish_mutation(&mut self) {
        self.has_unread = self.records.iter().any(|record| !record.read);
        let result = if self.records.is_empty() {
            self.store.clear()
        } else {
            self.store.save(&self.records)
        };
        if let Err(err) = result {
            log::warn!("notification store write failed: {err}");
        }
    }
}

fn generate_id(now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("{millis}-{:08x}", rand::random::<u32>())
}
