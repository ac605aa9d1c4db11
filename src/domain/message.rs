use chrono::{DateTime, Utc};

/// One chat entry as stored in the room collection. Never mutated after it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Document id, stable across snapshots.
    pub id: String,
    pub name: String,
    pub photo_url: Option<String>,
    pub uid: String,
    pub para: String,
    /// Assigned by the server; absent only for documents written without a timestamp.
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Single-character badge used in place of the avatar image.
    pub fn avatar_initial(&self) -> char {
        self.name
            .chars()
            .find(|ch| ch.is_alphanumeric())
            .map(|ch| ch.to_uppercase().next().unwrap_or(ch))
            .unwrap_or('?')
    }

    pub fn is_authored_by(&self, uid: &str) -> bool {
        self.uid == uid
    }
}

/// Client-supplied fields of a message; the creation time is requested from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub name: String,
    pub photo_url: Option<String>,
    pub uid: String,
    pub para: String,
}
