//! Identity types for DocVault documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Document identifier using UUIDv7 for timestamp-sortable IDs.
///
/// The id is the join key across the metadata store, the content store,
/// the blob store and the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Wrap an existing UUID.
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a new UUIDv7 DocumentId (timestamp-sortable).
    pub fn now_v7() -> Self {
        Self(Uuid::now_v7())
    }

    /// The nil id, useful only as a placeholder in tests.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for DocumentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_display_round_trip() {
        let id = DocumentId::now_v7();
        let parsed: DocumentId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_document_id_is_sortable_by_creation() {
        let first = DocumentId::now_v7();
        let second = DocumentId::now_v7();
        assert!(first < second);
    }

    #[test]
    fn test_document_id_serializes_as_plain_uuid() {
        let id = DocumentId::nil();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn test_invalid_document_id_rejected() {
        assert!("not-a-uuid".parse::<DocumentId>().is_err());
    }
}
