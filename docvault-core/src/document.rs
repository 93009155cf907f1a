//! Document entity types

use crate::{DocumentId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// JSON object payload, as submitted by the caller.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Field the content store uses to carry the document id.
pub const CONTENT_ID_FIELD: &str = "_id";

/// Content type used when nothing better is known.
pub const DEFAULT_MIME_TYPE: &str = "application/json";

// ============================================================================
// METADATA
// ============================================================================

/// Metadata record: the existence witness for a document.
///
/// If no metadata record exists for an id, the document does not exist,
/// whatever the other stores hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: DocumentId,
    pub name: String,
    /// Immutable discriminator: `true` → blob store, `false` → content store.
    pub is_blob: bool,
    pub public: bool,
    pub mime: String,
    pub grants: BTreeSet<String>,
    pub created_at: Timestamp,
}

impl DocumentMeta {
    /// Whether `login` may list or read this document.
    pub fn is_granted_to(&self, login: &str) -> bool {
        self.grants.contains(login)
    }
}

// ============================================================================
// PAYLOAD
// ============================================================================

/// A document payload. Exactly one kind per document.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Binary content, stored in the blob store.
    Blob(Vec<u8>),
    /// JSON object, stored in the content store.
    Json(JsonMap),
}

impl Payload {
    pub fn is_blob(&self) -> bool {
        matches!(self, Payload::Blob(_))
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Payload::Blob(bytes) => Some(bytes),
            Payload::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&JsonMap> {
        match self {
            Payload::Json(map) => Some(map),
            Payload::Blob(_) => None,
        }
    }
}

/// Return `map` with the content-store id field set to `id`.
pub fn with_content_id(mut map: JsonMap, id: DocumentId) -> JsonMap {
    map.insert(
        CONTENT_ID_FIELD.to_string(),
        serde_json::Value::String(id.to_string()),
    );
    map
}

// ============================================================================
// NEW DOCUMENT
// ============================================================================

/// A document as submitted for saving, before an id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub name: String,
    pub mime: String,
    pub public: bool,
    pub grants: BTreeSet<String>,
    pub payload: Payload,
}

impl NewDocument {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            public: false,
            grants: BTreeSet::new(),
            payload,
        }
    }

    /// Convenience constructor for a JSON document.
    pub fn json(name: impl Into<String>, json: JsonMap) -> Self {
        Self::new(name, DEFAULT_MIME_TYPE, Payload::Json(json))
    }

    /// Convenience constructor for a binary document.
    pub fn blob(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, mime, Payload::Blob(bytes))
    }

    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn with_grant(mut self, login: impl Into<String>) -> Self {
        self.grants.insert(login.into());
        self
    }

    pub fn is_blob(&self) -> bool {
        self.payload.is_blob()
    }

    /// Check the fields the saga relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "name".to_string(),
            });
        }
        if self.mime.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "mime".to_string(),
            });
        }
        Ok(())
    }

    /// Build the metadata record for this document under `id`.
    pub fn to_meta(&self, id: DocumentId, created_at: Timestamp) -> DocumentMeta {
        DocumentMeta {
            id,
            name: self.name.clone(),
            is_blob: self.is_blob(),
            public: self.public,
            mime: self.mime.clone(),
            grants: self.grants.clone(),
            created_at,
        }
    }
}

// ============================================================================
// LISTING
// ============================================================================

/// Fields a list request may filter on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPredicate {
    Name(String),
    Mime(String),
    Public(bool),
    IsBlob(bool),
}

impl FieldPredicate {
    /// Parse a `key = value` pair from a list request.
    pub fn parse(key: &str, value: &str) -> Result<Self, ValidationError> {
        match key {
            "name" => Ok(FieldPredicate::Name(value.to_string())),
            "mime" => Ok(FieldPredicate::Mime(value.to_string())),
            "public" => parse_bool(key, value).map(FieldPredicate::Public),
            "is_blob" | "file" => parse_bool(key, value).map(FieldPredicate::IsBlob),
            other => Err(ValidationError::InvalidValue {
                field: "key".to_string(),
                reason: format!("unsupported filter key '{}'", other),
            }),
        }
    }

    pub fn matches(&self, meta: &DocumentMeta) -> bool {
        match self {
            FieldPredicate::Name(name) => &meta.name == name,
            FieldPredicate::Mime(mime) => &meta.mime == mime,
            FieldPredicate::Public(public) => meta.public == *public,
            FieldPredicate::IsBlob(is_blob) => meta.is_blob == *is_blob,
        }
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ValidationError> {
    match value.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a boolean, got '{}'", value),
        }),
    }
}

/// A list request as a caller phrases it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    /// Login of the caller; only documents granted to it are listed.
    pub login: String,
    pub key: Option<String>,
    pub value: Option<String>,
    /// Zero means "use the configured default".
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl ListFilter {
    pub fn for_login(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            ..Default::default()
        }
    }

    pub fn with_predicate(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self.value = Some(value.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Resolve into a store query, applying the limit policy.
    pub fn into_query(
        self,
        default_limit: usize,
        max_limit: usize,
    ) -> Result<ListQuery, ValidationError> {
        if self.login.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "login".to_string(),
            });
        }

        let predicate = match (self.key.as_deref(), self.value.as_deref()) {
            (None, None) => None,
            (Some(key), Some(value)) => Some(FieldPredicate::parse(key, value)?),
            (Some(_), None) => {
                return Err(ValidationError::RequiredFieldMissing {
                    field: "value".to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(ValidationError::RequiredFieldMissing {
                    field: "key".to_string(),
                })
            }
        };

        let limit = match self.limit {
            0 => default_limit,
            n => n.min(max_limit),
        };

        Ok(ListQuery {
            login: self.login,
            predicate,
            limit,
            offset: self.offset,
        })
    }
}

/// A validated list query, as handed to a metadata store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub login: String,
    pub predicate: Option<FieldPredicate>,
    pub limit: usize,
    pub offset: usize,
}

impl ListQuery {
    /// Whether `meta` belongs in the result set (ignoring paging).
    pub fn matches(&self, meta: &DocumentMeta) -> bool {
        meta.is_granted_to(&self.login)
            && self
                .predicate
                .as_ref()
                .map_or(true, |predicate| predicate.matches(meta))
    }
}

/// Result ordering for list queries: name ascending, then newest first.
pub fn list_order(a: &DocumentMeta, b: &DocumentMeta) -> std::cmp::Ordering {
    a.name
        .cmp(&b.name)
        .then_with(|| b.created_at.cmp(&a.created_at))
}
