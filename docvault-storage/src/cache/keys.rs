//! Cache key layout.
//!
//! Each document occupies two keys: `payload:<id>` with the served bytes and
//! `meta:<id>` with a small hash, so size and type can be read without
//! touching the payload.

use docvault_core::DocumentId;

pub const PAYLOAD_PREFIX: &str = "payload:";
pub const META_PREFIX: &str = "meta:";

/// Hash field holding the mime type. Required.
pub const FIELD_TYPE: &str = "type";
/// Hash field holding the payload length in bytes.
pub const FIELD_SIZE: &str = "size";
/// Hash field holding the unix time (seconds) the entry was written.
pub const FIELD_CREATED: &str = "created";

pub fn payload_key(id: DocumentId) -> String {
    format!("{}{}", PAYLOAD_PREFIX, id)
}

pub fn meta_key(id: DocumentId) -> String {
    format!("{}{}", META_PREFIX, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = DocumentId::nil();
        assert_eq!(
            payload_key(id),
            "payload:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(meta_key(id), "meta:00000000-0000-0000-0000-000000000000");
    }
}
