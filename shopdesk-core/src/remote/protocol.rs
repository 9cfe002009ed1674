//! Wire types shared by the remote stores and the document server.
//!
//! Revisions travel in the `x-revision` response header. Writes may carry an
//! `if-match` header with the revision they were based on; the server answers
//! 409 when the collection or blob has moved on.

use serde::{Deserialize, Serialize};

pub const REVISION_HEADER: &str = "x-revision";
pub const IF_MATCH_HEADER: &str = "if-match";

/// Blob holding the whole item catalog as gzip-compressed JSON.
pub const ITEM_BUCKET: &str = "data/items";
/// Blob holding the last catalog backup, same encoding as the bucket.
pub const BACKUP_BLOB: &str = "backup/backup_data";
/// All units live in a single document of this collection.
pub const UNIT_COLLECTION: &str = "order_meta";
pub const UNIT_DOCUMENT: &str = "unit_convertion";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentEntry {
    pub id: String,
    pub body: serde_json::Value,
}

/// Response body of `GET /collections/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CollectionBody {
    pub revision: u64,
    pub documents: Vec<DocumentEntry>,
}

/// Request body of `PUT /collections/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReplaceRequest {
    pub documents: Vec<DocumentEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Parses a revision header value; missing or malformed values read as 0.
pub fn parse_revision(value: Option<&str>) -> u64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_revision() {
        assert_eq!(parse_revision(Some("12")), 12);
        assert_eq!(parse_revision(Some(" 3 ")), 3);
        assert_eq!(parse_revision(Some("abc")), 0);
        assert_eq!(parse_revision(None), 0);
    }

    #[test]
    fn test_collection_body_json_shape() {
        let body = CollectionBody {
            revision: 4,
            documents: vec![DocumentEntry {
                id: "c1".to_string(),
                body: serde_json::json!({"id": "c1", "name": "Drinks"}),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["revision"], 4);
        assert_eq!(json["documents"][0]["body"]["name"], "Drinks");
    }
}
