use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::{normalize_tags, null_as_default};

/// Upload message consumed from the file-data queue.
///
/// `tag_name` and `type` mirror `file_tags` and `file_type` for older producers. The
/// content travels base64-encoded in `file_bytes` and is never persisted as metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    pub file_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_size: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tag_name: Vec<String>,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(
        default,
        with = "base64_bytes",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub file_bytes: Vec<u8>,
}

impl FileData {
    pub fn new(
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        file_tags: Vec<String>,
        file_bytes: Vec<u8>,
    ) -> Self {
        let file_type = file_type.into();
        Self {
            file_name: file_name.into(),
            file_size: file_bytes.len() as i64,
            tag_name: file_tags.clone(),
            kind: file_type.clone(),
            file_type,
            file_tags,
            file_bytes,
        }
    }

    /// Tags to associate with the record: `file_tags`, or `tag_name` when that is all
    /// the producer sent. Trimmed, blanks and duplicates removed.
    pub fn tags(&self) -> Vec<String> {
        let tags = normalize_tags(&self.file_tags);
        if tags.is_empty() {
            normalize_tags(&self.tag_name)
        } else {
            tags
        }
    }

    /// Declared content type, falling back to the legacy `type` field
    pub fn content_type(&self) -> &str {
        if self.file_type.is_empty() {
            &self.kind
        } else {
            &self.file_type
        }
    }

    /// Declared size in bytes. Negative declarations count as zero.
    pub fn declared_size(&self) -> u64 {
        self.file_size.max(0) as u64
    }
}

/// Catalog entity for an ingested file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct FileRecord {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl FileRecord {
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Tag shared across files; names are unique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

mod base64_bytes {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_producer_envelope() {
        let json = r#"{
            "file_name": "report.pdf",
            "file_type": "application/pdf",
            "file_size": 11,
            "file_tags": ["finance", "q3"],
            "tag_name": ["finance", "q3"],
            "type": "application/pdf",
            "file_bytes": "aGVsbG8gd29ybGQ="
        }"#;
        let data: FileData = serde_json::from_str(json).unwrap();
        assert_eq!(data.file_name, "report.pdf");
        assert_eq!(data.file_bytes, b"hello world");
        assert_eq!(data.tags(), vec!["finance", "q3"]);
        assert_eq!(data.declared_size(), 11);
    }

    #[test]
    fn accepts_nulls_and_missing_fields() {
        let json = r#"{"file_name": "a.txt", "file_tags": null, "file_bytes": null}"#;
        let data: FileData = serde_json::from_str(json).unwrap();
        assert!(data.file_tags.is_empty());
        assert!(data.file_bytes.is_empty());
        assert_eq!(data.file_size, 0);
    }

    #[test]
    fn rejects_missing_file_name_and_bad_base64() {
        assert!(serde_json::from_str::<FileData>(r#"{"file_type": "x"}"#).is_err());
        assert!(
            serde_json::from_str::<FileData>(r#"{"file_name": "a", "file_bytes": "%%%"}"#)
                .is_err()
        );
    }

    #[test]
    fn tags_fall_back_to_tag_name_and_are_normalized() {
        let data = FileData {
            file_name: "a".into(),
            file_tags: vec!["".into(), "  ".into()],
            tag_name: vec![" x ".into(), "y".into(), "x".into(), "".into()],
            ..Default::default()
        };
        assert_eq!(data.tags(), vec!["x", "y"]);
    }

    #[test]
    fn content_type_prefers_file_type() {
        let mut data = FileData {
            file_name: "a".into(),
            kind: "text/plain".into(),
            ..Default::default()
        };
        assert_eq!(data.content_type(), "text/plain");
        data.file_type = "text/csv".into();
        assert_eq!(data.content_type(), "text/csv");
    }

    #[test]
    fn negative_size_counts_as_zero() {
        let data = FileData {
            file_name: "a".into(),
            file_size: -5,
            ..Default::default()
        };
        assert_eq!(data.declared_size(), 0);
    }

    #[test]
    fn new_mirrors_legacy_fields_and_serializes_bytes() {
        let data = FileData::new("b.bin", "application/octet-stream", vec!["t".into()], vec![1, 2, 3]);
        assert_eq!(data.file_size, 3);
        assert_eq!(data.kind, "application/octet-stream");
        assert_eq!(data.tag_name, vec!["t"]);

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["file_bytes"], "AQID");
        assert_eq!(value["type"], "application/octet-stream");
    }
}
