//! Content-addressable keys and metadata.

use serde::{Deserialize, Serialize};

/// A content-addressable key: `sha256(content) + ":" + parser_version`.
/// Two writes of the same content under the same parser version
/// deduplicate to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobKey(pub String);

impl BlobKey {
    /// Build a key from a precomputed hex digest and a parser version tag.
    pub fn new(hex_digest: impl AsRef<str>, parser_version: impl AsRef<str>) -> Self {
        Self(format!("{}:{}", hex_digest.as_ref(), parser_version.as_ref()))
    }

    /// The hex digest half of the key.
    pub fn digest(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }

    /// The parser-version half of the key.
    pub fn parser_version(&self) -> &str {
        self.0.splitn(2, ':').nth(1).unwrap_or_default()
    }
}

impl std::fmt::Display for BlobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata stored alongside a blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobMeta {
    /// Source URL, if the blob was fetched rather than read locally.
    #[serde(default)]
    pub url: Option<String>,
    /// Fetch timestamp, seconds since epoch.
    #[serde(default)]
    pub fetched_at: Option<i64>,
    /// MIME content type, if known.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Byte size of the blob.
    pub size: u64,
    /// Parser version that produced any derived artifacts.
    pub parser_version: String,
    /// Outbound links discovered while parsing, if applicable.
    #[serde(default)]
    pub outlinks: Option<Vec<String>>,
}

impl BlobMeta {
    /// Construct metadata for a locally-read blob with no URL provenance.
    pub fn local(size: u64, parser_version: impl Into<String>) -> Self {
        Self {
            url: None,
            fetched_at: None,
            content_type: None,
            size,
            parser_version: parser_version.into(),
            outlinks: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_roundtrip() {
        let k = BlobKey::new("abc123", "v1");
        assert_eq!(k.digest(), "abc123");
        assert_eq!(k.parser_version(), "v1");
        assert_eq!(k.to_string(), "abc123:v1");
    }
}
