//! Storage location URIs.
//!
//! The scheme token selects the backend; the rest of the URI is
//! backend-native (`s3://bucket/prefix`, `file:///var/cache/layers`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use layers_common::{LayersError, LayersResult};

/// A parsed storage location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageUri {
    /// S3-compatible object storage: bucket plus key prefix.
    S3 { bucket: String, prefix: String },
    /// Local filesystem tree.
    File { path: PathBuf },
}

impl StorageUri {
    /// Parse a storage URI. Unknown schemes are a configuration error.
    pub fn parse(uri: &str) -> LayersResult<Self> {
        if let Some(rest) = uri.strip_prefix("s3://") {
            let (bucket, prefix) = match rest.split_once('/') {
                Some((bucket, prefix)) => (bucket, prefix.trim_end_matches('/')),
                None => (rest, ""),
            };
            if bucket.is_empty() {
                return Err(LayersError::InvalidParameter {
                    param: "uri".to_string(),
                    message: format!("missing bucket in '{}'", uri),
                });
            }
            return Ok(StorageUri::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
            });
        }

        if let Some(rest) = uri.strip_prefix("file://") {
            if rest.is_empty() {
                return Err(LayersError::InvalidParameter {
                    param: "uri".to_string(),
                    message: format!("missing path in '{}'", uri),
                });
            }
            return Ok(StorageUri::File {
                path: PathBuf::from(rest),
            });
        }

        Err(LayersError::InvalidParameter {
            param: "uri".to_string(),
            message: format!("unsupported storage scheme in '{}'", uri),
        })
    }

    /// Append a path segment.
    pub fn join(&self, segment: &str) -> StorageUri {
        match self {
            StorageUri::S3 { bucket, prefix } => StorageUri::S3 {
                bucket: bucket.clone(),
                prefix: if prefix.is_empty() {
                    segment.to_string()
                } else {
                    format!("{}/{}", prefix, segment)
                },
            },
            StorageUri::File { path } => StorageUri::File {
                path: path.join(segment),
            },
        }
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageUri::S3 { bucket, prefix } if prefix.is_empty() => {
                write!(f, "s3://{}", bucket)
            }
            StorageUri::S3 { bucket, prefix } => write!(f, "s3://{}/{}", bucket, prefix),
            StorageUri::File { path } => write!(f, "file://{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3() {
        let uri = StorageUri::parse("s3://layer-cache/published").unwrap();
        assert_eq!(
            uri,
            StorageUri::S3 {
                bucket: "layer-cache".to_string(),
                prefix: "published".to_string()
            }
        );

        let bare = StorageUri::parse("s3://layer-cache").unwrap();
        assert_eq!(
            bare,
            StorageUri::S3 {
                bucket: "layer-cache".to_string(),
                prefix: String::new()
            }
        );
    }

    #[test]
    fn test_parse_file() {
        let uri = StorageUri::parse("file:///var/cache/layers").unwrap();
        assert_eq!(
            uri,
            StorageUri::File {
                path: PathBuf::from("/var/cache/layers")
            }
        );
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        assert!(StorageUri::parse("gs://bucket/x").is_err());
        assert!(StorageUri::parse("/var/cache").is_err());
        assert!(StorageUri::parse("s3://").is_err());
    }

    #[test]
    fn test_join_and_display() {
        let uri = StorageUri::parse("s3://layer-cache").unwrap();
        assert_eq!(uri.join("prod").to_string(), "s3://layer-cache/prod");
        assert_eq!(
            uri.join("prod").join("layers").to_string(),
            "s3://layer-cache/prod/layers"
        );

        let file = StorageUri::parse("file:///data").unwrap();
        assert_eq!(file.join("cache").to_string(), "file:///data/cache");
    }
}
