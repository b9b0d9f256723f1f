//! On-disk format for clustering results.
//!
//! A result file is a single JSON document:
//!
//! ```text
//! {
//!   "format": "qtserver.clusters",
//!   "version": 1,
//!   "saved_at": "2024-05-01T10:00:00Z",
//!   "clusters": [ { "centroid": { "items": [...] }, "members": [0, 3, 4] } ]
//! }
//! ```
//!
//! Each centroid item carries its attribute (name, index, kind and domain) and its
//! value, so a file can be rendered without the dataset it came from.

use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cluster::ClusterSet;
use crate::error::{Error, Result};

/// Value of the `format` field.
pub const FORMAT_NAME: &str = "qtserver.clusters";

/// Result file schema version written by this build.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ResultDocument {
    format: String,
    version: u32,
    saved_at: DateTime<Utc>,
    clusters: ClusterSet,
}

/// Minimal view used to check the version before decoding the clusters.
#[derive(Debug, Deserialize)]
struct DocumentHeader {
    format: String,
    version: u32,
}

/// Serialize `clusters` to `path`, replacing any existing file.
pub fn write_clusters(path: &Path, clusters: &ClusterSet) -> Result<()> {
    let doc = ResultDocument {
        format: FORMAT_NAME.to_string(),
        version: FORMAT_VERSION,
        saved_at: Utc::now(),
        clusters: clusters.clone(),
    };
    let bytes = serde_json::to_vec_pretty(&doc)?;
    std::fs::write(path, bytes)?;
    info!("Saved {} clusters to {:?}", clusters.len(), path);
    Ok(())
}

/// Read a result file written by [`write_clusters`].
///
/// # Errors
///
/// - [`Error::ResultNotFound`] if `path` does not exist
/// - [`Error::Io`] for any other read failure
/// - [`Error::UnsupportedVersion`] for a different schema version
/// - [`Error::CorruptResult`] if the content is not a result document
pub fn read_clusters(path: &Path) -> Result<ClusterSet> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::ResultNotFound(path.to_path_buf()),
        _ => Error::Io(e),
    })?;

    let header: DocumentHeader = serde_json::from_slice(&bytes)?;
    if header.format != FORMAT_NAME {
        return Err(Error::CorruptResult(serde::de::Error::custom(format!(
            "unexpected format '{}'",
            header.format
        ))));
    }
    if header.version != FORMAT_VERSION {
        return Err(Error::UnsupportedVersion {
            found: header.version,
            supported: FORMAT_VERSION,
        });
    }

    let doc: ResultDocument = serde_json::from_slice(&bytes)?;
    info!(
        "Loaded {} clusters from {:?} (saved {})",
        doc.clusters.len(),
        path,
        doc.saved_at
    );
    Ok(doc.clusters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Cluster;
    use crate::tuple::{Attribute, Item, Tuple, Value};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sample_set() -> ClusterSet {
        let outlook = Arc::new(Attribute::discrete("Outlook", 0, ["rainy", "sunny"]));
        let temp = Arc::new(Attribute::continuous("Temperature", 1, 10.0, 40.0));
        let centroid = |o: &str, t: f64| {
            Tuple::new(vec![
                Item::new(Arc::clone(&outlook), Value::Discrete(o.to_string())).unwrap(),
                Item::new(Arc::clone(&temp), Value::Continuous(t)).unwrap(),
            ])
        };

        let mut a = Cluster::new(centroid("sunny", 25.0));
        a.add_member(0);
        a.add_member(2);
        let mut b = Cluster::new(centroid("rainy", 13.0));
        b.add_member(1);
        let mut c = Cluster::new(centroid("sunny", 40.0));
        c.add_member(3);

        let mut set = ClusterSet::new();
        set.add(a);
        set.add(b);
        set.add(c);
        set
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.json");
        let set = sample_set();

        write_clusters(&path, &set).unwrap();
        let loaded = read_clusters(&path).unwrap();

        assert_eq!(loaded.len(), set.len());
        for (before, after) in set.iter().zip(loaded.iter()) {
            assert_eq!(
                before.members().collect::<Vec<_>>(),
                after.members().collect::<Vec<_>>()
            );
            assert_eq!(before.centroid(), after.centroid());
        }
        assert_eq!(loaded.summary(), set.summary());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_clusters(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::ResultNotFound(_)));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_clusters(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Io(_)), "got {:?}", err);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(read_clusters(&path), Err(Error::CorruptResult(_))));
    }

    #[test]
    fn test_foreign_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.json");
        std::fs::write(&path, br#"{"format":"something-else","version":1}"#).unwrap();
        assert!(matches!(read_clusters(&path), Err(Error::CorruptResult(_))));
    }

    #[test]
    fn test_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.json");
        std::fs::write(
            &path,
            br#"{"format":"qtserver.clusters","version":99,"saved_at":"2024-01-01T00:00:00Z","clusters":[]}"#,
        )
        .unwrap();
        assert!(matches!(
            read_clusters(&path),
            Err(Error::UnsupportedVersion { found: 99, .. })
        ));
    }
}
