//! Job-state queries for resumable tiled processing.
//!
//! The artifacts at the target location are the source of truth: there is
//! no separate job record. The queries live behind a small trait so an
//! alternate backend (e.g. a metadata database) can answer them without
//! changing the tiling engine.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use storage::CacheStore;

use crate::artifacts::{self, FailureMarker};
use crate::error::TilingResult;

/// Completion-state queries for one tiled job.
///
/// A failure answering these is fatal to the job: resume state cannot be
/// trusted without it.
#[async_trait]
pub trait JobState: Send + Sync {
    /// Indices with a real (non-failure-marked) tile artifact, restricted
    /// to the expected fishnet range.
    async fn completed_tiles(&self) -> TilingResult<BTreeSet<usize>>;

    /// Failure markers by tile index, restricted to the expected range.
    async fn failure_markers(&self) -> TilingResult<BTreeMap<usize, FailureMarker>>;

    /// Whether every expected tile has a real artifact.
    async fn is_complete(&self) -> TilingResult<bool>;
}

/// The canonical [`JobState`]: derived by listing artifacts at the job's
/// storage prefix.
pub struct StoreJobState<'a> {
    store: &'a CacheStore,
    prefix: String,
    expected: usize,
}

impl<'a> StoreJobState<'a> {
    pub fn new(store: &'a CacheStore, prefix: impl Into<String>, expected: usize) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            expected,
        }
    }

    fn artifact_name<'k>(&self, key: &'k str) -> &'k str {
        key.rsplit('/').next().unwrap_or(key)
    }

    async fn scan(&self) -> TilingResult<Vec<(String, artifacts::TileArtifact)>> {
        let keys = self.store.list(&self.prefix).await?;

        Ok(keys
            .into_iter()
            .filter_map(|key| {
                let artifact = artifacts::parse_artifact(self.artifact_name(&key))?;
                (artifact.index < self.expected).then_some((key, artifact))
            })
            .collect())
    }
}

#[async_trait]
impl JobState for StoreJobState<'_> {
    async fn completed_tiles(&self) -> TilingResult<BTreeSet<usize>> {
        Ok(self
            .scan()
            .await?
            .into_iter()
            .filter(|(_, a)| !a.failed)
            .map(|(_, a)| a.index)
            .collect())
    }

    async fn failure_markers(&self) -> TilingResult<BTreeMap<usize, FailureMarker>> {
        let mut markers = BTreeMap::new();

        for (key, artifact) in self.scan().await? {
            if !artifact.failed {
                continue;
            }
            let body = self.store.read_bytes(&key).await?;
            markers.insert(artifact.index, FailureMarker::decode(artifact.index, &body));
        }

        Ok(markers)
    }

    async fn is_complete(&self) -> TilingResult<bool> {
        Ok(self.completed_tiles().await?.len() == self.expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use storage::StorageUri;

    async fn seeded_store() -> (tempfile::TempDir, CacheStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(&StorageUri::File {
            path: dir.path().to_path_buf(),
        })
        .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_completed_and_failed_are_distinguished() {
        let (_dir, store) = seeded_store().await;
        let prefix = "prod/layers/grid/job";

        for index in [1usize, 3] {
            store
                .write_bytes(
                    &format!("{}/{}", prefix, artifacts::tile_artifact(index)),
                    Bytes::from_static(b"tile"),
                )
                .await
                .unwrap();
        }
        store
            .write_bytes(
                &format!("{}/{}", prefix, artifacts::failed_artifact(2)),
                Bytes::from_static(b"{}"),
            )
            .await
            .unwrap();

        let state = StoreJobState::new(&store, prefix, 4);

        let completed = state.completed_tiles().await.unwrap();
        assert_eq!(completed, BTreeSet::from([1, 3]));

        let markers = state.failure_markers().await.unwrap();
        assert_eq!(markers.keys().copied().collect::<Vec<_>>(), vec![2]);

        assert!(!state.is_complete().await.unwrap());
    }

    #[tokio::test]
    async fn test_out_of_range_and_foreign_artifacts_ignored() {
        let (_dir, store) = seeded_store().await;
        let prefix = "job";

        store
            .write_bytes(
                &format!("{}/{}", prefix, artifacts::tile_artifact(0)),
                Bytes::from_static(b"tile"),
            )
            .await
            .unwrap();
        // Index beyond the expected fishnet range
        store
            .write_bytes(
                &format!("{}/{}", prefix, artifacts::tile_artifact(17)),
                Bytes::from_static(b"tile"),
            )
            .await
            .unwrap();
        // Not a tile artifact at all
        store
            .write_bytes(
                &format!("{}/{}", prefix, artifacts::INDEX_ARTIFACT),
                Bytes::from_static(b"{}"),
            )
            .await
            .unwrap();

        let state = StoreJobState::new(&store, prefix, 4);
        assert_eq!(state.completed_tiles().await.unwrap(), BTreeSet::from([0]));
    }
}
