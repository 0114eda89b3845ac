use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, instrument, warn};

use playhead_core::ids::VideoId;
use playhead_core::videos::VideoRef;

use crate::error::StoreError;
use crate::storage::{KeyValueStorage, CATALOG_KEY};

/// Deduplicated, insertion-ordered set of ingested videos keyed by id.
///
/// The first `VideoRef` seen for an id is kept forever; later refs with the
/// same id are dropped, never merged.
pub struct VideoCatalog {
    storage: Arc<dyn KeyValueStorage>,
    entries: RwLock<IndexMap<VideoId, VideoRef>>,
}

impl VideoCatalog {
    /// Load the catalog from storage. Missing or malformed data yields an
    /// empty catalog.
    pub fn restore(storage: Arc<dyn KeyValueStorage>) -> Self {
        let entries = match load(storage.as_ref()) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "discarding unreadable video catalog");
                IndexMap::new()
            }
        };
        debug!(count = entries.len(), "video catalog restored");
        Self {
            storage,
            entries: RwLock::new(entries),
        }
    }

    /// Union `incoming` into the catalog, first write wins. Returns how many
    /// refs were new. The whole catalog is rewritten to storage afterwards.
    #[instrument(skip_all, fields(incoming = incoming.len()))]
    pub fn merge(&self, incoming: &[VideoRef]) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        for video in incoming {
            let _ = entries
                .entry(video.video_id.clone())
                .or_insert_with(|| video.clone());
        }
        let added = entries.len() - before;

        let snapshot: Vec<&VideoRef> = entries.values().collect();
        if let Err(e) = save(self.storage.as_ref(), &snapshot) {
            warn!(error = %e, "failed to persist video catalog");
        }
        debug!(added, total = entries.len(), "video catalog merged");
        added
    }

    pub fn list(&self) -> Vec<VideoRef> {
        self.entries.read().values().cloned().collect()
    }

    pub fn contains(&self, video_id: &VideoId) -> bool {
        self.entries.read().contains_key(video_id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn load(storage: &dyn KeyValueStorage) -> Result<IndexMap<VideoId, VideoRef>, StoreError> {
    let Some(raw) = storage.get(CATALOG_KEY)? else {
        return Ok(IndexMap::new());
    };
    let videos: Vec<VideoRef> = serde_json::from_str(&raw)?;
    let mut entries = IndexMap::with_capacity(videos.len());
    for video in videos {
        let _ = entries.entry(video.video_id.clone()).or_insert(video);
    }
    Ok(entries)
}

fn save(storage: &dyn KeyValueStorage, videos: &[&VideoRef]) -> Result<(), StoreError> {
    let json = serde_json::to_string(videos)?;
    storage.set(CATALOG_KEY, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn ids(catalog: &VideoCatalog) -> Vec<String> {
        catalog
            .list()
            .into_iter()
            .map(|v| v.video_id.to_string())
            .collect()
    }

    #[test]
    fn merge_deduplicates_by_id() {
        let catalog = VideoCatalog::restore(Arc::new(MemoryStorage::new()));

        assert_eq!(catalog.merge(&[VideoRef::new("a", "A", "https://youtu.be/a")]), 1);
        let added = catalog.merge(&[
            VideoRef::new("a", "A again", "https://youtu.be/a"),
            VideoRef::new("b", "B", "https://youtu.be/b"),
        ]);

        assert_eq!(added, 1);
        assert_eq!(ids(&catalog), vec!["a", "b"]);
    }

    #[test]
    fn first_write_wins() {
        let catalog = VideoCatalog::restore(Arc::new(MemoryStorage::new()));
        let _ = catalog.merge(&[
            VideoRef::new("a", "Original", "u1"),
            VideoRef::new("a", "Duplicate in same batch", "u2"),
        ]);
        let _ = catalog.merge(&[VideoRef::new("a", "Later", "u3")]);

        let list = catalog.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "Original");
        assert_eq!(list[0].url, "u1");
    }

    #[test]
    fn merge_order_does_not_change_membership() {
        let a = VideoRef::new("a", "A", "ua");
        let b = VideoRef::new("b", "B", "ub");

        let left = VideoCatalog::restore(Arc::new(MemoryStorage::new()));
        let _ = left.merge(&[a.clone()]);
        let _ = left.merge(&[b.clone(), a.clone()]);

        let right = VideoCatalog::restore(Arc::new(MemoryStorage::new()));
        let _ = right.merge(&[b.clone(), a.clone()]);
        let _ = right.merge(&[a.clone()]);

        let mut l = ids(&left);
        let mut r = ids(&right);
        l.sort();
        r.sort();
        assert_eq!(l, r);
    }

    #[test]
    fn merge_persists_and_restores() {
        let storage = Arc::new(MemoryStorage::new());
        let catalog = VideoCatalog::restore(storage.clone());
        let _ = catalog.merge(&[
            VideoRef::new("x", "X", "ux"),
            VideoRef::new("y", "Y", "uy"),
        ]);

        let raw = storage.get(CATALOG_KEY).unwrap().unwrap();
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored[0]["video_id"], "x");
        assert_eq!(stored[1]["title"], "Y");

        let restored = VideoCatalog::restore(storage);
        assert_eq!(ids(&restored), vec!["x", "y"]);
    }

    #[test]
    fn empty_merge_still_rewrites_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let catalog = VideoCatalog::restore(storage.clone());
        assert_eq!(catalog.merge(&[]), 0);
        assert_eq!(storage.get(CATALOG_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn malformed_storage_restores_empty() {
        let storage = Arc::new(MemoryStorage::new().with_entry(CATALOG_KEY, "{not json"));
        let catalog = VideoCatalog::restore(storage);
        assert!(catalog.is_empty());

        let wrong_shape = Arc::new(MemoryStorage::new().with_entry(CATALOG_KEY, r#"{"a":1}"#));
        assert!(VideoCatalog::restore(wrong_shape).is_empty());
    }

    #[test]
    fn restore_drops_duplicate_entries() {
        let raw = r#"[
            {"video_id":"a","title":"first","url":"u"},
            {"video_id":"a","title":"second","url":"u"}
        ]"#;
        let catalog = VideoCatalog::restore(Arc::new(MemoryStorage::new().with_entry(CATALOG_KEY, raw)));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.list()[0].title, "first");
        assert!(catalog.contains(&VideoId::from_raw("a")));
    }
}
