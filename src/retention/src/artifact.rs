use chrono::{DateTime, Utc};

/// A backup object as reported by a store listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path or key of the artifact within the store, `/`-separated.
    pub name: String,
    /// Filesystem mtime or object last-modified time.
    pub created_at: DateTime<Utc>,
    /// Size in bytes. Informational only.
    pub size_bytes: u64,
}

impl Artifact {
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created_at,
            size_bytes: 0,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }
}

/// Sort artifacts by creation time.
///
/// The sort is stable: artifacts with identical timestamps keep their
/// relative input order.
pub fn sort_by_created(artifacts: &mut [Artifact], ascending: bool) {
    if ascending {
        artifacts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    } else {
        artifacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}

/// Order artifacts newest first with a deterministic tie-break.
///
/// Listing order differs between backends, so names are put in descending
/// order before the stable time sort. On equal timestamps the greatest name
/// counts as the most recent.
pub fn order_newest_first(artifacts: &mut [Artifact]) {
    artifacts.sort_by(|a, b| b.name.cmp(&a.name));
    sort_by_created(artifacts, false);
}
