//! Read-only view of translation progress for the current catalog.

use essaybridge_artifacts::{ArtifactState, ArtifactStore};
use essaybridge_shared::{CatalogEntry, ItemKey};

/// One line of `essaybridge status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub key: ItemKey,
    pub state: ArtifactState,
    /// Translated heading if the artifact is complete and has one, else the listing title.
    pub title: String,
}

/// Per-entry artifact state, in catalog order.
pub fn status_rows(catalog: &[CatalogEntry], store: &ArtifactStore) -> Vec<StatusRow> {
    catalog
        .iter()
        .map(|entry| {
            let key = entry.key();
            let state = store.state(&key);
            let title = match state {
                ArtifactState::Complete => store.translated_title(&key),
                _ => None,
            }
            .unwrap_or_else(|| entry.display_title.clone());
            StatusRow { key, state, title }
        })
        .collect()
}
