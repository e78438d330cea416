//! Workspace discovery from `storage/root-state.json`.

use std::fmt;
use std::path::Path;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use tracing::warn;

use super::error::ExtractionError;
use super::types::WorkspaceMetadata;

#[derive(Deserialize)]
struct RootState {
    #[serde(default, deserialize_with = "workspaces_in_document_order")]
    workspaces: Vec<WorkspaceMetadata>,
}

/// Deserialize the `{id: workspace}` object as a list, keeping document order
/// so equal `order` values fall back to the order the client wrote them in.
fn workspaces_in_document_order<'de, D>(deserializer: D) -> Result<Vec<WorkspaceMetadata>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedWorkspaces;

    impl<'de> Visitor<'de> for OrderedWorkspaces {
        type Value = Vec<WorkspaceMetadata>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of workspace id to workspace metadata")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((_id, workspace)) = map.next_entry::<String, WorkspaceMetadata>()? {
                out.push(workspace);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_any(OrderedWorkspaces)
}

/// Parse `root-state.json` and sort by `order` (missing counts as 0).
///
/// A document without a `workspaces` key yields an empty list.
pub fn parse_workspaces(data: &[u8]) -> Result<Vec<WorkspaceMetadata>, ExtractionError> {
    let state: RootState = serde_json::from_slice(data)
        .map_err(|e| ExtractionError::WorkspaceParseFailed(e.to_string()))?;

    let mut workspaces = state.workspaces;
    workspaces.sort_by_key(WorkspaceMetadata::sort_order);
    Ok(workspaces)
}

/// Load workspaces from `path`. A missing file is not fatal.
pub fn load_workspaces(path: &Path) -> Result<Vec<WorkspaceMetadata>, ExtractionError> {
    match std::fs::read(path) {
        Ok(data) => parse_workspaces(&data),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Workspace state unavailable; continuing without workspace metadata");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_by_order() {
        let json = br#"{
            "workspaces": {
                "T2": {"id": "T2", "domain": "beta", "name": "Beta", "url": "https://beta.slack.com/", "order": 1},
                "T1": {"id": "T1", "domain": "alpha", "name": "Alpha", "url": "https://alpha.slack.com/", "order": 0,
                       "icon": {"image_44": "https://img/44.png"}}
            },
            "settings": {}
        }"#;

        let workspaces = parse_workspaces(json).unwrap();
        assert_eq!(workspaces.len(), 2);
        assert_eq!(workspaces[0].id, "T1");
        assert_eq!(workspaces[0].domain, "alpha");
        assert_eq!(
            workspaces[0].icon.as_ref().and_then(|i| i.best_url()),
            Some("https://img/44.png")
        );
        assert_eq!(workspaces[1].id, "T2");
    }

    #[test]
    fn test_missing_order_counts_as_zero_and_ties_keep_document_order() {
        let json = br#"{"workspaces": {
            "TZ": {"id": "TZ", "domain": "z", "name": "Z", "url": "u", "order": 2},
            "TB": {"id": "TB", "domain": "b", "name": "B", "url": "u"},
            "TA": {"id": "TA", "domain": "a", "name": "A", "url": "u", "order": 0}
        }}"#;

        let ids: Vec<_> = parse_workspaces(json)
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec!["TB", "TA", "TZ"]);
    }

    #[test]
    fn test_missing_workspaces_key() {
        assert!(parse_workspaces(br#"{"other": 1}"#).unwrap().is_empty());
        assert!(parse_workspaces(br#"{"workspaces": null}"#).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_workspaces(b"{not json"),
            Err(ExtractionError::WorkspaceParseFailed(_))
        ));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_workspaces(&dir.path().join("root-state.json")).unwrap().is_empty());
    }
}
