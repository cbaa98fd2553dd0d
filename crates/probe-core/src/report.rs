//! Serialization and persistence of the assembled document.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::document::Document;

/// Pretty-printed JSON for `document`.
pub fn render(document: &Document) -> Result<String> {
    serde_json::to_string_pretty(document).context("failed to serialize node attributes")
}

/// Write the report to `path`.
///
/// The JSON goes to a sibling temp file first and is renamed into place, so a
/// failed write never leaves a truncated report behind.
pub fn write(document: &Document, path: &Path) -> Result<()> {
    let json = render(document)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report dir {}", parent.display()))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    fs::write(tmp_path, json)
        .with_context(|| format!("failed to write report to {}", tmp_path.display()))?;
    if let Err(e) = fs::rename(tmp_path, path) {
        if let Err(cleanup) = fs::remove_file(tmp_path) {
            warn!("failed to remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(e)
            .with_context(|| format!("failed to move report into place at {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::AttributeCollector;
    use crate::testing::FakeHost;

    fn document() -> Document {
        AttributeCollector::new(Box::new(FakeHost::new())).collect().unwrap()
    }

    #[test]
    fn test_render_is_pretty_printed() {
        let json = render(&document()).unwrap();
        assert!(json.starts_with("{\n  \"OS\": ["));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["CPU"][0]["TotalCores"], 3);
    }

    #[test]
    fn test_write_creates_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("node_attribute_information.json");
        let doc = document();

        write(&doc, &path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, render(&doc).unwrap());
        assert!(!dir.path().join("out").join("node_attribute_information.json.tmp").exists());
    }

    #[test]
    fn test_write_replaces_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, "stale").unwrap();

        write(&document(), &path).unwrap();
        assert_ne!(fs::read_to_string(&path).unwrap(), "stale");
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory cannot be replaced by a file
        let path = dir.path().join("report.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "").unwrap();

        let err = write(&document(), &path).unwrap_err();
        assert!(err.to_string().contains("failed to move report into place"));
        assert!(!dir.path().join("report.json.tmp").exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_failed_collection_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("host_disk_info.txt");
        fs::write(&table, "/dev/vda1 too short\n").unwrap();
        let path = dir.path().join("report.json");

        let result = AttributeCollector::new(Box::new(FakeHost::new()))
            .with_disk_override(&table)
            .collect()
            .map_err(anyhow::Error::from)
            .and_then(|doc| write(&doc, &path));

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
