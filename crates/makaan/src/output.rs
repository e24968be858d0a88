use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::scraper::ScraperError;
use crate::types::LocalityRecord;

/// Removes every direct entry of `folder`, creating it if it does not exist.
///
/// Files and symlinks are unlinked, directories removed recursively. An entry
/// that cannot be removed is logged and skipped; only failing to list the
/// folder itself is an error.
pub fn reset_folder(folder: &Path) -> Result<(), ScraperError> {
    fs::create_dir_all(folder)?;

    for entry in fs::read_dir(folder)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                log::error!("Failed to read entry in {}: {}", folder.display(), e);
                continue;
            }
        };

        let removed = fs::symlink_metadata(&path).and_then(|meta| {
            if meta.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            }
        });

        if let Err(e) = removed {
            log::error!("Failed to delete {}. Reason: {}", path.display(), e);
        }
    }

    log::info!("Output folder {} cleaned", folder.display());
    Ok(())
}

/// Serializes `value` as one JSON document appended to `path`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ScraperError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Reads a locality file back. Files appended to more than once hold several
/// arrays back to back; their records are concatenated in order.
pub fn read_localities(path: &Path) -> Result<Vec<LocalityRecord>, ScraperError> {
    let reader = BufReader::new(File::open(path)?);

    let mut records = Vec::new();
    for batch in serde_json::Deserializer::from_reader(reader).into_iter::<Vec<LocalityRecord>>() {
        records.extend(batch?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NA;
    use tempfile::TempDir;

    fn record(location: &str) -> LocalityRecord {
        LocalityRecord {
            locality_link: format!("/bangalore/{}", location.to_lowercase()),
            location: location.to_string(),
            location_code: "1".to_string(),
            min_price: "100".to_string(),
            max_price: "200".to_string(),
            avg_price: "150".to_string(),
            growth: NA.to_string(),
            view_ppt_link: NA.to_string(),
            no_of_properties: NA.to_string(),
        }
    }

    #[test]
    fn test_reset_folder_removes_mixed_entries() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::write(root.join("apartment.json"), "[]").unwrap();
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::write(root.join("nested/deeper/villa.json"), "[]").unwrap();

        #[cfg(unix)]
        std::os::unix::fs::symlink(root.join("apartment.json"), root.join("latest.json")).unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink("/nonexistent/target", root.join("dangling")).unwrap();

        reset_folder(root).expect("Failed to reset folder");

        assert!(root.exists());
        assert_eq!(fs::read_dir(root).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_reset_folder_keeps_symlink_target() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let target = outside.path().join("keep.json");
        fs::write(&target, "[]").unwrap();

        std::os::unix::fs::symlink(outside.path(), dir.path().join("linked_dir")).unwrap();

        reset_folder(dir.path()).unwrap();

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(target.exists(), "the link is removed, not what it points to");
    }

    #[cfg(unix)]
    #[test]
    fn test_reset_folder_skips_entry_it_cannot_remove() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let locked = root.join("locked");

        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("held.json"), "[]").unwrap();
        fs::write(root.join("apartment.json"), "[]").unwrap();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("nested/villa.json"), "[]").unwrap();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o500)).unwrap();

        // permission bits do not bind root
        if fs::write(locked.join("writable"), "").is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o700)).unwrap();
            return;
        }

        let result = reset_folder(root);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o700)).unwrap();

        assert!(result.is_ok());
        let left: Vec<_> = fs::read_dir(root)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(left, vec![std::ffi::OsString::from("locked")]);
        assert!(locked.join("held.json").exists());
    }

    #[test]
    fn test_reset_folder_creates_missing_folder() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("output/localities");

        reset_folder(&folder).unwrap();
        assert!(folder.is_dir());
    }

    #[test]
    fn test_write_json_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("apartment.json");

        write_json(&path, &vec![record("Whitefield")]).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        let parsed: Vec<LocalityRecord> = serde_json::from_str(&first).unwrap();
        assert_eq!(parsed.len(), 1);

        write_json(&path, &vec![record("Hebbal"), record("Bagalur")]).unwrap();
        let records = read_localities(&path).unwrap();
        assert_eq!(
            records.iter().map(|r| r.location.as_str()).collect::<Vec<_>>(),
            vec!["Whitefield", "Hebbal", "Bagalur"]
        );
    }

    #[test]
    fn test_locality_fields_serialize_in_order() {
        let json = serde_json::to_string(&record("Whitefield")).unwrap();
        let keys = [
            "locality_link",
            "location",
            "location_code",
            "min_price",
            "max_price",
            "avg_price",
            "growth",
            "view_ppt_link",
            "no_of_properties",
        ];
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| json.find(&format!("\"{k}\"")).expect("missing key"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
