//! Zip extraction

use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use zip::ZipArchive;

use super::DeployError;

/// Unpack `data` into `target` on the blocking pool
pub async fn extract_archive(data: Vec<u8>, target: PathBuf) -> Result<usize, DeployError> {
    tokio::task::spawn_blocking(move || extract_archive_blocking(&data, &target)).await?
}

/// Unpack a zip archive into `target`, overwriting existing files.
///
/// Returns the number of files written. Entries whose names would escape
/// `target` are skipped.
pub fn extract_archive_blocking(data: &[u8], target: &Path) -> Result<usize, DeployError> {
    fs::create_dir_all(target)?;

    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let mut written = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;

        let relative = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                tracing::warn!(entry = entry.name(), "Skipping archive entry outside target");
                continue;
            }
        };
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;

        if let Some(modified) = entry_mtime(&entry.last_modified()) {
            out.set_modified(modified)?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o777))?;
            }
        }

        written += 1;
    }

    tracing::debug!(files = written, "Extracted archive into {}", target.display());

    Ok(written)
}

/// Zip timestamps carry no zone; they are read as UTC
fn entry_mtime(stamp: &zip::DateTime) -> Option<SystemTime> {
    let naive = NaiveDate::from_ymd_opt(
        i32::from(stamp.year()),
        u32::from(stamp.month()),
        u32::from(stamp.day()),
    )?
    .and_hms_opt(
        u32::from(stamp.hour()),
        u32::from(stamp.minute()),
        u32::from(stamp.second()),
    )?;

    Some(naive.and_utc().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default()
            .last_modified_time(zip::DateTime::from_date_and_time(2020, 5, 17, 8, 30, 0).unwrap());

        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }

        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extracts_tree_and_overwrites() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("servant-app");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("index.html"), "old").unwrap();

        let data = build_archive(&[
            ("index.html", "<h1>new</h1>"),
            ("assets/", ""),
            ("assets/css/site.css", "body{}"),
        ]);

        let written = extract_archive_blocking(&data, &target).unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            fs::read_to_string(target.join("index.html")).unwrap(),
            "<h1>new</h1>"
        );
        assert_eq!(
            fs::read_to_string(target.join("assets/css/site.css")).unwrap(),
            "body{}"
        );
    }

    #[test]
    fn test_restores_modification_time() {
        let dir = tempdir().unwrap();
        let data = build_archive(&[("readme.txt", "hi")]);

        extract_archive_blocking(&data, dir.path()).unwrap();

        let modified = fs::metadata(dir.path().join("readme.txt"))
            .unwrap()
            .modified()
            .unwrap();
        let expected: SystemTime = NaiveDate::from_ymd_opt(2020, 5, 17)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
            .and_utc()
            .into();
        assert_eq!(modified, expected);
    }

    #[test]
    fn test_skips_escaping_entries() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("site");
        let data = build_archive(&[("../escape.txt", "x"), ("ok.txt", "y")]);

        let written = extract_archive_blocking(&data, &target).unwrap();

        assert_eq!(written, 1);
        assert!(!dir.path().join("escape.txt").exists());
        assert!(target.join("ok.txt").exists());
    }

    #[test]
    fn test_rejects_non_zip_data() {
        let dir = tempdir().unwrap();
        let result = extract_archive_blocking(b"definitely not a zip", dir.path());
        assert!(matches!(result, Err(DeployError::Archive(_))));
    }

    #[tokio::test]
    async fn test_async_extraction() {
        let dir = tempdir().unwrap();
        let data = build_archive(&[("a.txt", "a")]);

        let written = extract_archive(data, dir.path().to_path_buf()).await.unwrap();
        assert_eq!(written, 1);
    }
}
