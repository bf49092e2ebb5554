use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use log::info;

/// Copies `book` to `<file name>.<YYYYmmddHHMMSS>.bak`, in `dir` when given, else beside it.
pub fn create_backup(book: &Path, dir: Option<&Path>, stamp: NaiveDateTime) -> Result<PathBuf> {
    let file_name = book
        .file_name()
        .with_context(|| format!("{} does not name a file", book.display()))?;

    let mut backup_name = file_name.to_os_string();
    backup_name.push(format!(".{}.bak", stamp.format("%Y%m%d%H%M%S")));

    let target_dir = match dir {
        Some(dir) => {
            fs::create_dir_all(dir).with_context(|| format!("cannot create backup directory {}", dir.display()))?;
            dir.to_path_buf()
        },
        None => book.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let backup = target_dir.join(backup_name);

    fs::copy(book, &backup)
        .with_context(|| format!("cannot back up {} to {}", book.display(), backup.display()))?;
    info!("backed up {} to {}", book.display(), backup.display());

    Ok(backup)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 9).unwrap().and_hms_opt(16, 5, 3).unwrap()
    }

    #[test]
    fn test_backup_beside_book() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let book = dir.path().join("milk.json");
        fs::write(&book, "{\"contents\": 1}")?;

        let backup = create_backup(&book, None, stamp())?;

        assert_eq!(backup, dir.path().join("milk.json.20240709160503.bak"));
        assert_eq!(fs::read_to_string(&backup)?, fs::read_to_string(&book)?);

        Ok(())
    }

    #[test]
    fn test_backup_into_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let book = dir.path().join("milk.json");
        fs::write(&book, "{}")?;
        let backups = dir.path().join("backups").join("nested");

        let backup = create_backup(&book, Some(&backups), stamp())?;

        assert_eq!(backup, backups.join("milk.json.20240709160503.bak"));
        assert!(backup.exists());

        Ok(())
    }

    #[test]
    fn test_backup_of_missing_book_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;

        assert!(create_backup(&dir.path().join("absent.json"), None, stamp()).is_err());

        Ok(())
    }
}
