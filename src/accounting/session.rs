use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use super::book::MemoryBook;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot access book {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("book {path} is malformed: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A book opened from a file; changes stay in memory until [`Session::save`].
pub struct Session {
    path: PathBuf,
    book: MemoryBook,
}

impl Session {
    pub fn open(path: impl AsRef<Path>) -> Result<Session, SessionError> {
        let path = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path).map_err(|source| SessionError::Io {
            path: path.clone(),
            source,
        })?;
        let book: MemoryBook = serde_json::from_str(&contents).map_err(|source| SessionError::Format {
            path: path.clone(),
            source,
        })?;

        for id in book.duplicate_account_ids() {
            warn!("account id {} is used by more than one account in {}", id, path.display());
        }
        debug!("opened book {}", path.display());

        Ok(Session { path, book })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn book(&self) -> &MemoryBook {
        &self.book
    }

    pub fn book_mut(&mut self) -> &mut MemoryBook {
        &mut self.book
    }

    /// Writes the book next to its file first and renames it over the original.
    pub fn save(&self) -> Result<(), SessionError> {
        let io_error = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        let contents = serde_json::to_string_pretty(&self.book).map_err(|source| SessionError::Format {
            path: self.path.clone(),
            source,
        })?;

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, contents).map_err(io_error)?;
        fs::rename(&staging, &self.path).map_err(io_error)?;
        debug!("saved book {}", self.path.display());

        Ok(())
    }

    pub fn end(self) -> MemoryBook {
        debug!("closed book {}", self.path.display());
        self.book
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::accounting::account::{Account, AccountKind};
    use crate::accounting::customer::Customer;
    use crate::accounting::Book;

    fn sample_book() -> MemoryBook {
        MemoryBook::new(
            Account::new(0, "Root Account", AccountKind::Root)
                .with_child(Account::new(1, "Assets", AccountKind::Asset)),
        )
        .with_currency("NPR")
        .with_customer(Customer::new("000007", "Hari", "NPR"))
    }

    #[test]
    fn test_save_then_open() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("book.json");
        fs::write(&path, serde_json::to_string(&sample_book())?)?;

        let mut session = Session::open(&path)?;
        session.book_mut().next_invoice_id();
        session.save()?;

        let book = Session::open(&path)?.end();
        assert!(book.lookup_currency("NPR").is_some());
        assert_eq!(book.lookup_customer("000007").map(|c| c.name().as_str()), Some("Hari"));
        assert_eq!(book.clone().next_invoice_id(), "000002");
        assert!(!dir.path().join("book.json.tmp").exists());

        Ok(())
    }

    #[test]
    fn test_open_missing_file() {
        let result = Session::open("/nonexistent/book.json");
        assert!(matches!(result, Err(SessionError::Io { .. })));
    }

    #[test]
    fn test_open_malformed_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("book.json");
        fs::write(&path, "{ not json")?;

        let err = match Session::open(&path) {
            Err(err) => err,
            Ok(_) => anyhow::bail!("malformed book should not open"),
        };
        assert!(matches!(err, SessionError::Format { .. }));
        assert!(err.to_string().contains("book.json"));

        Ok(())
    }
}
