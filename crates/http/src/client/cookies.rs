//! Cookie jar that outlives the process
//!
//! The backend keeps the refresh credential in an HTTP-only cookie, so a
//! client that starts from a stored access token also needs the cookies the
//! previous run received. Session cookies are kept too; the jar only drops
//! what has expired.

use super::error::ClientError;
use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cookie jar backed by a JSON file
#[derive(Clone)]
pub struct CookieJar {
    path: PathBuf,
    store: Arc<CookieStoreMutex>,
}

impl CookieJar {
    /// Open the jar at `path`, starting empty when the file is missing or unreadable
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let store = match File::open(&path) {
            Ok(file) => match cookie_store::serde::json::load(BufReader::new(file)) {
                Ok(store) => {
                    debug!(path = %path.display(), "Loaded cookie jar");
                    store
                }
                Err(e) => {
                    warn!(path = %path.display(), "Ignoring unreadable cookie jar: {}", e);
                    CookieStore::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CookieStore::default(),
            Err(e) => {
                warn!(path = %path.display(), "Cannot open cookie jar: {}", e);
                CookieStore::default()
            }
        };

        Self {
            path,
            store: Arc::new(CookieStoreMutex::new(store)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared store handed to `reqwest`
    pub fn provider(&self) -> Arc<CookieStoreMutex> {
        Arc::clone(&self.store)
    }

    /// Write the jar back to its file
    pub fn save(&self) -> Result<(), ClientError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(cookie_error)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(cookie_error)?;
        {
            let store = self
                .store
                .lock()
                .map_err(|_| ClientError::CookieJar("cookie store lock poisoned".into()))?;
            cookie_store::serde::json::save_incl_expired_and_nonpersistent(&store, &mut temp)
                .map_err(|e| ClientError::CookieJar(e.to_string()))?;
        }
        temp.flush().map_err(cookie_error)?;
        temp.persist(&self.path).map_err(|e| cookie_error(e.error))?;

        debug!(path = %self.path.display(), "Saved cookie jar");
        Ok(())
    }
}

impl std::fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJar")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn cookie_error(e: std::io::Error) -> ClientError {
    ClientError::CookieJar(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::open(dir.path().join("cookies.json"));
        assert_eq!(jar.provider().lock().unwrap().iter_any().count(), 0);
    }

    #[test]
    fn test_garbage_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "not json").unwrap();

        let jar = CookieJar::open(&path);
        assert_eq!(jar.provider().lock().unwrap().iter_any().count(), 0);
    }

    #[test]
    fn test_session_cookie_survives_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cookies.json");
        let url = url::Url::parse("http://127.0.0.1:8080/auth/login").unwrap();

        let jar = CookieJar::open(&path);
        jar.provider()
            .lock()
            .unwrap()
            .parse("refreshToken=r1; Path=/; HttpOnly", &url)
            .unwrap();
        jar.save().unwrap();

        let reopened = CookieJar::open(&path);
        let store = reopened.provider();
        let store = store.lock().unwrap();
        let cookie = store.get("127.0.0.1", "/", "refreshToken").unwrap();
        assert_eq!(cookie.value(), "r1");
    }
}
