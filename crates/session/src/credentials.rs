//! Client-side credential store
//!
//! Holds the current access token and the authenticated identity in memory.
//! Only the access token is persisted, under `TOKEN_STORAGE_KEY` in a small
//! JSON key/value file that plays the role of browser local storage. The
//! long-lived refresh credential never reaches this store; it lives in the
//! transport's cookie jar.
//!
//! Lifecycle: `load` at startup, `set_auth` on login, `replace_access_token`
//! on refresh, `clear` on logout or refresh failure. The access token is
//! always replaced wholesale, never edited in place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use common::Secret;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::constants::TOKEN_STORAGE_KEY;
use crate::error::{Error, Result};
use crate::identity::User;

#[derive(Default)]
struct SessionState {
    access: Option<Secret<String>>,
    identity: Option<User>,
}

/// Single-writer session state container.
///
/// The Mutex serializes writers so a refresh and a logout cannot interleave
/// their persistence. Reads clone out under a brief lock.
pub struct CredentialStore {
    path: Option<PathBuf>,
    state: Mutex<SessionState>,
}

impl CredentialStore {
    /// Load the persisted access token from `path`.
    ///
    /// A missing file means "signed out". The identity is never persisted; it
    /// is re-established by a profile check after startup.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let storage = read_storage(&path).await?;
        let access = storage
            .get(TOKEN_STORAGE_KEY)
            .and_then(|token| Secret::from_trimmed(token));

        info!(
            path = %path.display(),
            signed_in = access.is_some(),
            "loaded session storage"
        );

        Ok(Self {
            path: Some(path),
            state: Mutex::new(SessionState {
                access,
                identity: None,
            }),
        })
    }

    /// A store that keeps everything in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// The current access token.
    pub async fn access_token(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.access.as_ref().map(|s| s.expose().clone())
    }

    /// The authenticated identity, if known.
    pub async fn identity(&self) -> Option<User> {
        let state = self.state.lock().await;
        state.identity.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.access.is_some()
    }

    /// Record a fresh login: identity and access token together.
    ///
    /// Memory is updated before persisting, so a storage error still leaves
    /// the new token in use for this process.
    pub async fn set_auth(&self, identity: Option<User>, token: String) -> Result<()> {
        let mut state = self.state.lock().await;
        state.identity = identity;
        state.access = Some(Secret::new(token));
        let token = state.access.as_ref().map(|s| s.expose().as_str());
        self.persist_token(token).await?;
        debug!("stored session");
        Ok(())
    }

    /// Swap in a refreshed access token, keeping the current identity.
    pub async fn replace_access_token(&self, token: String) -> Result<()> {
        let mut state = self.state.lock().await;
        state.access = Some(Secret::new(token));
        let token = state.access.as_ref().map(|s| s.expose().as_str());
        self.persist_token(token).await?;
        debug!("replaced access token");
        Ok(())
    }

    /// Record the identity returned by a profile check.
    pub async fn set_identity(&self, identity: User) {
        self.state.lock().await.identity = Some(identity);
    }

    /// Drop the access token and identity, and remove the persisted token.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.access = None;
        state.identity = None;
        self.persist_token(None).await?;
        debug!("cleared session");
        Ok(())
    }

    /// Write (or remove) the token key, preserving any other stored keys.
    async fn persist_token(&self, token: Option<&str>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut storage = read_storage(path).await?;
        match token {
            Some(token) => {
                storage.insert(TOKEN_STORAGE_KEY.to_string(), token.to_string());
            }
            None => {
                storage.remove(TOKEN_STORAGE_KEY);
            }
        }
        write_atomic(path, &storage).await
    }
}

async fn read_storage(path: &Path) -> Result<HashMap<String, String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
        Ok(contents) => serde_json::from_str(&contents)
            .map_err(|e| Error::CredentialParse(format!("parsing session storage: {e}"))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(Error::Io(format!("reading session storage: {e}"))),
    }
}

/// Write storage to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 since the file holds a bearer
/// token.
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing session storage: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| Error::Io(format!("creating session storage directory: {e}")))?;

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted session storage");
    Ok(())
}
