//! The token store: the console's single source of truth for the session
//! credential and the anti-forgery token.
//!
//! # Sharing
//!
//! `TokenStore` is a cheap handle (`Arc` inside). Clone it into the
//! dispatcher, the login flow, and anything else that needs to read the
//! credential; every clone sees the same values.
//!
//! # Persistence
//!
//! A store opened with [`TokenStore::open`] mirrors its values into a small
//! JSON file after every change, so a restarted console picks up where it
//! left off. Memory is authoritative: a failed write is reported, but the
//! in-memory value is already updated.
//!
//! # Concurrency note
//!
//! All operations are synchronous and hold the lock only for the update
//! plus the file write. Two responses rotating the anti-forgery token at
//! the same time resolve as last-write-wins: whichever response finishes
//! last leaves its token in the store.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Which value to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    /// The bearer credential of an authenticated session.
    Session,
    /// The backend's current anti-forgery token.
    Csrf,
}

impl TokenKey {
    /// The key's name in the persisted file.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Session => "token",
            Self::Csrf => "csrf_token",
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk and in-memory shape. Field names match [`TokenKey::as_str`].
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Tokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    csrf_token: Option<String>,
}

impl Tokens {
    fn slot(&mut self, key: TokenKey) -> &mut Option<String> {
        match key {
            TokenKey::Session => &mut self.token,
            TokenKey::Csrf => &mut self.csrf_token,
        }
    }

    fn get(&self, key: TokenKey) -> Option<&String> {
        match key {
            TokenKey::Session => self.token.as_ref(),
            TokenKey::Csrf => self.csrf_token.as_ref(),
        }
    }
}

struct Inner {
    tokens: RwLock<Tokens>,
    path: Option<PathBuf>,
}

/// Process-wide key/value store for the session credential and the
/// anti-forgery token.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

impl TokenStore {
    /// Creates a store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::with_tokens(Tokens::default(), None)
    }

    /// Opens (or starts) a store persisted at `path`.
    ///
    /// A missing file is an empty store; the file is created on the first
    /// change.
    ///
    /// # Errors
    /// - [`StoreError::Io`]: the file exists but can't be read
    /// - [`StoreError::Corrupt`]: the file isn't valid store JSON
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tokens = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                StoreError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tokens::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), "token store opened");
        Ok(Self::with_tokens(tokens, Some(path)))
    }

    fn with_tokens(tokens: Tokens, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                tokens: RwLock::new(tokens),
                path,
            }),
        }
    }

    /// Returns the current value for `key`, if any.
    pub fn get(&self, key: TokenKey) -> Option<String> {
        self.inner
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Returns `true` if `key` currently holds a value.
    pub fn contains(&self, key: TokenKey) -> bool {
        self.get(key).is_some()
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// Setting the value already held is a no-op (nothing is rewritten).
    pub fn set(&self, key: TokenKey, value: impl Into<String>) -> Result<(), StoreError> {
        let value = value.into();
        self.update(|tokens| {
            let slot = tokens.slot(key);
            if slot.as_deref() == Some(value.as_str()) {
                return false;
            }
            *slot = Some(value);
            true
        })
    }

    /// Removes the value under `key`.
    pub fn remove(&self, key: TokenKey) -> Result<(), StoreError> {
        self.update(|tokens| tokens.slot(key).take().is_some())
    }

    /// Removes both the session credential and the anti-forgery token.
    ///
    /// Both are dropped under one lock, so no reader ever sees one cleared
    /// and the other still present.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.update(|tokens| {
            let changed = *tokens != Tokens::default();
            *tokens = Tokens::default();
            changed
        })
    }

    /// The backing file, if this store is persisted.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Applies `change` under the write lock and, if it reports a change,
    /// mirrors the new state to disk before releasing the lock.
    fn update(&self, change: impl FnOnce(&mut Tokens) -> bool) -> Result<(), StoreError> {
        let mut tokens = self
            .inner
            .tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !change(&mut tokens) {
            return Ok(());
        }
        match &self.inner.path {
            Some(path) => persist(path, &tokens),
            None => Ok(()),
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Shows which keys are set, never their values.
impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("session", &self.contains(TokenKey::Session))
            .field("csrf", &self.contains(TokenKey::Csrf))
            .field("path", &self.inner.path)
            .finish()
    }
}

/// Writes `tokens` to a sibling temp file and renames it over `path`, so a
/// crash mid-write leaves the previous file intact.
fn persist(path: &Path, tokens: &Tokens) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let bytes = serde_json::to_vec_pretty(tokens).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}
