//! Cookie Consent
//! Persisted tri-state consent and the banner controller reading it.
//!
//! The decision lives under one key of a small key-value store. Only the
//! exact values `accepted` and `rejected` count as a decision; anything else
//! (or nothing) means the user has not decided yet.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// Storage key of the consent decision.
pub const CONSENT_KEY: &str = "cookie-consent";

#[derive(Error, Debug)]
pub enum ConsentError {
    #[error("Failed to access state store {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Corrupt state store {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsentState {
    #[default]
    Unset,
    Accepted,
    Rejected,
}

impl ConsentState {
    /// Decode a stored value. Unknown values read as `Unset`.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("accepted") => ConsentState::Accepted,
            Some("rejected") => ConsentState::Rejected,
            _ => ConsentState::Unset,
        }
    }

    pub fn as_stored(&self) -> Option<&'static str> {
        match self {
            ConsentState::Unset => None,
            ConsentState::Accepted => Some("accepted"),
            ConsentState::Rejected => Some("rejected"),
        }
    }
}

/// Durable string key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConsentError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConsentError>;
}

/// In-memory store, lost on restart.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConsentError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConsentError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, rewritten on every `set`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, ConsentError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(ConsentError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&content).map_err(|source| ConsentError::Json {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConsentError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConsentError> {
        let io_err = |source| ConsentError::Io {
            path: self.path.clone(),
            source,
        };
        // A corrupt file is replaced; an unreadable one is left alone.
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(e @ ConsentError::Json { .. }) => {
                warn!("{}, overwriting", e);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        entries.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&entries).map_err(|source| ConsentError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(io_err)
    }
}

/// Banner shown until the user accepts or rejects cookies.
pub struct CookieBanner<S: KeyValueStore> {
    store: S,
    state: ConsentState,
}

impl<S: KeyValueStore> CookieBanner<S> {
    /// Read the stored decision once. A store that cannot be read counts as
    /// undecided, so the banner is shown.
    pub fn mount(store: S) -> Self {
        let state = match store.get(CONSENT_KEY) {
            Ok(value) => ConsentState::from_stored(value.as_deref()),
            Err(e) => {
                warn!("Consent could not be read: {}", e);
                ConsentState::Unset
            }
        };
        Self { store, state }
    }

    #[cfg(test)]
    pub fn state(&self) -> ConsentState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state == ConsentState::Unset
    }

    pub fn accept(&mut self) -> Result<(), ConsentError> {
        self.decide(ConsentState::Accepted)
    }

    pub fn reject(&mut self) -> Result<(), ConsentError> {
        self.decide(ConsentState::Rejected)
    }

    /// The banner hides even when writing fails; the decision then lasts
    /// for this session only.
    fn decide(&mut self, state: ConsentState) -> Result<(), ConsentError> {
        self.state = state;
        let value = state.as_stored().unwrap_or_default();
        info!("Cookie consent: {}", value);
        self.store.set(CONSENT_KEY, value)
    }

    #[cfg(test)]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Banner with Accept/Reject buttons along the bottom of the window.
    pub fn show(&mut self, ctx: &egui::Context) {
        if !self.is_visible() {
            return;
        }
        egui::TopBottomPanel::bottom("cookie_banner").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal_wrapped(|ui| {
                ui.label(
                    "We use cookies to remember your preferences and understand how the atlas is used.",
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Reject").clicked() {
                        if let Err(e) = self.reject() {
                            warn!("Consent not saved: {}", e);
                        }
                    }
                    if ui.button("Accept").clicked() {
                        if let Err(e) = self.accept() {
                            warn!("Consent not saved: {}", e);
                        }
                    }
                });
            });
            ui.add_space(6.0);
        });
    }
}
