//! Preset persistence
//!
//! Named constraint sets stored as one JSON file under the user config
//! directory, plus a pointer to the currently selected preset. The shipped
//! `wechat` default (9 MB budget, 1 MB tolerance, 1024 px, 0–4 s) cannot be
//! deleted; unparseable stores fall back to the defaults rather than
//! erroring the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_utils::errors::{GifFitError, Result};
use shared_utils::mb_to_bytes;
use shared_utils::profile::Profile;
use shared_utils::size_search::SizeConstraints;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_PRESET_ID: &str = "wechat";
const STORE_FILE_NAME: &str = "presets.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub max_mb: f64,
    pub max_w: u32,
    pub tol_mb: f64,
    pub dur_min: f64,
    pub dur_max: f64,
    pub dur_eps: f64,
    pub prefer_keep: bool,
    pub verbose: bool,
    /// Full override of the built-in profile ladder when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Vec<Profile>>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Preset {
    /// The shipped default: WeChat sticker limits.
    pub fn wechat_default() -> Self {
        Self {
            id: DEFAULT_PRESET_ID.to_string(),
            name: "WeChat sticker".to_string(),
            max_mb: 9.0,
            max_w: 1024,
            tol_mb: 1.0,
            dur_min: 0.0,
            dur_max: 4.0,
            dur_eps: 0.02,
            prefer_keep: true,
            verbose: false,
            profiles: None,
            updated_at: Utc::now(),
        }
    }

    pub fn constraints(&self) -> SizeConstraints {
        SizeConstraints {
            target_bytes: mb_to_bytes(self.max_mb),
            tolerance_bytes: mb_to_bytes(self.tol_mb),
            max_width: self.max_w,
            min_duration: self.dur_min,
            max_duration: self.dur_max,
            duration_epsilon: self.dur_eps,
            prefer_stable_timing: self.prefer_keep,
            verbose: self.verbose,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    presets: Vec<Preset>,
    current: String,
}

#[derive(Debug)]
pub struct PresetStore {
    path: PathBuf,
    pub presets: Vec<Preset>,
    pub current: String,
}

/// Config directory resolution: explicit env override (also used by tests),
/// then XDG, then `~/.config`, then the temp dir.
fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("GIF_FIT_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("gif_fit");
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".config").join("gif_fit");
    }
    std::env::temp_dir().join("gif_fit")
}

impl PresetStore {
    pub fn load_default() -> Self {
        Self::load_from(&config_dir().join(STORE_FILE_NAME))
    }

    /// Load a store file; a missing or corrupt file yields the default
    /// preset only.
    pub fn load_from(path: &Path) -> Self {
        let fallback = || Self {
            path: path.to_path_buf(),
            presets: vec![Preset::wechat_default()],
            current: DEFAULT_PRESET_ID.to_string(),
        };

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return fallback(),
        };

        match serde_json::from_str::<StoreFile>(&content) {
            Ok(mut file) => {
                if !file.presets.iter().any(|p| p.id == DEFAULT_PRESET_ID) {
                    file.presets.insert(0, Preset::wechat_default());
                }
                let current = if file.presets.iter().any(|p| p.id == file.current) {
                    file.current
                } else {
                    DEFAULT_PRESET_ID.to_string()
                };
                Self {
                    path: path.to_path_buf(),
                    presets: file.presets,
                    current,
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Preset store unreadable, using defaults");
                fallback()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        shared_utils::ensure_parent_dir_exists(&self.path)
            .map_err(|e| GifFitError::GeneralError(e.to_string()))?;
        let file = StoreFile {
            presets: self.presets.clone(),
            current: self.current.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| GifFitError::GeneralError(format!("Failed to encode presets: {}", e)))?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "Preset store saved");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn current(&self) -> &Preset {
        self.get(&self.current)
            .unwrap_or_else(|| &self.presets[0])
    }

    pub fn set_current(&mut self, id: &str) -> Result<()> {
        if self.get(id).is_none() {
            return Err(GifFitError::GeneralError(format!(
                "No such preset: {}",
                id
            )));
        }
        self.current = id.to_string();
        Ok(())
    }

    /// Insert or replace a preset by id, stamping `updated_at`.
    pub fn upsert(&mut self, mut preset: Preset) {
        preset.updated_at = Utc::now();
        if let Some(existing) = self.presets.iter_mut().find(|p| p.id == preset.id) {
            *existing = preset;
        } else {
            self.presets.push(preset);
        }
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        if id == DEFAULT_PRESET_ID {
            return Err(GifFitError::GeneralError(
                "The default preset cannot be deleted".to_string(),
            ));
        }
        let before = self.presets.len();
        self.presets.retain(|p| p.id != id);
        if self.presets.len() == before {
            return Err(GifFitError::GeneralError(format!(
                "No such preset: {}",
                id
            )));
        }
        if self.current == id {
            self.current = DEFAULT_PRESET_ID.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> PresetStore {
        PresetStore::load_from(&dir.join("presets.json"))
    }

    #[test]
    fn test_default_store_has_wechat_preset() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert_eq!(store.presets.len(), 1);
        assert_eq!(store.current().id, DEFAULT_PRESET_ID);
        let c = store.current().constraints();
        assert_eq!(c.target_bytes, 9 * 1024 * 1024);
        assert_eq!(c.tolerance_bytes, 1024 * 1024);
        assert_eq!(c.max_width, 1024);
        assert!(c.prefer_stable_timing);
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path());
        let mut custom = Preset::wechat_default();
        custom.id = "discord".to_string();
        custom.name = "Discord emoji".to_string();
        custom.max_mb = 0.25;
        custom.max_w = 128;
        store.upsert(custom);
        store.set_current("discord").unwrap();
        store.save().unwrap();

        let reloaded = store_in(dir.path());
        assert_eq!(reloaded.presets.len(), 2);
        assert_eq!(reloaded.current().id, "discord");
        assert_eq!(reloaded.current().max_w, 128);
    }

    #[test]
    fn test_corrupt_store_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let store = PresetStore::load_from(&path);
        assert_eq!(store.presets.len(), 1);
        assert_eq!(store.current, DEFAULT_PRESET_ID);
    }

    #[test]
    fn test_default_preset_is_undeletable() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path());
        assert!(store.delete(DEFAULT_PRESET_ID).is_err());
    }

    #[test]
    fn test_delete_resets_current_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path());
        let mut p = Preset::wechat_default();
        p.id = "tmp".to_string();
        store.upsert(p);
        store.set_current("tmp").unwrap();
        store.delete("tmp").unwrap();
        assert_eq!(store.current, DEFAULT_PRESET_ID);
    }

    #[test]
    fn test_missing_current_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        let mut store = PresetStore::load_from(&path);
        store.current = "ghost".to_string();
        store.save().unwrap();
        let reloaded = PresetStore::load_from(&path);
        assert_eq!(reloaded.current, DEFAULT_PRESET_ID);
    }

    #[test]
    fn test_preset_with_custom_profiles_roundtrip() {
        use shared_utils::profile::FrameRate;
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path());
        let mut p = Preset::wechat_default();
        p.id = "tiny".to_string();
        p.profiles = Some(vec![Profile::new(128, FrameRate::Fps(5.0), 16)]);
        store.upsert(p);
        store.save().unwrap();

        let reloaded = store_in(dir.path());
        let tiny = reloaded.get("tiny").unwrap();
        let profiles = tiny.profiles.as_ref().unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].width, 128);
    }
}
