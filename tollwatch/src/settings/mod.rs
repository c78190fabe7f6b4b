//! Persisted engine settings.
//!
//! A single scalar survives process restarts: the distance-filter default
//! applied when a request does not specify its own. It lives in an INI
//! file under the user configuration directory and is read at request
//! time, written by the distance-filter command. Last write wins; there is
//! no transactional behavior to preserve for a single scalar.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::provider::DEFAULT_DISTANCE_FILTER_M;

/// INI section holding location settings.
const SECTION: &str = "location";

/// Key for the persisted distance filter.
const DISTANCE_FILTER_KEY: &str = "distance_filter";

/// Settings file name under the config directory.
const SETTINGS_FILE: &str = "settings.ini";

/// Errors persisting settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Could not create the settings directory.
    #[error("failed to create settings directory: {0}")]
    CreateDir(std::io::Error),

    /// Could not write the settings file.
    #[error("failed to write settings file: {0}")]
    Write(std::io::Error),
}

/// Handle to the persisted settings file.
#[derive(Debug, Clone)]
pub struct Settings {
    path: PathBuf,
}

impl Settings {
    /// Settings stored at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Settings at the default per-user location.
    ///
    /// Falls back to the current directory when the platform reports no
    /// config directory (headless containers).
    pub fn default_location() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("tollwatch").join(SETTINGS_FILE),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The effective distance-filter default in meters.
    ///
    /// A missing file, unparseable value, or stored zero all mean "unset"
    /// and yield [`DEFAULT_DISTANCE_FILTER_M`].
    pub fn distance_filter(&self) -> f64 {
        let stored = Ini::load_from_file(&self.path)
            .ok()
            .and_then(|ini| {
                ini.section(Some(SECTION))
                    .and_then(|section| section.get(DISTANCE_FILTER_KEY))
                    .and_then(|raw| raw.parse::<f64>().ok())
            })
            .unwrap_or(0.0);

        if stored == 0.0 {
            DEFAULT_DISTANCE_FILTER_M
        } else {
            stored
        }
    }

    /// Persist a new distance-filter default.
    pub fn set_distance_filter(&self, meters: f64) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(SettingsError::CreateDir)?;
        }

        let mut ini = Ini::load_from_file(&self.path).unwrap_or_default();
        ini.with_section(Some(SECTION))
            .set(DISTANCE_FILTER_KEY, meters.to_string());
        ini.write_to_file(&self.path).map_err(SettingsError::Write)
    }
}
