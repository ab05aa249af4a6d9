use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use facecrop_core::cropping::domain::crop_style::CropStyle;
use facecrop_core::finishing::domain::image_filter::FilterKind;
use facecrop_core::shared::constants::{DEFAULT_CONFIDENCE, DEFAULT_FILTER_INTENSITY, DEFAULT_MARGIN};

/// Persisted defaults for every crop option. Command-line flags win over these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub crop_style: CropStyle,
    pub frontal_margin: u32,
    pub profile_margin: u32,
    pub use_frontal: bool,
    pub use_profile: bool,
    pub confidence: f64,
    pub sharpen: bool,
    pub apply_rotation: bool,
    pub filter: FilterKind,
    pub intensity: u8,
    /// `"W:H"`, a number, or empty for none.
    pub aspect_ratio: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            crop_style: CropStyle::Auto,
            frontal_margin: DEFAULT_MARGIN,
            profile_margin: DEFAULT_MARGIN,
            use_frontal: true,
            use_profile: true,
            confidence: DEFAULT_CONFIDENCE,
            sharpen: true,
            apply_rotation: true,
            filter: FilterKind::None,
            intensity: DEFAULT_FILTER_INTENSITY,
            aspect_ratio: String::new(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceCrop").join("settings.json"))
    }

    /// Settings from the user config directory, or defaults.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or malformed files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&json).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed settings {}: {e}", path.display());
            Self::default()
        })
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            log::warn!("No config directory; settings not saved");
            return;
        };
        match self.save_to(&path) {
            Ok(()) => log::info!("Saved settings to {}", path.display()),
            Err(e) => log::warn!("Could not save settings to {}: {e}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trips_through_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let settings = Settings {
            crop_style: CropStyle::BelowLips,
            filter: FilterKind::EdgeDetection,
            intensity: 80,
            aspect_ratio: "4:5".into(),
            ..Settings::default()
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(Settings::load_from(&tmp.path().join("absent.json")), Settings::default());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{ "crop_style": "chin", "intensity": 10 }"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.crop_style, CropStyle::Chin);
        assert_eq!(settings.intensity, 10);
        assert_eq!(settings.frontal_margin, DEFAULT_MARGIN);
    }
}
