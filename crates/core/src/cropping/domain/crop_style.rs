use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::errors::OptionsError;

/// Named strategy selecting which crop geometry to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropStyle {
    #[default]
    Auto,
    Frontal,
    Profile,
    Chin,
    Nose,
    BelowLips,
}

impl CropStyle {
    pub const ALL: &[CropStyle] = &[
        CropStyle::Auto,
        CropStyle::Frontal,
        CropStyle::Profile,
        CropStyle::Chin,
        CropStyle::Nose,
        CropStyle::BelowLips,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CropStyle::Auto => "auto",
            CropStyle::Frontal => "frontal",
            CropStyle::Profile => "profile",
            CropStyle::Chin => "chin",
            CropStyle::Nose => "nose",
            CropStyle::BelowLips => "below_lips",
        }
    }
}

impl fmt::Display for CropStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CropStyle {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        CropStyle::ALL
            .iter()
            .copied()
            .find(|style| style.as_str() == normalized)
            .ok_or_else(|| OptionsError::UnknownCropStyle(s.to_string()))
    }
}
