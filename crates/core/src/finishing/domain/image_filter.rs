use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::errors::OptionsError;

/// Visual filter applied to a crop before it is saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    #[default]
    None,
    Brightness,
    Contrast,
    Blur,
    EdgeDetection,
    Sepia,
}

impl FilterKind {
    pub const ALL: &[FilterKind] = &[
        FilterKind::None,
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Blur,
        FilterKind::EdgeDetection,
        FilterKind::Sepia,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FilterKind::None => "None",
            FilterKind::Brightness => "Brightness",
            FilterKind::Contrast => "Contrast",
            FilterKind::Blur => "Blur",
            FilterKind::EdgeDetection => "Edge Detection",
            FilterKind::Sepia => "Sepia",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterKind {
    type Err = OptionsError;

    /// Case-insensitive; spaces, dashes and underscores are ignored, so
    /// "Edge Detection", "edge_detection" and "EdgeDetection" all match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        let key = if key.is_empty() { "none".to_string() } else { key };

        FilterKind::ALL
            .iter()
            .copied()
            .find(|f| f.label().replace(' ', "").to_lowercase() == key)
            .ok_or_else(|| OptionsError::UnknownFilter(s.to_string()))
    }
}
