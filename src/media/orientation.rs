use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::UnprocessableMedia;

const LANDSCAPE_RATIO: f64 = 16.0 / 9.0;
const PORTRAIT_RATIO: f64 = 9.0 / 16.0;
/// Tolerance for encoder rounding (e.g. 1366x768). Must stay at 0.01.
const RATIO_EPSILON: f64 = 0.01;

/// Coarse aspect-ratio class, also used as the object key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
    Other,
}

impl Orientation {
    pub fn classify(width: i64, height: i64) -> Result<Self, UnprocessableMedia> {
        if width <= 0 || height <= 0 {
            return Err(UnprocessableMedia(format!(
                "could not determine video dimensions ({width}x{height})"
            )));
        }

        let ratio = width as f64 / height as f64;
        if (ratio - LANDSCAPE_RATIO).abs() < RATIO_EPSILON {
            Ok(Orientation::Landscape)
        } else if (ratio - PORTRAIT_RATIO).abs() < RATIO_EPSILON {
            Ok(Orientation::Portrait)
        } else {
            Ok(Orientation::Other)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::Other => "other",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_resolutions() {
        assert_eq!(Orientation::classify(1920, 1080).unwrap(), Orientation::Landscape);
        assert_eq!(Orientation::classify(1080, 1920).unwrap(), Orientation::Portrait);
        assert_eq!(Orientation::classify(1000, 1000).unwrap(), Orientation::Other);
        assert_eq!(Orientation::classify(640, 480).unwrap(), Orientation::Other);
    }

    #[test]
    fn tolerates_encoder_rounding() {
        // 1366/768 = 1.7786, within 0.01 of 16/9.
        assert_eq!(Orientation::classify(1366, 768).unwrap(), Orientation::Landscape);
        // 1.8 is 0.0222 away from 16/9.
        assert_eq!(Orientation::classify(1800, 1000).unwrap(), Orientation::Other);
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        assert!(Orientation::classify(0, 1080).is_err());
        assert!(Orientation::classify(1920, 0).is_err());
        assert!(Orientation::classify(-1920, 1080).is_err());
    }

    #[test]
    fn serializes_as_key_prefix() {
        assert_eq!(serde_json::to_string(&Orientation::Portrait).unwrap(), "\"portrait\"");
        assert_eq!(Orientation::Landscape.to_string(), "landscape");
    }
}
