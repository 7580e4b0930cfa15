/// Virtual camera parameters
///
/// A `CameraSettings` value describes where the virtual camera sits relative
/// to the subject of the reference image and what kind of image it should
/// produce. Values are replaced wholesale on every change, and they are
/// serialized to JSON for the session database.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Azimuth range in degrees (wraps at the ends)
pub const AZIMUTH_RANGE: (i32, i32) = (-180, 180);
/// Elevation range in degrees (clamps at the ends)
pub const ELEVATION_RANGE: (i32, i32) = (-90, 90);
/// Zoom factor range
pub const ZOOM_RANGE: (f32, f32) = (0.5, 3.0);
/// Field of view range in degrees
pub const FOV_RANGE: (i32, i32) = (10, 120);

/// Output aspect ratio accepted by the generation service
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "16:9")]
    Wide16x9,
    #[serde(rename = "9:16")]
    Tall9x16,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait3x4,
        AspectRatio::Wide16x9,
        AspectRatio::Tall9x16,
    ];

    /// Wire/display form, e.g. "16:9"
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Wide16x9 => "16:9",
            AspectRatio::Tall9x16 => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output resolution tier
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub const ALL: [ImageSize; 3] = [ImageSize::OneK, ImageSize::TwoK, ImageSize::FourK];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All parameters of one virtual camera
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraSettings {
    // ========== Orbit ==========

    /// Horizontal orbit around the subject in degrees (-180 to 180)
    pub azimuth: i32,

    /// Vertical pitch in degrees (-90 to 90)
    /// - Positive values look down from above
    /// - Negative values look up from below
    pub elevation: i32,

    // ========== Lens ==========

    /// Closeness to the subject (0.5 to 3.0)
    pub zoom: f32,

    /// Field of view in degrees (10 to 120)
    pub fov: i32,

    // ========== Output ==========

    pub aspect_ratio: AspectRatio,

    /// Number of shots per request (always 1 for now)
    pub count: u32,

    /// Optional scene description handed to the model as extra context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub image_size: ImageSize,
}

impl Default for CameraSettings {
    /// Front-on camera with a standard lens
    fn default() -> Self {
        Self {
            azimuth: 0,
            elevation: 0,
            zoom: 1.0,
            fov: 70,
            aspect_ratio: AspectRatio::Square,
            count: 1,
            description: None,
            image_size: ImageSize::OneK,
        }
    }
}

impl CameraSettings {
    /// Bring every numeric field back inside its range.
    ///
    /// Azimuth is wrapped into (-180, 180], everything else is clamped.
    /// Restored and slider-driven values pass through here so that stored
    /// settings never leave their ranges.
    pub fn normalized(mut self) -> Self {
        self.azimuth = wrap_azimuth(self.azimuth);
        self.elevation = self.elevation.clamp(ELEVATION_RANGE.0, ELEVATION_RANGE.1);
        self.zoom = if self.zoom.is_finite() {
            self.zoom.clamp(ZOOM_RANGE.0, ZOOM_RANGE.1)
        } else {
            1.0
        };
        self.fov = self.fov.clamp(FOV_RANGE.0, FOV_RANGE.1);
        self.count = 1;
        self
    }

    /// Description with surrounding whitespace removed, `None` when blank
    pub fn scene_description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Wrap an angle in whole degrees into (-180, 180].
///
/// -180 and 180 name the same direction; 180 is the canonical one.
pub fn wrap_azimuth(degrees: i32) -> i32 {
    let wrapped = degrees.rem_euclid(360);
    if wrapped > 180 {
        wrapped - 360
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_front_standard_lens() {
        let settings = CameraSettings::default();
        assert_eq!(settings.azimuth, 0);
        assert_eq!(settings.elevation, 0);
        assert_eq!(settings.fov, 70);
        assert_eq!(settings.aspect_ratio, AspectRatio::Square);
        assert_eq!(settings.image_size, ImageSize::OneK);
        assert_eq!(settings.count, 1);
        assert!(settings.description.is_none());
    }

    #[test]
    fn test_json_field_names() {
        let mut settings = CameraSettings::default();
        settings.aspect_ratio = AspectRatio::Wide16x9;
        settings.image_size = ImageSize::FourK;
        settings.description = Some("foggy harbour".into());

        let json: serde_json::Value = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["aspectRatio"], "16:9");
        assert_eq!(json["imageSize"], "4K");
        assert_eq!(json["description"], "foggy harbour");
        assert_eq!(json["fov"], 70);
    }

    #[test]
    fn test_missing_description_deserializes() {
        let json = r#"{"azimuth":45,"elevation":10,"zoom":1.5,"fov":50,
            "aspectRatio":"3:4","count":1,"imageSize":"2K"}"#;
        let settings: CameraSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.azimuth, 45);
        assert_eq!(settings.aspect_ratio, AspectRatio::Portrait3x4);
        assert_eq!(settings.image_size, ImageSize::TwoK);
        assert!(settings.description.is_none());
    }

    #[test]
    fn test_wrap_azimuth() {
        assert_eq!(wrap_azimuth(0), 0);
        assert_eq!(wrap_azimuth(180), 180);
        assert_eq!(wrap_azimuth(-180), 180);
        assert_eq!(wrap_azimuth(181), -179);
        assert_eq!(wrap_azimuth(-181), 179);
        assert_eq!(wrap_azimuth(725), 5);
    }

    #[test]
    fn test_normalized_clamps_ranges() {
        let settings = CameraSettings {
            azimuth: 200,
            elevation: -120,
            zoom: 9.0,
            fov: 2,
            count: 4,
            ..CameraSettings::default()
        }
        .normalized();

        assert_eq!(settings.azimuth, -160);
        assert_eq!(settings.elevation, -90);
        assert_eq!(settings.zoom, 3.0);
        assert_eq!(settings.fov, 10);
        assert_eq!(settings.count, 1);
    }

    #[test]
    fn test_blank_description_is_ignored() {
        let mut settings = CameraSettings::default();
        settings.description = Some("   \n".into());
        assert_eq!(settings.scene_description(), None);

        settings.description = Some("  rainy street ".into());
        assert_eq!(settings.scene_description(), Some("rainy street"));
    }
}
