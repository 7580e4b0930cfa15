/// Built-in camera presets
///
/// Each preset is a complete orbit + lens combination for a common shot type.
/// Output options (aspect ratio, image size, shot count) are never touched by
/// a preset.

use super::camera::CameraSettings;

/// A named shot type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub azimuth: i32,
    pub elevation: i32,
    pub zoom: f32,
    pub fov: i32,
    /// Scene hint for the model; empty keeps the pose's own description
    pub description: &'static str,
}

pub const PRESETS: [Preset; 7] = [
    Preset {
        name: "Front",
        azimuth: 0,
        elevation: 0,
        zoom: 1.0,
        fov: 70,
        description: "",
    },
    Preset {
        name: "Reverse",
        azimuth: 180,
        elevation: 0,
        zoom: 1.0,
        fov: 70,
        description: "180-degree reverse shot showing the back of the scene and the background behind the original camera.",
    },
    Preset {
        name: "Top Down",
        azimuth: 0,
        elevation: 85,
        zoom: 1.2,
        fov: 60,
        description: "High angle bird's eye view looking down at the entire layout.",
    },
    Preset {
        name: "Low Angle",
        azimuth: 0,
        elevation: -25,
        zoom: 1.1,
        fov: 75,
        description: "Dramatic low angle looking up at the subject.",
    },
    Preset {
        name: "Aerial",
        azimuth: 45,
        elevation: 45,
        zoom: 1.6,
        fov: 65,
        description: "Aerial perspective showing the surrounding environment.",
    },
    Preset {
        name: "Worm's Eye",
        azimuth: 10,
        elevation: -65,
        zoom: 0.7,
        fov: 110,
        description: "Extreme wide angle from a very low floor-level perspective.",
    },
    Preset {
        name: "Profile",
        azimuth: 75,
        elevation: 15,
        zoom: 1.3,
        fov: 55,
        description: "Profile view showing the depth of the scene from the side.",
    },
];

/// Look up a preset by name
#[cfg(test)]
pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name)
}

impl Preset {
    /// Settings after applying this preset on top of `settings`
    pub fn apply_to(&self, settings: &CameraSettings) -> CameraSettings {
        let description = if self.description.is_empty() {
            settings.description.clone()
        } else {
            Some(self.description.to_string())
        };

        CameraSettings {
            azimuth: self.azimuth,
            elevation: self.elevation,
            zoom: self.zoom,
            fov: self.fov,
            description,
            ..settings.clone()
        }
    }
}
