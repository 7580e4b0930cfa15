/// Instruction text for the generation model
///
/// `build_prompt` renders a fixed template from a `CameraSettings` value.
/// It is a pure function: the same settings and config always produce the
/// same text, byte for byte.
use crate::state::camera::CameraSettings;

/// Lenses narrower than this read as telephoto
pub const TELEPHOTO_FOV_BELOW: i32 = 40;
/// Lenses wider than this read as wide-angle
pub const WIDE_FOV_ABOVE: i32 = 90;

/// Tunables for the prompt template
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromptConfig {
    /// |azimuth| strictly above this (up to 180) asks for a reverse shot
    pub reverse_angle_threshold: f32,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            reverse_angle_threshold: 150.0,
        }
    }
}

/// Lens class derived from the field of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lens {
    Telephoto,
    Standard,
    Wide,
}

impl Lens {
    pub fn from_fov(fov: i32) -> Self {
        if fov < TELEPHOTO_FOV_BELOW {
            Lens::Telephoto
        } else if fov > WIDE_FOV_ABOVE {
            Lens::Wide
        } else {
            Lens::Standard
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Lens::Telephoto => "Telephoto/Narrow lens",
            Lens::Standard => "Standard lens",
            Lens::Wide => "Wide-angle/Fisheye lens",
        }
    }
}

/// Whether the camera has swung round to face the far side of the scene
pub fn is_reverse_angle(azimuth: i32, config: &PromptConfig) -> bool {
    let magnitude = azimuth.unsigned_abs() as f32;
    magnitude > config.reverse_angle_threshold && magnitude <= 180.0
}

const ROLE: &str = "You are a world-class 3D rendering engine and professional cinematographer specialized in spatial reasoning.
Based on the provided reference image, generate a new image from the specified camera perspective.";

const REVERSE_DIRECTIVE: &str = "2. ENVIRONMENT REVERSAL (CRITICAL): This is a 180-degree REVERSE ANGLE SHOT. You are now looking from the opposite side of the entire scene. You must plausibly render the background that was PREVIOUSLY BEHIND the original camera. If the original showed a character facing a desk, this view must show the character's back and the room BEHIND them.";

const FIDELITY_DIRECTIVE: &str = "2. PERSPECTIVE FIDELITY: Maintain the spatial relationship between the subject and the environment as the camera orbits.";

const TRAILING_DIRECTIVES: &str = "3. LIGHTING CONSISTENCY: Flip the lighting direction logically. If the light source was on the left in the original, it should appear from the right in this perspective to maintain world-space consistency.
4. STYLE PRESERVATION: Maintain absolute fidelity to the original image's artistic style, medium, brushstrokes, textures, and aesthetic essence.
5. VISUAL DNA: Keep the subject's identity, color palette, and materials 100% consistent.
6. QUALITY: Output a high-fidelity render that feels like part of the same cinematic sequence.";

/// Render the instruction text for `settings`
pub fn build_prompt(settings: &CameraSettings, config: &PromptConfig) -> String {
    let lens = Lens::from_fov(settings.fov);
    let mut prompt = format!(
        "{ROLE}

PHYSICAL PARAMETERS:
- Azimuth: {az}° (Horizontal orbit)
- Elevation: {el}° (Vertical pitch)
- Zoom Factor: {zoom:.2}x (Closeness to subject)
- Field of View (FOV): {fov}° ({lens})

CORE DIRECTIVES:
1. SPATIAL RECONSTRUCTION: This is not just rotating the object; it is a full camera movement in 3D space.
{second}
{TRAILING_DIRECTIVES}",
        az = settings.azimuth,
        el = settings.elevation,
        zoom = settings.zoom,
        fov = settings.fov,
        lens = lens.label(),
        second = if is_reverse_angle(settings.azimuth, config) {
            REVERSE_DIRECTIVE
        } else {
            FIDELITY_DIRECTIVE
        },
    );

    if let Some(description) = settings.scene_description() {
        prompt.push_str(&format!(
            "\n\nSCENE CONTEXT (Prioritize this for environmental details):\n\"{}\"",
            description
        ));
    }

    prompt
}
