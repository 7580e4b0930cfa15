/// Session state machine
///
/// `Session` owns everything the UI shows: the pose collection, the source
/// and generated images, the current status and the user-visible error.
/// Every user action goes through [`Session::apply`], which mutates the
/// session and returns the side effects (persistence, the remote call) the
/// caller has to perform. Nothing in here touches the disk or the network.

use super::camera::CameraSettings;
use super::data::{SessionSnapshot, SourceImage};
use super::poses::{CameraPose, PoseStore};
use super::presets::Preset;
use crate::ui::orbit::{apply_drag, OrbitConfig, OrbitDelta};

pub const UPLOAD_FAILED_MESSAGE: &str = "Image processing failed.";
pub const CREDENTIAL_FAILED_MESSAGE: &str = "API key verification failed, please select a key again.";
pub const GENERATION_FAILED_MESSAGE: &str =
    "Generation failed. Make sure the selected API key belongs to a billing-enabled project.";

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Restoring the previous session
    Initializing,
    /// No usable API key; the key prompt is shown
    NeedsCredential,
    Idle,
    Uploading,
    Generating,
    Success,
    Error,
}

/// Why a generation request failed, as far as the UI cares
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationFailure {
    /// The API key was rejected; ask for a new one
    Credential,
    /// Anything else
    Other(String),
}

/// Everything the user (or a finished background task) can do
#[derive(Debug, Clone)]
pub enum Action {
    Restored {
        snapshot: SessionSnapshot,
        has_credential: bool,
    },
    /// The user wants to pick a different API key
    CredentialRequested,
    /// The user supplied an API key
    CredentialSupplied,
    UploadStarted,
    UploadFinished(Result<SourceImage, String>),
    SelectPose(String),
    AddPose,
    RemovePose(String),
    /// Replace the active pose's settings (sliders, output options, text)
    UpdateActive(CameraSettings),
    ApplyPreset(&'static Preset),
    Orbit(OrbitDelta),
    Generate,
    /// Data URL of the new image, or why there is none
    GenerationFinished(Result<String, GenerationFailure>),
    Reset,
}

/// Work the caller has to carry out after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Write the pose collection and active id (settings tier, synchronous)
    PersistPoses {
        poses: Vec<CameraPose>,
        active_id: String,
    },
    /// Write the original image and its MIME type
    PersistOriginal(SourceImage),
    /// Write the generated image data URL (blob tier)
    PersistGenerated(String),
    /// Drop the stored generated image
    DiscardGenerated,
    /// Call the generation service
    Generate {
        image: SourceImage,
        settings: CameraSettings,
    },
    /// Wipe both persistence tiers
    ClearStorage,
}

#[derive(Debug, Clone)]
pub struct Session {
    poses: PoseStore,
    original: Option<SourceImage>,
    generated: Option<String>,
    status: Status,
    error: Option<String>,
    has_credential: bool,
    orbit: OrbitConfig,
}

impl Session {
    pub fn new(orbit: OrbitConfig) -> Self {
        Self {
            poses: PoseStore::default(),
            original: None,
            generated: None,
            status: Status::Initializing,
            error: None,
            has_credential: false,
            orbit,
        }
    }

    pub fn poses(&self) -> &PoseStore {
        &self.poses
    }

    pub fn original(&self) -> Option<&SourceImage> {
        self.original.as_ref()
    }

    pub fn generated(&self) -> Option<&str> {
        self.generated.as_deref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[cfg(test)]
    pub fn has_credential(&self) -> bool {
        self.has_credential
    }

    /// Whether the orbit widget and the generate button accept input
    pub fn controls_enabled(&self) -> bool {
        self.original.is_some() && !self.is_busy()
    }

    fn is_busy(&self) -> bool {
        matches!(
            self.status,
            Status::Initializing | Status::Uploading | Status::Generating
        )
    }

    fn persist_poses(&self) -> Effect {
        Effect::PersistPoses {
            poses: self.poses.poses().to_vec(),
            active_id: self.poses.active_id().to_string(),
        }
    }

    /// Pose mutations persist the collection only when something changed
    fn pose_effects(&self, changed: bool) -> Vec<Effect> {
        if changed {
            vec![self.persist_poses()]
        } else {
            Vec::new()
        }
    }

    /// Apply one action and return the effects to perform.
    ///
    /// Actions that make no sense in the current state are ignored and
    /// return no effects.
    pub fn apply(&mut self, action: Action) -> Vec<Effect> {
        if self.status == Status::Initializing && !matches!(action, Action::Restored { .. }) {
            log::debug!("Ignoring {:?} while restoring", action);
            return Vec::new();
        }

        match action {
            Action::Restored {
                snapshot,
                has_credential,
            } => {
                if self.status != Status::Initializing {
                    return Vec::new();
                }
                self.poses = PoseStore::from_parts(snapshot.poses, snapshot.active_id);
                self.original = snapshot.original;
                self.generated = snapshot.generated;
                self.has_credential = has_credential;
                self.status = if has_credential {
                    Status::Idle
                } else {
                    Status::NeedsCredential
                };
                Vec::new()
            }

            Action::CredentialRequested => {
                if !self.is_busy() {
                    self.status = Status::NeedsCredential;
                }
                Vec::new()
            }

            Action::CredentialSupplied => {
                self.has_credential = true;
                if self.status == Status::NeedsCredential {
                    self.status = Status::Idle;
                    self.error = None;
                }
                Vec::new()
            }

            Action::UploadStarted => {
                if !matches!(self.status, Status::Idle | Status::Success | Status::Error) {
                    return Vec::new();
                }
                self.status = Status::Uploading;
                self.error = None;
                let had_generated = self.generated.take().is_some();
                if had_generated {
                    vec![Effect::DiscardGenerated]
                } else {
                    Vec::new()
                }
            }

            Action::UploadFinished(result) => {
                if self.status != Status::Uploading {
                    return Vec::new();
                }
                match result {
                    Ok(image) => {
                        self.original = Some(image.clone());
                        self.status = Status::Idle;
                        vec![Effect::PersistOriginal(image)]
                    }
                    Err(reason) => {
                        log::warn!("Upload failed: {}", reason);
                        self.status = Status::Error;
                        self.error = Some(UPLOAD_FAILED_MESSAGE.to_string());
                        Vec::new()
                    }
                }
            }

            Action::SelectPose(id) => {
                let changed = self.poses.select(&id);
                self.pose_effects(changed)
            }

            Action::AddPose => {
                self.poses.add();
                vec![self.persist_poses()]
            }

            Action::RemovePose(id) => {
                let changed = self.poses.remove(&id);
                self.pose_effects(changed)
            }

            Action::UpdateActive(settings) => {
                let changed = self.poses.update_active(settings.normalized());
                self.pose_effects(changed)
            }

            Action::ApplyPreset(preset) => {
                let settings = preset.apply_to(&self.poses.active().settings);
                let changed = self.poses.update_active(settings);
                self.pose_effects(changed)
            }

            Action::Orbit(delta) => {
                if !self.controls_enabled() {
                    return Vec::new();
                }
                let settings = apply_drag(&self.poses.active().settings, delta, &self.orbit);
                let changed = self.poses.update_active(settings);
                self.pose_effects(changed)
            }

            Action::Generate => {
                if !matches!(self.status, Status::Idle | Status::Success | Status::Error) {
                    return Vec::new();
                }
                let Some(image) = self.original.clone() else {
                    return Vec::new();
                };
                self.status = Status::Generating;
                self.error = None;
                vec![Effect::Generate {
                    image,
                    settings: self.poses.active().settings.clone(),
                }]
            }

            Action::GenerationFinished(result) => {
                if self.status != Status::Generating {
                    return Vec::new();
                }
                match result {
                    Ok(data_url) => {
                        self.generated = Some(data_url.clone());
                        self.status = Status::Success;
                        vec![Effect::PersistGenerated(data_url)]
                    }
                    Err(GenerationFailure::Credential) => {
                        self.has_credential = false;
                        self.status = Status::NeedsCredential;
                        self.error = Some(CREDENTIAL_FAILED_MESSAGE.to_string());
                        Vec::new()
                    }
                    Err(GenerationFailure::Other(reason)) => {
                        log::warn!("Generation failed: {}", reason);
                        self.status = Status::Error;
                        self.error = Some(GENERATION_FAILED_MESSAGE.to_string());
                        Vec::new()
                    }
                }
            }

            Action::Reset => {
                self.poses = PoseStore::default();
                self.original = None;
                self.generated = None;
                self.error = None;
                self.status = Status::Idle;
                vec![Effect::ClearStorage]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::camera::AspectRatio;
    use crate::state::poses::DEFAULT_POSE_ID;
    use crate::state::presets;

    fn image() -> SourceImage {
        SourceImage {
            base64: "AAEC".into(),
            mime_type: "image/jpeg".into(),
        }
    }

    fn restored(snapshot: SessionSnapshot, has_credential: bool) -> Session {
        let mut session = Session::new(OrbitConfig::default());
        session.apply(Action::Restored {
            snapshot,
            has_credential,
        });
        session
    }

    /// Idle session with a source image loaded
    fn ready() -> Session {
        restored(
            SessionSnapshot {
                original: Some(image()),
                ..SessionSnapshot::default()
            },
            true,
        )
    }

    #[test]
    fn test_restore_without_data_or_credential() {
        let session = restored(SessionSnapshot::default(), false);
        assert_eq!(session.status(), Status::NeedsCredential);
        assert_eq!(session.poses(), &PoseStore::default());
        assert_eq!(session.poses().active().settings, CameraSettings::default());
        assert!(session.original().is_none());
        assert!(session.generated().is_none());
    }

    #[test]
    fn test_restore_with_credential_is_idle() {
        let session = restored(SessionSnapshot::default(), true);
        assert_eq!(session.status(), Status::Idle);
    }

    #[test]
    fn test_actions_ignored_while_initializing() {
        let mut session = Session::new(OrbitConfig::default());
        assert!(session.apply(Action::AddPose).is_empty());
        assert_eq!(session.poses().len(), 1);
        assert_eq!(session.status(), Status::Initializing);
    }

    #[test]
    fn test_credential_supplied_leaves_prompt() {
        let mut session = restored(SessionSnapshot::default(), false);
        session.apply(Action::CredentialSupplied);
        assert_eq!(session.status(), Status::Idle);
        assert!(session.has_credential());
    }

    #[test]
    fn test_upload_flow() {
        let mut session = restored(SessionSnapshot::default(), true);

        assert!(session.apply(Action::UploadStarted).is_empty());
        assert_eq!(session.status(), Status::Uploading);

        let effects = session.apply(Action::UploadFinished(Ok(image())));
        assert_eq!(effects, vec![Effect::PersistOriginal(image())]);
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.original(), Some(&image()));
    }

    #[test]
    fn test_upload_discards_previous_result() {
        let mut session = restored(
            SessionSnapshot {
                original: Some(image()),
                generated: Some("data:image/png;base64,AA".into()),
                ..SessionSnapshot::default()
            },
            true,
        );
        let effects = session.apply(Action::UploadStarted);
        assert_eq!(effects, vec![Effect::DiscardGenerated]);
        assert!(session.generated().is_none());
    }

    #[test]
    fn test_upload_failure_is_error() {
        let mut session = restored(SessionSnapshot::default(), true);
        session.apply(Action::UploadStarted);
        let effects = session.apply(Action::UploadFinished(Err("not an image".into())));
        assert!(effects.is_empty());
        assert_eq!(session.status(), Status::Error);
        assert_eq!(session.error(), Some(UPLOAD_FAILED_MESSAGE));
    }

    #[test]
    fn test_generate_requires_image() {
        let mut session = restored(SessionSnapshot::default(), true);
        assert!(session.apply(Action::Generate).is_empty());
        assert_eq!(session.status(), Status::Idle);
    }

    #[test]
    fn test_generate_uses_active_settings() {
        let mut session = ready();
        session.apply(Action::ApplyPreset(presets::find("Aerial").unwrap()));

        let effects = session.apply(Action::Generate);

        assert_eq!(session.status(), Status::Generating);
        match &effects[..] {
            [Effect::Generate { image: sent, settings }] => {
                assert_eq!(sent, &image());
                assert_eq!(settings.azimuth, 45);
                assert_eq!(settings.elevation, 45);
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn test_second_generate_while_busy_is_ignored() {
        let mut session = ready();
        session.apply(Action::Generate);
        assert!(session.apply(Action::Generate).is_empty());
        assert!(!session.controls_enabled());
    }

    #[test]
    fn test_generation_success_persists_result() {
        let mut session = ready();
        session.apply(Action::Generate);
        let url = "data:image/png;base64,iVBORw==".to_string();

        let effects = session.apply(Action::GenerationFinished(Ok(url.clone())));

        assert_eq!(effects, vec![Effect::PersistGenerated(url.clone())]);
        assert_eq!(session.status(), Status::Success);
        assert_eq!(session.generated(), Some(url.as_str()));
    }

    #[test]
    fn test_credential_failure_asks_for_key() {
        let mut session = ready();
        session.apply(Action::Generate);
        session.apply(Action::GenerationFinished(Err(GenerationFailure::Credential)));

        assert_eq!(session.status(), Status::NeedsCredential);
        assert!(!session.has_credential());
        assert_eq!(session.error(), Some(CREDENTIAL_FAILED_MESSAGE));
    }

    #[test]
    fn test_other_failure_is_generic_error() {
        let mut session = ready();
        session.apply(Action::Generate);
        session.apply(Action::GenerationFinished(Err(GenerationFailure::Other(
            "generation API error (500): internal".into(),
        ))));

        assert_eq!(session.status(), Status::Error);
        assert_eq!(session.error(), Some(GENERATION_FAILED_MESSAGE));

        // A new attempt is possible from the error state
        assert_eq!(session.apply(Action::Generate).len(), 1);
    }

    #[test]
    fn test_pose_mutations_persist() {
        let mut session = ready();

        let effects = session.apply(Action::AddPose);
        assert_eq!(session.poses().len(), 2);
        match &effects[..] {
            [Effect::PersistPoses { poses, active_id }] => {
                assert_eq!(poses.len(), 2);
                assert_eq!(active_id, session.poses().active_id());
            }
            other => panic!("unexpected effects: {other:?}"),
        }

        assert_eq!(session.apply(Action::SelectPose(DEFAULT_POSE_ID.into())).len(), 1);
        assert!(session.apply(Action::SelectPose("missing".into())).is_empty());
    }

    #[test]
    fn test_removing_last_pose_persists_nothing() {
        let mut session = ready();
        assert!(session.apply(Action::RemovePose(DEFAULT_POSE_ID.into())).is_empty());
        assert_eq!(session.poses().len(), 1);
    }

    #[test]
    fn test_update_active_is_normalized() {
        let mut session = ready();
        let settings = CameraSettings {
            elevation: 140,
            aspect_ratio: AspectRatio::Wide16x9,
            ..CameraSettings::default()
        };
        session.apply(Action::UpdateActive(settings));
        let active = &session.poses().active().settings;
        assert_eq!(active.elevation, 90);
        assert_eq!(active.aspect_ratio, AspectRatio::Wide16x9);
    }

    #[test]
    fn test_orbit_moves_active_pose_only() {
        let mut session = ready();
        let first = session.poses().active_id().to_string();
        session.apply(Action::AddPose);
        let second = session.poses().active_id().to_string();
        assert_ne!(first, second);

        let effects = session.apply(Action::Orbit(OrbitDelta { dx: 50.0, dy: -10.0 }));
        assert_eq!(effects.len(), 1);

        let moved = &session.poses().get(&second).unwrap().settings;
        assert_eq!(moved.azimuth, 30);
        assert_eq!(moved.elevation, 6);
        assert_eq!(session.poses().get(&first).unwrap().settings.azimuth, 0);
    }

    #[test]
    fn test_orbit_ignored_without_image() {
        let mut session = restored(SessionSnapshot::default(), true);
        assert!(session
            .apply(Action::Orbit(OrbitDelta { dx: 50.0, dy: 0.0 }))
            .is_empty());
        assert_eq!(session.poses().active().settings.azimuth, 0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut session = ready();
        session.apply(Action::AddPose);
        session.apply(Action::Generate);
        session.apply(Action::GenerationFinished(Ok("data:image/png;base64,AA".into())));

        let effects = session.apply(Action::Reset);

        assert_eq!(effects, vec![Effect::ClearStorage]);
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.poses(), &PoseStore::default());
        assert!(session.original().is_none());
        assert!(session.generated().is_none());
    }

    #[test]
    fn test_switch_key_from_success() {
        let mut session = ready();
        session.apply(Action::Generate);
        // Not while a request is outstanding
        session.apply(Action::CredentialRequested);
        assert_eq!(session.status(), Status::Generating);

        session.apply(Action::GenerationFinished(Ok("data:image/png;base64,AA".into())));
        session.apply(Action::CredentialRequested);
        assert_eq!(session.status(), Status::NeedsCredential);
    }
}
