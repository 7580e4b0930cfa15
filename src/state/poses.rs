/// Named camera poses
///
/// The pose store owns an ordered list of poses and the id of the active one.
/// Mutations return `true` when they changed something so the caller knows
/// when the collection has to be written back to the session database.

use serde::{Deserialize, Serialize};

use super::camera::CameraSettings;

/// Id of the pose every fresh session starts with
pub const DEFAULT_POSE_ID: &str = "cam-1";

/// A named, saved combination of camera settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CameraPose {
    pub id: String,
    pub name: String,
    pub settings: CameraSettings,
}

impl CameraPose {
    fn default_pose() -> Self {
        Self {
            id: DEFAULT_POSE_ID.to_string(),
            name: display_name(1),
            settings: CameraSettings::default(),
        }
    }
}

fn display_name(number: usize) -> String {
    format!("Camera {}", number)
}

/// Ordered pose collection plus the active pose id
///
/// The active id always resolves to a member of `poses`, and `poses` is never
/// empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseStore {
    poses: Vec<CameraPose>,
    active_id: String,
}

impl Default for PoseStore {
    fn default() -> Self {
        Self {
            poses: vec![CameraPose::default_pose()],
            active_id: DEFAULT_POSE_ID.to_string(),
        }
    }
}

impl PoseStore {
    /// Rebuild a store from persisted parts.
    ///
    /// An empty list falls back to the default collection, duplicate ids keep
    /// their first occurrence, and an active id that does not resolve is
    /// replaced by the first pose.
    pub fn from_parts(poses: Vec<CameraPose>, active_id: Option<String>) -> Self {
        let mut unique: Vec<CameraPose> = Vec::with_capacity(poses.len());
        for mut pose in poses {
            if unique.iter().any(|p| p.id == pose.id) {
                log::warn!("Dropping pose with duplicate id {}", pose.id);
                continue;
            }
            pose.settings = pose.settings.normalized();
            unique.push(pose);
        }

        if unique.is_empty() {
            return Self::default();
        }

        let active_id = active_id
            .filter(|id| unique.iter().any(|p| &p.id == id))
            .unwrap_or_else(|| unique[0].id.clone());

        Self {
            poses: unique,
            active_id,
        }
    }

    pub fn poses(&self) -> &[CameraPose] {
        &self.poses
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn get(&self, id: &str) -> Option<&CameraPose> {
        self.poses.iter().find(|p| p.id == id)
    }

    /// The active pose
    pub fn active(&self) -> &CameraPose {
        // The invariant keeps `active_id` resolvable; the first pose is a
        // fallback that is never expected to be taken.
        self.get(&self.active_id).unwrap_or(&self.poses[0])
    }

    /// Append a copy of the active settings as a new pose and make it active.
    ///
    /// Returns the new pose id.
    pub fn add(&mut self) -> String {
        let id = self.fresh_id(chrono::Utc::now().timestamp_millis());
        let pose = CameraPose {
            id: id.clone(),
            name: display_name(self.poses.len() + 1),
            settings: self.active().settings.clone(),
        };
        self.poses.push(pose);
        self.active_id = id.clone();
        id
    }

    /// Replace a pose's settings wholesale. Unknown ids are ignored.
    pub fn update(&mut self, id: &str, settings: CameraSettings) -> bool {
        match self.poses.iter_mut().find(|p| p.id == id) {
            Some(pose) => {
                if pose.settings == settings {
                    return false;
                }
                pose.settings = settings;
                true
            }
            None => false,
        }
    }

    /// Replace the active pose's settings
    pub fn update_active(&mut self, settings: CameraSettings) -> bool {
        let id = self.active_id.clone();
        self.update(&id, settings)
    }

    /// Remove a pose. The last remaining pose cannot be removed.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.poses.len() <= 1 {
            return false;
        }
        let Some(index) = self.poses.iter().position(|p| p.id == id) else {
            return false;
        };
        self.poses.remove(index);
        if self.active_id == id {
            self.active_id = self.poses[0].id.clone();
        }
        true
    }

    /// Make an existing pose active
    pub fn select(&mut self, id: &str) -> bool {
        if self.active_id == id || self.get(id).is_none() {
            return false;
        }
        self.active_id = id.to_string();
        true
    }

    /// `cam-<millis>`, bumped until it does not collide with an existing id
    fn fresh_id(&self, millis: i64) -> String {
        let mut stamp = millis;
        loop {
            let id = format!("cam-{}", stamp);
            if self.get(&id).is_none() {
                return id;
            }
            stamp += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_azimuth(azimuth: i32) -> CameraSettings {
        CameraSettings {
            azimuth,
            ..CameraSettings::default()
        }
    }

    #[test]
    fn test_default_store_has_single_pose() {
        let store = PoseStore::default();
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_id(), DEFAULT_POSE_ID);
        assert_eq!(store.active().name, "Camera 1");
        assert_eq!(store.active().settings, CameraSettings::default());
    }

    #[test]
    fn test_add_copies_active_settings_and_activates() {
        let mut store = PoseStore::default();
        store.update_active(settings_with_azimuth(90));

        let id = store.add();

        assert_eq!(store.len(), 2);
        assert_eq!(store.active_id(), id);
        assert_eq!(store.active().name, "Camera 2");
        assert_eq!(store.active().settings.azimuth, 90);
    }

    #[test]
    fn test_add_generates_unique_ids() {
        let mut store = PoseStore::default();
        let a = store.add();
        let b = store.add();
        let c = store.add();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_fresh_id_skips_taken_stamp() {
        let mut store = PoseStore::default();
        store.poses.push(CameraPose {
            id: "cam-500".into(),
            name: "Camera 2".into(),
            settings: CameraSettings::default(),
        });
        assert_eq!(store.fresh_id(500), "cam-501");
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut store = PoseStore::default();
        let before = store.clone();
        assert!(!store.update("missing", settings_with_azimuth(45)));
        assert_eq!(store, before);
    }

    #[test]
    fn test_update_replaces_settings() {
        let mut store = PoseStore::default();
        assert!(store.update(DEFAULT_POSE_ID, settings_with_azimuth(45)));
        assert_eq!(store.active().settings.azimuth, 45);
        // Same value again changes nothing
        assert!(!store.update(DEFAULT_POSE_ID, settings_with_azimuth(45)));
    }

    #[test]
    fn test_remove_last_pose_is_noop() {
        let mut store = PoseStore::default();
        assert!(!store.remove(DEFAULT_POSE_ID));
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_id(), DEFAULT_POSE_ID);
    }

    #[test]
    fn test_remove_active_selects_first_remaining() {
        let mut store = PoseStore::default();
        let second = store.add();
        let third = store.add();
        assert_eq!(store.active_id(), third);

        store.select(&second);
        assert!(store.remove(&second));

        assert_eq!(store.len(), 2);
        assert_eq!(store.active_id(), DEFAULT_POSE_ID);
    }

    #[test]
    fn test_remove_first_while_active_moves_to_next() {
        let mut store = PoseStore::default();
        let second = store.add();
        store.select(DEFAULT_POSE_ID);

        assert!(store.remove(DEFAULT_POSE_ID));
        assert_eq!(store.active_id(), second);
    }

    #[test]
    fn test_remove_inactive_keeps_active() {
        let mut store = PoseStore::default();
        let second = store.add();
        assert!(store.remove(DEFAULT_POSE_ID));
        assert_eq!(store.active_id(), second);
    }

    #[test]
    fn test_select_requires_existing_id() {
        let mut store = PoseStore::default();
        let second = store.add();
        assert!(store.select(DEFAULT_POSE_ID));
        assert!(!store.select("nope"));
        assert_eq!(store.active_id(), DEFAULT_POSE_ID);
        assert!(store.select(&second));
    }

    #[test]
    fn test_from_parts_repairs_active_id() {
        let poses = vec![CameraPose {
            id: "cam-7".into(),
            name: "Camera 1".into(),
            settings: settings_with_azimuth(30),
        }];
        let store = PoseStore::from_parts(poses, Some("cam-404".into()));
        assert_eq!(store.active_id(), "cam-7");
    }

    #[test]
    fn test_from_parts_empty_is_default() {
        let store = PoseStore::from_parts(Vec::new(), Some("cam-9".into()));
        assert_eq!(store, PoseStore::default());
    }

    #[test]
    fn test_from_parts_drops_duplicate_ids() {
        let pose = CameraPose {
            id: "cam-2".into(),
            name: "Camera 2".into(),
            settings: CameraSettings::default(),
        };
        let store = PoseStore::from_parts(vec![pose.clone(), pose], None);
        assert_eq!(store.len(), 1);
    }
}
