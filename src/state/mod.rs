/// State management module
///
/// This module handles all session state, including:
/// - Camera parameters and their ranges (camera.rs)
/// - The named pose collection (poses.rs)
/// - Built-in shot presets (presets.rs)
/// - Shared data structures (data.rs)
/// - The SQLite session database (library.rs)
/// - The session state machine (session.rs)

pub mod camera;
pub mod data;
pub mod library;
pub mod poses;
pub mod presets;
pub mod session;
