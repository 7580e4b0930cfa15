/// UI widgets
///
/// - The drag-to-orbit camera control (orbit.rs)
/// - View builders for the control panels (controls.rs)

pub mod controls;
pub mod orbit;
