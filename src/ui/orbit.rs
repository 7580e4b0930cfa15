use cgmath::{Angle, Deg};
use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Frame, LineDash, Path, Program, Stroke};
use iced::{Color, Pixels, Point, Rectangle, Renderer, Size, Theme, Vector};

use crate::state::camera::{wrap_azimuth, CameraSettings, ELEVATION_RANGE};
use crate::state::poses::CameraPose;
use crate::Message;

/// How drag distance turns into degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitConfig {
    /// Degrees per pixel of pointer travel
    pub sensitivity: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self { sensitivity: 0.6 }
    }
}

/// Pointer travel since the previous sample, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitDelta {
    pub dx: f32,
    pub dy: f32,
}

/// Settings after dragging the camera by `delta`.
///
/// Horizontal drag orbits, vertical drag pitches (dragging up looks up).
/// Both angles are rounded to whole degrees; azimuth wraps into
/// (-180, 180] and elevation clamps to [-90, 90].
pub fn apply_drag(settings: &CameraSettings, delta: OrbitDelta, config: &OrbitConfig) -> CameraSettings {
    let azimuth = settings.azimuth as f32 + delta.dx * config.sensitivity;
    let elevation = settings.elevation as f32 - delta.dy * config.sensitivity;

    CameraSettings {
        azimuth: wrap_azimuth(azimuth.round() as i32),
        elevation: (elevation.round() as i32).clamp(ELEVATION_RANGE.0, ELEVATION_RANGE.1),
        ..settings.clone()
    }
}

/// One pointer-drag gesture.
///
/// `start` captures the pointer, each `move_to` yields the travel since the
/// last sample, `end` releases. There is no inertia.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    last_position: Option<Point>,
}

impl DragSession {
    pub fn is_dragging(&self) -> bool {
        self.last_position.is_some()
    }

    pub fn start(&mut self, position: Point) {
        self.last_position = Some(position);
    }

    /// Travel since the previous sample, `None` when no drag is in progress
    pub fn move_to(&mut self, position: Point) -> Option<OrbitDelta> {
        let last = self.last_position.replace(position)?;
        Some(OrbitDelta {
            dx: position.x - last.x,
            dy: position.y - last.y,
        })
    }

    pub fn end(&mut self) {
        self.last_position = None;
    }
}

/// Where a pose's marker sits on the schematic orbit.
///
/// Azimuth 0 sits on the vertical axis through the subject and ±90 on the
/// ends of the ring. The vertical axis is squashed to fake a tilted ground
/// plane.
pub fn marker_position(settings: &CameraSettings, center: Point, radius: f32) -> Point {
    let azimuth = Deg(settings.azimuth as f32 - 90.0);
    let elevation = Deg(settings.elevation as f32);

    Point::new(
        center.x + radius * azimuth.cos() * elevation.cos(),
        center.y - radius * 0.6 * elevation.sin(),
    )
}

const ACTIVE_COLOR: Color = Color::from_rgb(0.39, 0.40, 0.95);
const INACTIVE_COLOR: Color = Color::from_rgb(0.28, 0.33, 0.41);
const SIGHT_LINE_COLOR: Color = Color::from_rgb(0.96, 0.45, 0.71);

/// Drag-to-orbit schematic showing every pose around the subject.
///
/// Only the active pose responds to drags; the others are drawn faded and
/// are never changed from here.
pub struct OrbitControl<'a> {
    pub poses: &'a [CameraPose],
    pub active_id: &'a str,
    pub disabled: bool,
}

impl OrbitControl<'_> {
    fn active(&self) -> Option<&CameraPose> {
        self.poses
            .iter()
            .find(|p| p.id == self.active_id)
            .or_else(|| self.poses.first())
    }
}

impl Program<Message> for OrbitControl<'_> {
    type State = DragSession;

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());

        let center = Point::new(bounds.width / 2.0, bounds.height / 2.0);
        let radius = bounds.width.min(bounds.height * 1.5) * 0.4;

        // Ground ring
        let ring = Path::new(|builder| {
            const SEGMENTS: usize = 72;
            for i in 0..=SEGMENTS {
                let t = Deg(360.0 * i as f32 / SEGMENTS as f32);
                let point = Point::new(
                    center.x + radius * t.cos(),
                    center.y + radius * 0.25 * t.sin(),
                );
                if i == 0 {
                    builder.move_to(point);
                } else {
                    builder.line_to(point);
                }
            }
        });
        frame.stroke(
            &ring,
            Stroke::default()
                .with_color(Color::from_rgb(0.12, 0.16, 0.23))
                .with_width(1.0),
        );

        // Subject
        frame.fill_rectangle(
            Point::new(center.x - 12.0, center.y - 16.0),
            Size::new(24.0, 32.0),
            Color::from_rgb(0.2, 0.25, 0.33),
        );
        frame.fill(
            &Path::circle(Point::new(center.x, center.y - 4.0), 6.0),
            Color::from_rgb(0.98, 0.75, 0.14),
        );

        // Inactive markers first so the active one is drawn on top
        for pose in self.poses.iter().filter(|p| p.id != self.active_id) {
            let position = marker_position(&pose.settings, center, radius);
            frame.fill_rectangle(
                position - Vector::new(6.0, 4.0),
                Size::new(12.0, 8.0),
                Color {
                    a: 0.3,
                    ..INACTIVE_COLOR
                },
            );
        }

        if let Some(active) = self.active() {
            let position = marker_position(&active.settings, center, radius);

            let sight_line = Path::line(center, position);
            frame.stroke(
                &sight_line,
                Stroke {
                    line_dash: LineDash {
                        segments: &[3.0, 3.0],
                        offset: 0,
                    },
                    ..Stroke::default()
                        .with_color(SIGHT_LINE_COLOR)
                        .with_width(1.5)
                },
            );

            frame.fill(
                &Path::circle(position, 10.0),
                Color {
                    a: 0.2,
                    ..SIGHT_LINE_COLOR
                },
            );
            frame.fill_rectangle(
                position - Vector::new(10.0, 6.0),
                Size::new(20.0, 12.0),
                ACTIVE_COLOR,
            );

            frame.fill_text(canvas::Text {
                content: format!("ACTIVE POSE: {}", active.name),
                position: Point::new(8.0, bounds.height - 18.0),
                color: Color::from_rgb(0.58, 0.64, 0.72),
                size: Pixels(11.0),
                ..canvas::Text::default()
            });
        }

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        if self.disabled {
            // Drop any gesture that was in flight when the widget got disabled
            state.end();
            return (canvas::event::Status::Ignored, None);
        }

        match event {
            // Press inside the schematic captures the pointer
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(position) = cursor.position_in(bounds) {
                    state.start(position);
                    return (canvas::event::Status::Captured, None);
                }
            }

            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if state.is_dragging() {
                    state.end();
                    return (canvas::event::Status::Captured, None);
                }
            }

            // While captured, moves count even outside the widget
            canvas::Event::Mouse(mouse::Event::CursorMoved { position }) => {
                let local = Point::new(position.x - bounds.x, position.y - bounds.y);
                if let Some(delta) = state.move_to(local) {
                    return (canvas::event::Status::Captured, Some(Message::Orbit(delta)));
                }
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if self.disabled {
            mouse::Interaction::NotAllowed
        } else if state.is_dragging() {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::default()
        }
    }
}
