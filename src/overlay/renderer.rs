//! Pose overlay renderer
//!
//! Draws one pose frame onto a [`DrawSurface`] sized to the currently
//! displayed video area. Rendering is pull-driven by playback-time changes
//! and fully redraws on every call, so it is safe to invoke at arbitrary
//! rates; identical input produces identical draw calls.

use crate::pose::catalog::{catalog_for, measure};
use crate::pose::geometry::evaluate;
use crate::pose::{AngleStatus, PoseFrame, Point, Sport};

use super::skeleton::{group_of, CONNECTIONS};
use super::surface::{Color, DrawSurface};

/// Pixel size of the video area the overlay is drawn over.
///
/// Under responsive layout this may differ from the clip's native
/// resolution; callers pass the current size on every render so the scale
/// is always recomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayArea {
    pub width: f32,
    pub height: f32,
}

impl DisplayArea {
    pub fn new(width: f32, height: f32) -> Self {
        DisplayArea { width, height }
    }

    fn to_pixels(&self, p: Point) -> (f32, f32) {
        (p.x * self.width, p.y * self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayOptions {
    /// Draw the angle rings and readouts in addition to the skeleton.
    pub show_angles: bool,
    pub joint_radius: f32,
    pub connection_width: f32,
    pub ring_radius: f32,
    pub text_size: f32,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        OverlayOptions {
            show_angles: true,
            joint_radius: 5.0,
            connection_width: 3.0,
            ring_radius: 14.0,
            text_size: 12.0,
        }
    }
}

fn status_color(status: AngleStatus) -> Color {
    match status {
        AngleStatus::Good => Color::rgb(46, 204, 113),
        AngleStatus::Warning => Color::rgb(241, 196, 15),
        AngleStatus::Poor => Color::rgb(231, 76, 60),
    }
}

/// Stateless renderer for one sport's overlay.
#[derive(Debug, Clone, Copy)]
pub struct OverlayRenderer {
    sport: Sport,
    options: OverlayOptions,
}

impl OverlayRenderer {
    pub fn new(sport: Sport, options: OverlayOptions) -> Self {
        OverlayRenderer { sport, options }
    }

    pub fn sport(&self) -> Sport {
        self.sport
    }

    /// Draw the full overlay for one frame.
    ///
    /// Connections are drawn before joint markers so markers sit on top.
    /// A connection or marker is drawn only when its joints are visible.
    pub fn render(&self, frame: &PoseFrame, area: DisplayArea, surface: &mut dyn DrawSurface) {
        for (a, b) in CONNECTIONS {
            let (Some(pa), Some(pb)) = (frame.visible_position(a), frame.visible_position(b)) else {
                continue;
            };
            surface.gradient_line(
                area.to_pixels(pa),
                area.to_pixels(pb),
                self.options.connection_width,
                group_of(a).color(),
                group_of(b).color(),
            );
        }

        for joint in &frame.joints {
            if !joint.visible {
                continue;
            }
            surface.circle(
                area.to_pixels(joint.position),
                self.options.joint_radius,
                group_of(joint.name).color(),
            );
        }

        if self.options.show_angles {
            self.render_angles(frame, area, surface);
        }
    }

    /// Status ring plus a stacked name/value readout at each measurable
    /// catalog angle's vertex.
    fn render_angles(&self, frame: &PoseFrame, area: DisplayArea, surface: &mut dyn DrawSurface) {
        for def in catalog_for(self.sport) {
            let Some(measurement) = measure(frame, def) else {
                continue;
            };
            // measure() guarantees the vertex is visible here
            let Some(vertex) = frame.visible_position(def.vertex()) else {
                continue;
            };

            let center = area.to_pixels(vertex);
            let status = evaluate(measurement.degrees, def.ideal);
            surface.ring(center, self.options.ring_radius, 3.0, status_color(status));

            let text_x = center.0 + self.options.ring_radius + 4.0;
            surface.text(
                (text_x, center.1 - self.options.text_size),
                self.options.text_size,
                Color::WHITE,
                def.label,
            );
            surface.text(
                (text_x, center.1 + 2.0),
                self.options.text_size,
                Color::WHITE,
                &format!("{:.1}\u{b0}", measurement.degrees),
            );
        }
    }
}
