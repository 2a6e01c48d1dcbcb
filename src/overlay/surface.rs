//! Abstract drawing surface for the pose overlay
//!
//! The overlay renderer only needs primitive draw calls, so any platform
//! drawing API can be bound behind [`DrawSurface`]. A recording
//! implementation is provided for headless use and tests.

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
}

/// Primitive draw calls accepted by an overlay target.
///
/// Coordinates are in pixels of the displayed video area. Implementations
/// must not retain state between calls beyond the pixels they produce;
/// the renderer redraws the full overlay on every invocation.
pub trait DrawSurface {
    /// Straight line of uniform color.
    fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color);

    /// Straight line with a two-stop gradient from `from_color` to `to_color`.
    fn gradient_line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        from_color: Color,
        to_color: Color,
    );

    /// Filled circle.
    fn circle(&mut self, center: (f32, f32), radius: f32, color: Color);

    /// Stroked circle outline.
    fn ring(&mut self, center: (f32, f32), radius: f32, width: f32, color: Color);

    /// Single line of text anchored at `pos` (top-left).
    fn text(&mut self, pos: (f32, f32), size: f32, color: Color, content: &str);
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Color,
    },
    GradientLine {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        from_color: Color,
        to_color: Color,
    },
    Circle {
        center: (f32, f32),
        radius: f32,
        color: Color,
    },
    Ring {
        center: (f32, f32),
        radius: f32,
        width: f32,
        color: Color,
    },
    Text {
        pos: (f32, f32),
        size: f32,
        color: Color,
        content: String,
    },
}

/// A [`DrawSurface`] that records draw calls instead of rasterizing them.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl DrawSurface for RecordingSurface {
    fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
        self.ops.push(DrawOp::Line { from, to, width, color });
    }

    fn gradient_line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        from_color: Color,
        to_color: Color,
    ) {
        self.ops.push(DrawOp::GradientLine { from, to, width, from_color, to_color });
    }

    fn circle(&mut self, center: (f32, f32), radius: f32, color: Color) {
        self.ops.push(DrawOp::Circle { center, radius, color });
    }

    fn ring(&mut self, center: (f32, f32), radius: f32, width: f32, color: Color) {
        self.ops.push(DrawOp::Ring { center, radius, width, color });
    }

    fn text(&mut self, pos: (f32, f32), size: f32, color: Color, content: &str) {
        self.ops.push(DrawOp::Text { pos, size, color, content: content.to_string() });
    }
}
