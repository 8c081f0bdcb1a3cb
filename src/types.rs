//! Geometry types for the warning dialog (logical points, origin top-left)

/// Width and height in logical points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both dimensions strictly positive
    pub fn is_positive(self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn as_array(self) -> [f32; 2] {
        [self.width, self.height]
    }
}

impl From<egui::Vec2> for Size {
    fn from(v: egui::Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// A position in 2D space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Position> for egui::Pos2 {
    fn from(pos: Position) -> Self {
        egui::pos2(pos.x, pos.y)
    }
}

/// Axis-aligned rectangle: origin plus size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Region {
    pub origin: Position,
    pub size: Size,
}

impl Region {
    pub const fn new(origin: Position, size: Size) -> Self {
        Self { origin, size }
    }

    /// Square of `side` anchored at the bottom-left corner of `container`
    pub fn bottom_left(container: Size, side: f32) -> Self {
        Self::new(
            Position::new(0.0, container.height - side),
            Size::new(side, side),
        )
    }
}

impl From<Region> for egui::Rect {
    fn from(region: Region) -> Self {
        egui::Rect::from_min_size(
            region.origin.into(),
            egui::vec2(region.size.width, region.size.height),
        )
    }
}

/// Origin that centers `window` on `display`.
/// Falls back to `fallback` when the display size is unknown or degenerate.
pub fn centered_origin(display: Option<Size>, window: Size, fallback: Size) -> Position {
    let display = display.filter(|d| d.is_positive()).unwrap_or(fallback);
    Position::new(
        (display.width - window.width) / 2.0,
        (display.height - window.height) / 2.0,
    )
}
