/// A rectangle representing a window's position and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rect from edge coordinates, as stored in a native RECT.
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }

    /// Horizontal center of the rectangle.
    pub fn center_x(&self) -> i32 {
        self.x + self.width / 2
    }

    /// Vertical center of the rectangle.
    pub fn center_y(&self) -> i32 {
        self.y + self.height / 2
    }
}
