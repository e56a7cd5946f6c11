/// Search window of a tracking primitive, in image pixels.
///
/// Stored as top-left corner plus size; corner form is derived on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Window spanning the corners `(x1, y1)` and `(x2, y2)`.
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Window of the given size around a cell center.
    #[inline]
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// `[x1, y1, x2, y2]`.
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }

    /// Point a trajectory records for this window.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        ((self.x + self.right()) / 2.0, (self.y + self.bottom()) / 2.0)
    }

    /// Same box moved so its top-left corner sits at `(x, y)`.
    #[inline]
    pub fn moved_to(&self, x: f32, y: f32) -> Self {
        Self { x, y, ..*self }
    }

    /// Whether the whole box lies inside a `width` x `height` frame.
    pub fn is_within_frame(&self, width: u32, height: u32) -> bool {
        let [x1, y1, x2, y2] = self.to_tlbr();
        x1 >= 0.0 && y1 >= 0.0 && x2 <= width as f32 && y2 <= height as f32
    }

    /// Integer pixel corners enclosing the box: `(floor(x1), floor(y1))`, `(ceil(x2), ceil(y2))`.
    pub fn pixel_corners(&self) -> ((i32, i32), (i32, i32)) {
        let [x1, y1, x2, y2] = self.to_tlbr();
        (
            (x1.floor() as i32, y1.floor() as i32),
            (x2.ceil() as i32, y2.ceil() as i32),
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_from_tlbr() {
        let rect = Rect::from_tlbr(10.0, 20.0, 40.0, 60.0);
        assert_eq!(rect, Rect::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(rect.to_tlbr(), [10.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn test_from_center() {
        let rect = Rect::from_center(25.0, 40.0, 30.0, 40.0);
        assert_abs_diff_eq!(rect.x, 10.0);
        assert_abs_diff_eq!(rect.y, 20.0);
        assert_eq!(rect.center(), (25.0, 40.0));
    }

    #[test]
    fn test_is_within_frame() {
        assert!(Rect::new(0.0, 0.0, 10.0, 10.0).is_within_frame(10, 10));
        assert!(!Rect::new(-0.5, 0.0, 10.0, 10.0).is_within_frame(20, 20));
        assert!(!Rect::new(5.0, 5.0, 10.0, 10.0).is_within_frame(14, 20));
    }

    #[test]
    fn test_pixel_corners() {
        let rect = Rect::new(1.5, 2.2, 3.0, 3.0);
        assert_eq!(rect.pixel_corners(), ((1, 2), (5, 6)));
    }

    #[test]
    fn test_moved_to_keeps_size() {
        let rect = Rect::new(0.0, 0.0, 4.0, 6.0).moved_to(3.0, 7.0);
        assert_eq!(rect, Rect::new(3.0, 7.0, 4.0, 6.0));
        assert_eq!((rect.right(), rect.bottom()), (7.0, 13.0));
    }
}
