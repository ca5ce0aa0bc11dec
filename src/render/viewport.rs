use glam::IVec2;

/// Axis-aligned screen rectangle, max exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub min: IVec2,
    pub max: IVec2,
}

impl Rect {
    pub fn new(min: IVec2, max: IVec2) -> Self {
        Rect { min, max }
    }

    pub fn from_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect::new(IVec2::new(x, y), IVec2::new(x + width.max(0), y + height.max(0)))
    }

    /// Screen area of one tile sprite whose top-left corner is `origin`.
    pub fn tile(origin: IVec2, size: i32) -> Self {
        Rect::new(origin, origin + IVec2::splat(size))
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> IVec2 {
        (self.min + self.max) / 2
    }

    /// Moves the rectangle so its center lands on `center`, keeping its size.
    pub fn center_on(&mut self, center: IVec2) {
        let size = self.max - self.min;
        self.min = center - size / 2;
        self.max = self.min + size;
    }

    pub fn contains(&self, p: IVec2) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x && other.min.x < self.max.x && self.min.y < other.max.y && other.min.y < self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection_is_exclusive() {
        let view = Rect::from_size(0, 0, 100, 50);
        assert!(view.intersects(&Rect::tile(IVec2::new(99, 49), 10)));
        assert!(!view.intersects(&Rect::tile(IVec2::new(100, 0), 10)));
        assert!(!view.intersects(&Rect::tile(IVec2::new(-10, 0), 10)));
        assert!(view.intersects(&Rect::tile(IVec2::new(-9, -9), 10)));
    }

    #[test]
    fn test_center_on_keeps_size() {
        let mut view = Rect::from_size(0, 0, 1280, 720);
        view.center_on(IVec2::new(-500, 300));
        assert_eq!(view.center(), IVec2::new(-500, 300));
        assert_eq!(view.width(), 1280);
        assert_eq!(view.height(), 720);
    }
}
