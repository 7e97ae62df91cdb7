use cgmath::{Matrix4, Vector3, Vector4, Zero};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Bounds {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Box spanning `center ± half_extents`.
    pub fn from_center(center: Vector3<f32>, half_extents: Vector3<f32>) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Smallest box containing every point. Empty input yields a degenerate box at the origin.
    pub fn from_points(points: impl IntoIterator<Item = Vector3<f32>>) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::new(Vector3::zero(), Vector3::zero());
        };

        iter.fold(Self::new(first, first), |acc, p| Self {
            min: Vector3::new(acc.min.x.min(p.x), acc.min.y.min(p.y), acc.min.z.min(p.z)),
            max: Vector3::new(acc.max.x.max(p.x), acc.max.y.max(p.y), acc.max.z.max(p.z)),
        })
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vector3<f32> {
        (self.max - self.min) * 0.5
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn contains_point(&self, p: Vector3<f32>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn corners(&self) -> [Vector3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vector3::new(a.x, a.y, a.z),
            Vector3::new(b.x, a.y, a.z),
            Vector3::new(a.x, b.y, a.z),
            Vector3::new(a.x, a.y, b.z),
            Vector3::new(b.x, b.y, a.z),
            Vector3::new(b.x, a.y, b.z),
            Vector3::new(a.x, b.y, b.z),
            Vector3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of the eight transformed corners.
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        Self::from_points(self.corners().iter().map(|c| {
            let p = matrix * Vector4::new(c.x, c.y, c.z, 1.0);
            Vector3::new(p.x, p.y, p.z)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Matrix4};

    #[test]
    fn test_from_points() {
        let b = Bounds::from_points(vec![
            Vector3::new(1.0, -2.0, 0.5),
            Vector3::new(-1.0, 3.0, 0.0),
            Vector3::new(0.0, 0.0, 2.0),
        ]);
        assert_eq!(b.min, Vector3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Vector3::new(1.0, 3.0, 2.0));
        assert!(b.contains_point(Vector3::new(0.0, 0.0, 1.0)));
        assert!(!b.contains_point(Vector3::new(0.0, 4.0, 1.0)));
    }

    #[test]
    fn test_transform_translates_and_rotates() {
        let unit = Bounds::from_center(Vector3::zero(), Vector3::new(1.0, 0.5, 0.5));

        let moved = unit.transform(&Matrix4::from_translation(Vector3::new(2.0, 0.0, 0.0)));
        assert_eq!(moved.center(), Vector3::new(2.0, 0.0, 0.0));

        let turned = unit.transform(&Matrix4::from_angle_y(Deg(90.0)));
        assert!((turned.half_extents().x - 0.5).abs() < 1e-5);
        assert!((turned.half_extents().z - 1.0).abs() < 1e-5);
    }
}
