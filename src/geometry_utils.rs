use crate::Point2D;

pub fn distance_points(a: &Point2D, b: &Point2D) -> f32 {
    let (x1, y1) = *a;
    let (x2, y2) = *b;

    f32::sqrt(f32::powi(x1 - x2, 2) + f32::powi(y1 - y2, 2))
}

/// Per-axis difference `b - a`
pub fn delta(a: &Point2D, b: &Point2D) -> [f32; 2] {
    [b.0 - a.0, b.1 - a.1]
}
