//! Direction-vector helpers shared by the tie and reinforcement transforms.
//!
//! Both transforms anchor their inserted points on quantized stitch
//! positions, so the helpers take integer coordinates from
//! [`Stitch::rounded`](crate::Stitch::rounded).

/// Unit vector from `from` to `to`, or `None` when the points coincide.
pub fn unit_direction(from: (i32, i32), to: (i32, i32)) -> Option<(f64, f64)> {
    let dx = f64::from(to.0) - f64::from(from.0);
    let dy = f64::from(to.1) - f64::from(from.1);
    let len = dx.hypot(dy);
    if len == 0.0 {
        None
    } else {
        Some((dx / len, dy / len))
    }
}

/// `point + direction * distance`, as real coordinates.
pub fn offset(point: (i32, i32), direction: (f64, f64), distance: f64) -> (f64, f64) {
    (
        direction.0.mul_add(distance, f64::from(point.0)),
        direction.1.mul_add(distance, f64::from(point.1)),
    )
}

/// Larger of the two axis deltas between quantized points.
pub fn max_axis_delta(from: (i32, i32), to: (i32, i32)) -> f64 {
    let dx = (f64::from(to.0) - f64::from(from.0)).abs();
    let dy = (f64::from(to.1) - f64::from(from.1)).abs();
    dx.max(dy)
}
