use nalgebra as na;

/// Integer pixel midpoint of a bounding box.
pub type Centroid = na::Point2<i32>;

/// Floor of `(a + b) / 2`, also for negative sums.
#[inline]
pub fn midpoint(a: i32, b: i32) -> i32 {
    (a as i64 + b as i64).div_euclid(2) as i32
}

#[inline]
pub fn centroid(ltrb: [i32; 4]) -> Centroid {
    let [x1, y1, x2, y2] = ltrb;

    na::Point2::new(midpoint(x1, x2), midpoint(y1, y2))
}

#[inline]
fn axis_distances(a: &Centroid, b: &Centroid) -> (i64, i64) {
    (
        (a.x as i64 - b.x as i64).abs(),
        (a.y as i64 - b.y as i64).abs(),
    )
}

/// Both axes strictly closer than `threshold`.
#[inline]
pub fn within(a: &Centroid, b: &Centroid, threshold: i32) -> bool {
    let (dx, dy) = axis_distances(a, b);
    let threshold = threshold as i64;

    dx < threshold && dy < threshold
}

#[inline]
pub fn chebyshev(a: &Centroid, b: &Centroid) -> i64 {
    let (dx, dy) = axis_distances(a, b);

    dx.max(dy)
}
