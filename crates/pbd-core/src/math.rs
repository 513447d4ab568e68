use glam::{Vec3, Vec4};

/// View an interleaved float buffer as whole 4-float records.
///
/// A trailing partial record is ignored, so the record count is always
/// `data.len() / 4`.
pub fn vec4_records(data: &[f32]) -> &[[f32; 4]] {
    let whole = data.len() / 4 * 4;
    bytemuck::cast_slice(&data[..whole])
}

/// Mutable counterpart of [`vec4_records`].
pub fn vec4_records_mut(data: &mut [f32]) -> &mut [[f32; 4]] {
    let whole = data.len() / 4 * 4;
    bytemuck::cast_slice_mut(&mut data[..whole])
}

/// View an interleaved float buffer as whole 3-float records.
pub fn vec3_records(data: &[f32]) -> &[[f32; 3]] {
    let whole = data.len() / 3 * 3;
    bytemuck::cast_slice(&data[..whole])
}

/// Drop the homogeneous component of a 4-float record.
#[inline]
pub fn xyz(r: [f32; 4]) -> Vec3 {
    Vec3::new(r[0], r[1], r[2])
}

/// Pack a vector into the homogeneous 4-float layout.
#[inline]
pub fn homogeneous(v: Vec3, w: f32) -> [f32; 4] {
    Vec4::new(v.x, v.y, v.z, w).to_array()
}

/// Closest point to `p` on segment `ab`, with its parameter in `[0, 1]`.
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-12 {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Closest point to `p` on triangle `abc` (Voronoi region walk).
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Area of triangle `abc`.
#[inline]
pub fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (b - a).cross(c - a).length() * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_ignore_partial_tail() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(vec4_records(&data).len(), 1);
        assert_eq!(vec3_records(&data).len(), 2);
        assert_eq!(xyz(vec4_records(&data)[0]), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_closest_point_on_triangle_regions() {
        let a = Vec3::ZERO;
        let b = Vec3::X;
        let c = Vec3::Y;
        // Above the interior projects straight down.
        let inside = closest_point_on_triangle(Vec3::new(0.25, 0.25, 1.0), a, b, c);
        assert!((inside - Vec3::new(0.25, 0.25, 0.0)).length() < 1e-6);
        // Past vertex b snaps to b.
        let corner = closest_point_on_triangle(Vec3::new(2.0, -1.0, 0.0), a, b, c);
        assert!((corner - b).length() < 1e-6);
        // Beside the hypotenuse lands on it.
        let edge = closest_point_on_triangle(Vec3::new(1.0, 1.0, 0.0), a, b, c);
        assert!((edge - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_closest_point_on_segment_clamps() {
        let (p, t) = closest_point_on_segment(Vec3::new(-1.0, 1.0, 0.0), Vec3::ZERO, Vec3::X);
        assert_eq!(p, Vec3::ZERO);
        assert_eq!(t, 0.0);
    }
}
