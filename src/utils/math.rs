//! Additional math helpers layered on top of `glam`.

use glam::Vec2;

/// Grid coordinate of the cell containing `position` for square cells of `cell_size`.
#[inline]
pub fn cell_coord(position: Vec2, cell_size: f32) -> (i32, i32) {
    (
        (position.x / cell_size).floor() as i32,
        (position.y / cell_size).floor() as i32,
    )
}

/// Sign that never returns zero, matching the convention used by wall corrections.
#[inline]
pub fn sign_non_zero(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Separation that pushes two centers `min_distance` apart.
///
/// Returns the displacement for the first particle (the second one moves by the
/// negation), or `None` when the pair does not overlap. Coincident centers are
/// separated along +X.
#[inline]
pub fn separation(a: Vec2, b: Vec2, min_distance: f32) -> Option<Vec2> {
    let axis = a - b;
    let distance_sq = axis.length_squared();
    if distance_sq >= min_distance * min_distance {
        return None;
    }

    let distance = distance_sq.sqrt();
    let normal = if distance > f32::EPSILON {
        axis / distance
    } else {
        Vec2::X
    };
    let delta = min_distance - distance;
    Some(normal * (0.5 * delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cell_coord_floors_negative_positions() {
        assert_eq!(cell_coord(Vec2::new(-0.1, 0.1), 1.0), (-1, 0));
        assert_eq!(cell_coord(Vec2::new(2.5, -3.0), 1.0), (2, -3));
    }

    #[test]
    fn separation_splits_overlap_evenly() {
        let push = separation(Vec2::ZERO, Vec2::new(0.5, 0.0), 1.0).expect("overlap");
        assert_relative_eq!(push.x, -0.25);
        assert_relative_eq!(push.y, 0.0);
        assert!(separation(Vec2::ZERO, Vec2::new(1.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn coincident_centers_split_along_x() {
        let push = separation(Vec2::ONE, Vec2::ONE, 1.0).expect("overlap");
        assert_relative_eq!(push.x, 0.5);
        assert_relative_eq!(push.y, 0.0);
    }
}
