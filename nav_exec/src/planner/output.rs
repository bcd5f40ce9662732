//! Conversion of search results into published paths.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::nav::{Orientation, PathPublished, Position, Waypoint};
use nalgebra::{Point2, UnitQuaternion};

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the path to publish from the points returned by a search.
///
/// Plain paths contain every point. Oriented paths contain one waypoint per consecutive pair of
/// points, positioned at the first point of the pair and facing the second, so the final point
/// is dropped. An empty `points` gives an empty path.
pub fn build_path(frame_id: &str, points: &[Point2<f64>], oriented: bool) -> PathPublished {
    let waypoints = if oriented {
        points
            .windows(2)
            .map(|pair| {
                Waypoint::oriented(
                    to_position(&pair[0]),
                    yaw_to_orientation(heading(&pair[0], &pair[1])),
                )
            })
            .collect()
    } else {
        points.iter().map(|p| Waypoint::plain(to_position(p))).collect()
    };

    PathPublished::new(frame_id, waypoints)
}

/// Heading from `from` towards `to`, in radians.
///
/// Measured as `atan2(dx, dy)`, i.e. zero along +Y and increasing towards +X.
pub fn heading(from: &Point2<f64>, to: &Point2<f64>) -> f64 {
    (to.x - from.x).atan2(to.y - from.y)
}

/// Quaternion for a pure rotation of `yaw_rad` about the Z axis.
pub fn yaw_to_orientation(yaw_rad: f64) -> Orientation {
    let q = UnitQuaternion::from_euler_angles(0.0, 0.0, yaw_rad);
    let c = q.quaternion().coords;

    Orientation {
        x: c[0],
        y: c[1],
        z: c[2],
        w: c[3],
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn to_position(point: &Point2<f64>) -> Position {
    Position::new(point.x, point.y)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn points() -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
        ]
    }

    #[test]
    fn test_plain_path() {
        let path = build_path("map", &points(), false);

        assert_eq!(path.frame_id, "map");
        assert_eq!(path.waypoints.len(), 3);
        assert_eq!(path.waypoints[2].position, Position::new(1.0, 1.0));
        assert!(path.waypoints.iter().all(|w| w.orientation.is_none()));
    }

    #[test]
    fn test_oriented_path() {
        let path = build_path("map", &points(), true);

        assert_eq!(path.waypoints.len(), 2);
        assert_eq!(path.waypoints[0].position, Position::new(0.0, 0.0));
        assert_eq!(path.waypoints[1].position, Position::new(1.0, 0.0));

        // atan2(1, 0) then atan2(0, 1)
        let q0 = path.waypoints[0].orientation.unwrap();
        assert!((q0.z - FRAC_PI_4.sin()).abs() < 1e-12);
        assert!((q0.w - FRAC_PI_4.cos()).abs() < 1e-12);

        let q1 = path.waypoints[1].orientation.unwrap();
        assert!(q1.z.abs() < 1e-12);
        assert!((q1.w - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_heading() {
        let origin = Point2::new(0.0, 0.0);

        assert!((heading(&origin, &Point2::new(1.0, 0.0)) - FRAC_PI_2).abs() < 1e-12);
        assert!(heading(&origin, &Point2::new(0.0, 1.0)).abs() < 1e-12);
        assert!((heading(&origin, &Point2::new(-1.0, 0.0)) + FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_yaw_quaternion() {
        let q = yaw_to_orientation(FRAC_PI_2);

        assert!(q.x.abs() < 1e-12);
        assert!(q.y.abs() < 1e-12);
        assert!((q.z - FRAC_PI_4.sin()).abs() < 1e-12);
        assert!((q.w - FRAC_PI_4.cos()).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(build_path("map", &[], false).is_empty());
        assert!(build_path("map", &[], true).is_empty());

        // A single point has no heading
        assert!(build_path("map", &[Point2::new(2.0, 3.0)], true).is_empty());
        assert_eq!(
            build_path("map", &[Point2::new(2.0, 3.0)], false)
                .waypoints
                .len(),
            1
        );
    }
}
