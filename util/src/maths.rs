//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Return the euclidian norm (distance between) of two points.
///
/// If the points do not have the same number of dimentions then `None` is
/// returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float
{
    if point_0.len() != point_1.len() {
        return None;
    }

    let sum = point_0
        .iter()
        .zip(point_1.iter())
        .fold(T::zero(), |acc, (&a, &b)| acc + (a - b).powi(2));

    Some(sum.sqrt())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_norm() {
        assert_eq!(norm(&[0f64, 0f64], &[3f64, 4f64]), Some(5f64));
        assert_eq!(norm(&[1f64, 1f64], &[1f64, 1f64]), Some(0f64));
        assert_eq!(norm(&[1f64], &[1f64, 2f64]), None);
    }
}
