use crate::{CloudmaskError, Point, C};
use num_traits::{Float, FromPrimitive};

/// Orthogonal footprint diameters of one cloud mask, in kilometers.
///
/// `d1` is the shortest diameter through the centroid, `d2` the longest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Diameters<T = C> {
    pub d1: T,
    pub d2: T,
}

/// One boundary point's polar description relative to the centroid.
#[derive(Clone, Copy)]
struct Ray<T> {
    radius: T,
    angle_deg: T,
}

/// Resolves the short and long diameters of a cloud footprint.
///
/// Every boundary point is paired with the point whose bearing from the
/// centroid is closest to 180° away (first occurrence wins ties); the
/// diameter through a point is its radius plus its partner's. `d1`/`d2` are
/// the minimum/maximum over all such diameters, scaled by `km_per_pixel`.
///
/// The pairing search is O(n²) in boundary length, which is fine for a
/// single image contour.
///
/// # Errors
///
/// Fails with [`CloudmaskError::DegenerateBoundary`] for fewer than 3
/// boundary points. Coincident points or a centroid lying on the boundary
/// yield zero-length radii but a still-defined result, since radii only
/// affect magnitude, not the angle pairing.
pub fn resolve_diameters<T>(
    boundary: &[Point<T>],
    centroid: Point<T>,
    km_per_pixel: T,
) -> Result<Diameters<T>, CloudmaskError>
where
    T: Float + FromPrimitive,
{
    if boundary.len() < 3 {
        return Err(CloudmaskError::DegenerateBoundary(boundary.len()));
    }

    let full_turn = T::from_f64(360.0).unwrap();
    let half_turn = T::from_f64(180.0).unwrap();

    let rays: Vec<Ray<T>> = boundary
        .iter()
        .map(|point| {
            let dx = point.x - centroid.x;
            let dy = point.y - centroid.y;
            let mut angle_deg = dy.atan2(dx).to_degrees();
            if angle_deg < T::zero() {
                angle_deg = angle_deg + full_turn;
            }
            Ray {
                radius: dx.hypot(dy),
                angle_deg,
            }
        })
        .collect();

    let mut d1 = T::infinity();
    let mut d2 = T::neg_infinity();
    for ray in &rays {
        let mut best_deviation = T::infinity();
        let mut opposite = &rays[0];
        for other in &rays {
            let deviation = ((ray.angle_deg - other.angle_deg).abs() - half_turn).abs();
            if deviation < best_deviation {
                best_deviation = deviation;
                opposite = other;
            }
        }
        let diameter = ray.radius + opposite.radius;
        d1 = d1.min(diameter);
        d2 = d2.max(diameter);
    }

    Ok(Diameters {
        d1: d1 * km_per_pixel,
        d2: d2 * km_per_pixel,
    })
}
